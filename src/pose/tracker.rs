use anyhow::Result;
use std::time::Instant;
use tracing::debug;

use super::estimator::{EstimatorOptions, PoseEstimator};
use super::landmark::{Landmark, LandmarkIndex, LandmarkSet};
use super::roi::Roi;
use super::smoothing::LandmarkSmoother;

/// ランドマークモデル1回分の出力
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkOutput {
    /// ROI内の正規化座標。z はROI幅基準
    pub landmarks: LandmarkSet,
    /// 姿勢が存在するスコア (0.0〜1.0)
    pub score: f32,
}

/// ROIを切り出してランドマークを推定するモデル
pub trait LandmarkModel {
    type Frame;

    fn frame_size(&self, frame: &Self::Frame) -> (u32, u32);

    fn infer(&mut self, frame: &Self::Frame, roi: &Roi) -> Result<LandmarkOutput>;
}

/// フレーム間でROIを引き継ぐ姿勢トラッカー
///
/// - 追跡中: 前フレームのROIで推論し、スコアが min_tracking_confidence 以上なら採用
/// - 未追跡/追跡失敗: フレーム全体で推論し、min_detection_confidence 以上なら採用
/// - static_image_mode: 毎フレーム全体で推論。追跡も平滑化もしない
pub struct PoseTracker<M> {
    model: M,
    options: EstimatorOptions,
    tracked: Option<Roi>,
    display_roi: Option<Roi>,
    smoother: Option<LandmarkSmoother>,
    started: Instant,
}

impl<M: LandmarkModel> PoseTracker<M> {
    pub fn new(model: M, options: EstimatorOptions) -> Self {
        let smoother = (options.smooth_landmarks && !options.static_image_mode)
            .then(LandmarkSmoother::new);
        Self {
            model,
            options,
            tracked: None,
            display_roi: None,
            smoother,
            started: Instant::now(),
        }
    }

    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    pub fn is_tracking(&self) -> bool {
        self.tracked.is_some()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn accept(&mut self, output: LandmarkOutput, roi: &Roi, frame_w: u32, frame_h: u32) -> LandmarkSet {
        let mut projected = [Landmark::default(); LandmarkIndex::COUNT];
        for (dst, lm) in projected.iter_mut().zip(output.landmarks.iter()) {
            *dst = roi.project_landmark(lm, frame_w, frame_h);
        }
        let projected = LandmarkSet::new(projected);

        let next_roi = Roi::from_landmarks(&projected, frame_w, frame_h);
        self.display_roi = next_roi;
        if !self.options.static_image_mode {
            self.tracked = next_roi;
        }

        let timestamp = self.started.elapsed();
        match self.smoother.as_mut() {
            Some(smoother) => smoother.apply(&projected, timestamp),
            None => projected,
        }
    }

    fn lose(&mut self) {
        self.tracked = None;
        self.display_roi = None;
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.reset();
        }
    }
}

impl<M: LandmarkModel> PoseEstimator for PoseTracker<M> {
    type Frame = M::Frame;

    fn process(&mut self, frame: &Self::Frame) -> Result<Option<LandmarkSet>> {
        let (frame_w, frame_h) = self.model.frame_size(frame);

        if let Some(roi) = self.tracked {
            let output = self.model.infer(frame, &roi)?;
            if output.score >= self.options.min_tracking_confidence {
                return Ok(Some(self.accept(output, &roi, frame_w, frame_h)));
            }
            debug!(score = output.score, "tracking lost");
            self.lose();
        }

        let roi = Roi::full_frame(frame_w, frame_h);
        let output = self.model.infer(frame, &roi)?;
        if output.score >= self.options.min_detection_confidence {
            Ok(Some(self.accept(output, &roi, frame_w, frame_h)))
        } else {
            self.lose();
            Ok(None)
        }
    }

    fn region_of_interest(&self) -> Option<Roi> {
        self.display_roi
    }
}
