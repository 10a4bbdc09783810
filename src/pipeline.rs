//! フレームごとの処理ループ
//!
//! 読み込み → 推定 → OSC送信 → (表示 → 終了確認) を入力が尽きるまで繰り返す。

use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{debug, info};

use crate::camera::FrameSource;
use crate::osc::{MessageSink, OutboundMessage};
use crate::pose::{LandmarkSet, PoseEstimator};
use crate::render::Display;

/// ループが止まった理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 入力の終端、または読み込み失敗
    SourceExhausted,
    /// 表示側で終了が要求された
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub detections: u64,
    pub stop: StopReason,
}

/// 1秒ごとのスループット表示
struct FpsCounter {
    frames: u32,
    detections: u32,
    visibility_sum: f32,
    timer: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            detections: 0,
            visibility_sum: 0.0,
            timer: Instant::now(),
        }
    }

    fn tick(&mut self, landmarks: Option<&LandmarkSet>) {
        self.frames += 1;
        if let Some(landmarks) = landmarks {
            self.detections += 1;
            self.visibility_sum += landmarks.average_visibility();
        }

        let elapsed = self.timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            info!(
                "FPS: {:.1}, detected: {}/{}, avg visibility: {:.2}",
                self.frames as f32 / elapsed,
                self.detections,
                self.frames,
                self.average_visibility().unwrap_or(0.0)
            );
            self.frames = 0;
            self.detections = 0;
            self.visibility_sum = 0.0;
            self.timer = Instant::now();
        }
    }

    /// 検出フレームでの平均可視性
    fn average_visibility(&self) -> Option<f32> {
        (self.detections > 0).then(|| self.visibility_sum / self.detections as f32)
    }
}

/// メインループ
///
/// 入力と推定器はループが所有し、終了時 (エラー時を含む) に解放される。
/// 推定と送信のエラーはそのまま返す。
pub fn run<S, E, T>(
    mut source: S,
    mut estimator: E,
    sink: &mut T,
    mut display: Option<&mut dyn Display<Frame = S::Frame>>,
) -> Result<RunSummary>
where
    S: FrameSource,
    E: PoseEstimator<Frame = S::Frame>,
    T: MessageSink + ?Sized,
{
    let mut frames = 0u64;
    let mut detections = 0u64;
    let mut fps = FpsCounter::new();

    let stop = loop {
        let frame = match source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("end of stream");
                break StopReason::SourceExhausted;
            }
            Err(e) => {
                debug!("frame read failed: {:#}", e);
                break StopReason::SourceExhausted;
            }
        };

        let landmarks = estimator
            .process(&frame)
            .context("Pose estimation failed")?;

        let message = OutboundMessage::from_landmarks(landmarks.as_ref());
        sink.send(&message).context("Failed to send OSC message")?;

        frames += 1;
        if landmarks.is_some() {
            detections += 1;
        }
        fps.tick(landmarks.as_ref());

        if let Some(display) = display.as_mut() {
            let roi = estimator.region_of_interest();
            display.show(&frame, landmarks.as_ref(), roi.as_ref())?;
            if display.cancel_requested() {
                debug!("cancel requested");
                break StopReason::Cancelled;
            }
        }
    };

    drop(estimator);
    drop(source);
    info!(frames, detections, ?stop, "capture loop stopped");

    Ok(RunSummary {
        frames,
        detections,
        stop,
    })
}
