use anyhow::{Context, Result};
use opencv::core::Mat;
use opencv::prelude::*;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use tracing::info;

use super::estimator::ModelComplexity;
use super::landmark::{Landmark, LandmarkIndex, LandmarkSet};
use super::preprocess::{preprocess_for_blazepose, BLAZEPOSE_INPUT_SIZE};
use super::roi::Roi;
use super::tracker::{LandmarkModel, LandmarkOutput};

/// 1ランドマークあたりの出力値 (x, y, z, visibility, presence)
const VALUES_PER_LANDMARK: usize = 5;

/// BlazePose ランドマークモデル (ONNX)
///
/// 出力0: [1, 195] (39点 x 5、先頭33点が体のランドマーク、座標は入力ピクセル単位)
/// 出力1: [1, 1] 姿勢の存在スコア
pub struct BlazePoseModel {
    session: Session,
    input_name: String,
    landmarks_output: String,
    score_output: String,
}

impl BlazePoseModel {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model: {}", model_path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .context("Model has no inputs")?;
        if session.outputs.len() < 2 {
            anyhow::bail!("Expected landmark and score outputs, model has {}", session.outputs.len());
        }
        let landmarks_output = session.outputs[0].name.clone();
        let score_output = session.outputs[1].name.clone();

        Ok(Self {
            session,
            input_name,
            landmarks_output,
            score_output,
        })
    }

    /// モデルディレクトリから重さに応じたモデルを読み込む
    pub fn load<P: AsRef<Path>>(model_dir: P, complexity: ModelComplexity) -> Result<Self> {
        let path = model_dir.as_ref().join(complexity.model_file_name());
        info!(model = %path.display(), %complexity, "loading pose landmark model");
        Self::new(path)
    }
}

impl LandmarkModel for BlazePoseModel {
    type Frame = Mat;

    fn frame_size(&self, frame: &Mat) -> (u32, u32) {
        (frame.cols() as u32, frame.rows() as u32)
    }

    fn infer(&mut self, frame: &Mat, roi: &Roi) -> Result<LandmarkOutput> {
        let input = preprocess_for_blazepose(frame, roi)?;
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .context("Inference failed")?;

        let raw: ndarray::ArrayViewD<f32> = outputs[self.landmarks_output.as_str()]
            .try_extract_array()
            .context("Failed to extract landmark tensor")?;
        let raw: Vec<f32> = raw.iter().copied().collect();

        let score: ndarray::ArrayViewD<f32> = outputs[self.score_output.as_str()]
            .try_extract_array()
            .context("Failed to extract score tensor")?;
        let score = score.iter().next().copied().context("Empty score tensor")?;

        Ok(LandmarkOutput {
            landmarks: decode_landmarks(&raw)?,
            score: score.clamp(0.0, 1.0),
        })
    }
}

/// モデル出力をROI内の正規化座標に変換
fn decode_landmarks(raw: &[f32]) -> Result<LandmarkSet> {
    let needed = LandmarkIndex::COUNT * VALUES_PER_LANDMARK;
    if raw.len() < needed {
        anyhow::bail!("Landmark tensor too small: {} < {}", raw.len(), needed);
    }

    let size = BLAZEPOSE_INPUT_SIZE as f32;
    let landmarks: Vec<Landmark> = raw[..needed]
        .chunks_exact(VALUES_PER_LANDMARK)
        .map(|v| Landmark::new(v[0] / size, v[1] / size, v[2] / size, sigmoid(v[3])))
        .collect();

    Ok(LandmarkSet::try_from(landmarks)?)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_decode_landmarks() {
        // 39点分 (補助ランドマーク込み)
        let mut raw = vec![0.0f32; 39 * 5];
        raw[0] = 128.0;
        raw[1] = 64.0;
        raw[2] = -25.6;
        raw[3] = 0.0;
        let set = decode_landmarks(&raw).unwrap();

        let nose = set.get(LandmarkIndex::Nose);
        assert!((nose.x - 0.5).abs() < 1e-6);
        assert!((nose.y - 0.25).abs() < 1e-6);
        assert!((nose.z + 0.1).abs() < 1e-6);
        assert!((nose.visibility - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_landmarks_too_small() {
        let raw = vec![0.0f32; 32 * 5];
        assert!(decode_landmarks(&raw).is_err());
    }
}
