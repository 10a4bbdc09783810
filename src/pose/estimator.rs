use anyhow::Result;
use std::fmt;

use super::landmark::LandmarkSet;
use super::roi::Roi;

/// モデルの重さ（精度とレイテンシのトレードオフ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelComplexity {
    Lite = 0,
    Full = 1,
    Heavy = 2,
}

impl ModelComplexity {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Lite),
            1 => Some(Self::Full),
            2 => Some(Self::Heavy),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    /// ランドマークモデルのファイル名
    pub fn model_file_name(self) -> &'static str {
        match self {
            Self::Lite => "pose_landmark_lite.onnx",
            Self::Full => "pose_landmark_full.onnx",
            Self::Heavy => "pose_landmark_heavy.onnx",
        }
    }
}

impl fmt::Display for ModelComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lite => "lite",
            Self::Full => "full",
            Self::Heavy => "heavy",
        };
        write!(f, "{} ({})", self.level(), name)
    }
}

/// 推定器の初期化パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorOptions {
    pub model_complexity: ModelComplexity,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub smooth_landmarks: bool,
    pub static_image_mode: bool,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            model_complexity: ModelComplexity::Full,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            smooth_landmarks: true,
            static_image_mode: false,
        }
    }
}

/// フレームから姿勢を推定する
pub trait PoseEstimator {
    type Frame;

    /// 姿勢が見つからなければ `Ok(None)`
    fn process(&mut self, frame: &Self::Frame) -> Result<Option<LandmarkSet>>;

    /// 表示用の現在の注目領域
    fn region_of_interest(&self) -> Option<Roi> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_complexity_levels() {
        assert_eq!(ModelComplexity::from_level(0), Some(ModelComplexity::Lite));
        assert_eq!(ModelComplexity::from_level(2), Some(ModelComplexity::Heavy));
        assert_eq!(ModelComplexity::from_level(3), None);
        assert_eq!(ModelComplexity::Full.level(), 1);
    }

    #[test]
    fn test_model_file_name() {
        assert_eq!(ModelComplexity::Heavy.model_file_name(), "pose_landmark_heavy.onnx");
        assert_eq!(ModelComplexity::Lite.model_file_name(), "pose_landmark_lite.onnx");
    }
}
