use clap::Parser;
use std::path::PathBuf;

use crate::camera::VideoSource;
use crate::osc::DEFAULT_PORT;
use crate::pose::{EstimatorOptions, ModelComplexity};

/// 起動時に一度だけ読むコマンドライン設定
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pose-osc",
    version = env!("POSE_OSC_VERSION"),
    about = "Sends body pose landmarks from a camera or video as OSC messages"
)]
pub struct Config {
    /// 送信先ホスト
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,

    /// 送信先ポート
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// カメラ番号または動画ファイルのパス
    #[arg(long, default_value = "0")]
    pub input: VideoSource,

    /// モデルの重さ (0=Lite, 1=Full, 2=Heavy)
    #[arg(long, default_value = "1", value_parser = parse_model_complexity)]
    pub model_complexity: ModelComplexity,

    /// 検出とみなす最小スコア
    #[arg(long, default_value_t = 0.5, value_parser = parse_confidence)]
    pub min_detection_confidence: f32,

    /// 追跡を続ける最小スコア
    #[arg(long, default_value_t = 0.5, value_parser = parse_confidence)]
    pub min_tracking_confidence: f32,

    /// ランドマークの平滑化を無効にする
    #[arg(long)]
    pub no_smooth_landmarks: bool,

    /// フレーム間で追跡せず、毎フレーム独立に推定する
    #[arg(long)]
    pub static_image_mode: bool,

    /// ONNXモデルのディレクトリ
    #[arg(long, default_value = "models")]
    pub model_dir: PathBuf,

    /// 左右反転しない
    #[arg(long)]
    pub no_mirror: bool,

    /// ウィンドウを表示しない
    #[arg(long)]
    pub no_display: bool,
}

impl Config {
    pub fn smooth_landmarks(&self) -> bool {
        !self.no_smooth_landmarks
    }

    pub fn mirror(&self) -> bool {
        !self.no_mirror
    }

    pub fn display(&self) -> bool {
        !self.no_display
    }

    /// 推定器に渡すパラメータ
    pub fn estimator_options(&self) -> EstimatorOptions {
        EstimatorOptions {
            model_complexity: self.model_complexity,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
            smooth_landmarks: self.smooth_landmarks(),
            static_image_mode: self.static_image_mode,
        }
    }
}

fn parse_model_complexity(s: &str) -> Result<ModelComplexity, String> {
    s.parse::<u8>()
        .ok()
        .and_then(ModelComplexity::from_level)
        .ok_or_else(|| format!("expected 0, 1 or 2, got '{}'", s))
}

fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("not a number: '{}'", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("must be within [0, 1], got {}", value))
    }
}
