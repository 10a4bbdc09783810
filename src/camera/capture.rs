use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};
use tracing::{debug, info, warn};

use super::{FrameSource, VideoSource};

/// OpenCVを使用したカメラ/動画キャプチャ
///
/// ドロップ時にキャプチャを解放する。
pub struct OpenCvCamera {
    capture: VideoCapture,
    width: u32,
    height: u32,
    mirror: bool,
}

impl OpenCvCamera {
    /// カメラ番号または動画ファイルを開く
    ///
    /// mirror=true なら左右反転 (セルフィー表示) したフレームを返す
    pub fn open(source: &VideoSource, mirror: bool) -> Result<Self> {
        let api = VideoCaptureAPIs::CAP_ANY as i32;
        let capture = match source {
            VideoSource::Camera(index) => VideoCapture::new(*index, api),
            VideoSource::File(path) => VideoCapture::from_file(&path.to_string_lossy(), api),
        }
        .with_context(|| format!("Failed to open {}", source))?;

        if !capture.is_opened()? {
            anyhow::bail!("{} is not available", source);
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        info!(%source, width, height, fps, "video source opened");

        Ok(Self {
            capture,
            width,
            height,
            mirror,
        })
    }

    /// 解像度を取得
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl FrameSource for OpenCvCamera {
    type Frame = Mat;

    /// フレームを読み込む（BGR形式）。終端なら None
    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let ok = self
            .capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if !ok || frame.empty() {
            return Ok(None);
        }

        if !self.mirror {
            return Ok(Some(frame));
        }

        let mut flipped = Mat::default();
        core::flip(&frame, &mut flipped, 1)?;
        Ok(Some(flipped))
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        match self.capture.release() {
            Ok(()) => debug!("video source released"),
            Err(e) => warn!("Failed to release video source: {}", e),
        }
    }
}
