#[cfg(feature = "desktop")]
pub mod capture;
pub mod source;

use anyhow::Result;

#[cfg(feature = "desktop")]
pub use capture::OpenCvCamera;
pub use source::VideoSource;

/// 連続したフレームを返す入力
pub trait FrameSource {
    type Frame;

    /// 次のフレーム。ストリーム終端なら `Ok(None)`
    fn read_frame(&mut self) -> Result<Option<Self::Frame>>;
}
