pub mod canvas;
pub mod skeleton;
#[cfg(feature = "desktop")]
pub mod window;

use anyhow::Result;

use crate::pose::{LandmarkSet, Roi};

pub use canvas::Canvas;
pub use skeleton::POSE_CONNECTIONS;
#[cfg(feature = "desktop")]
pub use window::MinifbRenderer;

/// フレームと推定結果の表示先
pub trait Display {
    type Frame;

    fn show(&mut self, frame: &Self::Frame, landmarks: Option<&LandmarkSet>, roi: Option<&Roi>) -> Result<()>;

    /// ユーザーが終了を要求したか
    fn cancel_requested(&self) -> bool;
}
