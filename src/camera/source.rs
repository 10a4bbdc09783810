use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// 映像の入力元
///
/// 数字だけならカメラ番号、それ以外は動画ファイルのパス。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    Camera(i32),
    File(PathBuf),
}

impl FromStr for VideoSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(index) = s.parse() {
                return Ok(Self::Camera(index));
            }
        }
        Ok(Self::File(PathBuf::from(s)))
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera(index) => write!(f, "camera {}", index),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Default for VideoSource {
    fn default() -> Self {
        Self::Camera(0)
    }
}
