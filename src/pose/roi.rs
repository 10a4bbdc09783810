use std::f32::consts::{FRAC_PI_2, PI};

use super::landmark::{Landmark, LandmarkIndex, LandmarkSet};

/// ランドマークからROIを作る際の拡大率
pub const ROI_SCALE: f32 = 1.25;

/// ランドマークモデルに渡す画像領域（正規化座標、回転付き）
///
/// 中心と幅・高さは画像サイズで正規化している。
/// 回転はラジアンで、時計回りが正 (画像のy軸は下向き)。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
}

impl Roi {
    /// フレーム全体を含む正方形のROI（短辺方向はレターボックス）
    pub fn full_frame(frame_w: u32, frame_h: u32) -> Self {
        let side = frame_w.max(frame_h) as f32;
        Self {
            center_x: 0.5,
            center_y: 0.5,
            width: side / frame_w as f32,
            height: side / frame_h as f32,
            rotation: 0.0,
        }
    }

    /// 前フレームのランドマークから次フレームのROIを推定
    ///
    /// - 全ランドマークのBBoxを正方形にして ROI_SCALE 倍
    /// - 腰の中点→肩の中点が真上を向くように回転
    ///
    /// BBoxが潰れている場合はNone。
    pub fn from_landmarks(set: &LandmarkSet, frame_w: u32, frame_h: u32) -> Option<Self> {
        let fw = frame_w as f32;
        let fh = frame_h as f32;

        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for lm in set {
            let px = lm.x * fw;
            let py = lm.y * fh;
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
        }

        let side = (max_x - min_x).max(max_y - min_y) * ROI_SCALE;
        if !side.is_finite() || side <= 0.0 {
            return None;
        }

        let hips = midpoint(set.get(LandmarkIndex::LeftHip), set.get(LandmarkIndex::RightHip));
        let shoulders = midpoint(
            set.get(LandmarkIndex::LeftShoulder),
            set.get(LandmarkIndex::RightShoulder),
        );
        let dx = (shoulders.0 - hips.0) * fw;
        let dy = (shoulders.1 - hips.1) * fh;
        let rotation = normalize_radians(FRAC_PI_2 - (-dy).atan2(dx));

        Some(Self {
            center_x: (min_x + max_x) / 2.0 / fw,
            center_y: (min_y + max_y) / 2.0 / fh,
            width: side / fw,
            height: side / fh,
            rotation,
        })
    }

    /// ROI内の正規化座標 (u, v) を画像全体の正規化座標に変換
    pub fn project(&self, u: f32, v: f32, frame_w: u32, frame_h: u32) -> (f32, f32) {
        let fw = frame_w as f32;
        let fh = frame_h as f32;
        let dx = (u - 0.5) * self.width * fw;
        let dy = (v - 0.5) * self.height * fh;
        let (sin, cos) = self.rotation.sin_cos();
        let x = self.center_x * fw + dx * cos - dy * sin;
        let y = self.center_y * fh + dx * sin + dy * cos;
        (x / fw, y / fh)
    }

    /// ROI基準のランドマークを画像基準に変換
    ///
    /// z はROI幅基準なので、画像幅基準に直す。
    pub fn project_landmark(&self, lm: &Landmark, frame_w: u32, frame_h: u32) -> Landmark {
        let (x, y) = self.project(lm.x, lm.y, frame_w, frame_h);
        Landmark::new(x, y, lm.z * self.width, lm.visibility)
    }

    /// 四隅のピクセル座標 (左上, 右上, 右下, 左下)
    pub fn corners(&self, frame_w: u32, frame_h: u32) -> [(f32, f32); 4] {
        let fw = frame_w as f32;
        let fh = frame_h as f32;
        [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)].map(|(u, v)| {
            let (x, y) = self.project(u, v, frame_w, frame_h);
            (x * fw, y * fh)
        })
    }
}

fn midpoint(a: &Landmark, b: &Landmark) -> (f32, f32) {
    ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// [-PI, PI) に正規化
fn normalize_radians(angle: f32) -> f32 {
    angle - 2.0 * PI * ((angle + PI) / (2.0 * PI)).floor()
}
