use crate::pose::{LandmarkSet, Roi};

use super::skeleton::{
    LANDMARK_COLOR, LOW_VISIBILITY_COLOR, POSE_CONNECTIONS, ROI_COLOR, SKELETON_COLOR,
    VISIBILITY_THRESHOLD,
};

/// ランドマークの点の半径 (px)
const LANDMARK_RADIUS: i32 = 3;

/// 0RGB の u32 ピクセルバッファ
pub struct Canvas {
    pixels: Vec<u32>,
    width: usize,
    height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0u32; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// 範囲外は None
    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// ピクセルをセット（範囲外は無視）
    pub fn put(&mut self, x: i32, y: i32, color: u32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// 塗りつぶし円
    pub fn disc(&mut self, center: (i32, i32), radius: i32, color: u32) {
        let (cx, cy, r) = (center.0 as i64, center.1 as i64, radius as i64);
        if cx + r < 0 || cy + r < 0 || cx - r >= self.width as i64 || cy - r >= self.height as i64 {
            return;
        }

        let r2 = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= r2 {
                    self.put(center.0 + dx, center.1 + dy, color);
                }
            }
        }
    }

    /// 骨格線とランドマークを描画
    ///
    /// 両端が見えている辺だけ線を引き、点は可視性で色分けする。
    /// 座標が有限でないランドマークは描かない。
    pub fn draw_landmarks(&mut self, landmarks: &LandmarkSet) {
        let (w, h) = (self.width as u32, self.height as u32);
        for &(a, b) in POSE_CONNECTIONS.iter() {
            let (start, end) = (landmarks.get(a), landmarks.get(b));
            if !(start.is_visible(VISIBILITY_THRESHOLD) && end.is_visible(VISIBILITY_THRESHOLD)) {
                continue;
            }
            if let (Some(p0), Some(p1)) = (start.to_pixel(w, h), end.to_pixel(w, h)) {
                self.line(p0, p1, SKELETON_COLOR);
            }
        }

        for lm in landmarks {
            let Some((x, y)) = lm.to_pixel(w, h) else {
                continue;
            };
            let color = if lm.is_visible(VISIBILITY_THRESHOLD) {
                LANDMARK_COLOR
            } else {
                LOW_VISIBILITY_COLOR
            };
            self.disc((x as i32, y as i32), LANDMARK_RADIUS, color);
        }
    }

    /// ROIの外枠を描画
    pub fn draw_roi(&mut self, roi: &Roi) {
        let corners = roi
            .corners(self.width as u32, self.height as u32)
            .map(|(x, y)| (x as f64, y as f64));
        for i in 0..corners.len() {
            self.line(corners[i], corners[(i + 1) % corners.len()], ROI_COLOR);
        }
    }

    /// Bresenham で線を描画
    ///
    /// キャンバス外の部分は先に切り落とす。端点が有限でなければ何もしない。
    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), color: u32) {
        let Some((from, to)) = clip_segment(from, to, self.width, self.height) else {
            return;
        };

        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let step_x = if x < to.0 { 1 } else { -1 };
        let step_y = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.put(x, y, color);
            if (x, y) == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += step_x;
            }
            if e2 <= dx {
                err += dx;
                y += step_y;
            }
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }
}

/// Liang-Barsky で線分を [0, width-1] x [0, height-1] に切り詰める
///
/// 端点が有限でない、または線分が完全に外にあれば None。
fn clip_segment(
    from: (f64, f64),
    to: (f64, f64),
    width: usize,
    height: usize,
) -> Option<((i32, i32), (i32, i32))> {
    if width == 0 || height == 0 {
        return None;
    }
    if ![from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite()) {
        return None;
    }

    let x_max = (width - 1) as f64;
    let y_max = (height - 1) as f64;
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;

    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [(-dx, from.0), (dx, x_max - from.0), (-dy, from.1), (dy, y_max - from.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let snap = |t: f64| {
        let x = (from.0 + t * dx).round().clamp(0.0, x_max) as i32;
        let y = (from.1 + t * dy).round().clamp(0.0, y_max) as i32;
        (x, y)
    };
    Some((snap(t0), snap(t1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkIndex};

    #[test]
    fn test_put_ignores_out_of_bounds() {
        let mut canvas = Canvas::new(4, 3);
        canvas.put(-1, 0, 0xFFFFFF);
        canvas.put(4, 0, 0xFFFFFF);
        canvas.put(0, 3, 0xFFFFFF);
        assert!(canvas.pixels().iter().all(|&p| p == 0));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn test_line_includes_endpoints() {
        let mut canvas = Canvas::new(10, 10);
        canvas.line((1.0, 1.0), (8.0, 5.0), 0x123456);
        assert_eq!(canvas.pixel(1, 1), Some(0x123456));
        assert_eq!(canvas.pixel(8, 5), Some(0x123456));
        assert_eq!(canvas.pixel(0, 9), Some(0));
    }

    #[test]
    fn test_line_clipped_outside_canvas() {
        let mut canvas = Canvas::new(5, 5);
        canvas.line((-3.0, 2.0), (7.0, 2.0), 0xABCDEF);
        for x in 0..5 {
            assert_eq!(canvas.pixel(x, 2), Some(0xABCDEF));
        }
    }

    #[test]
    fn test_disc() {
        let mut canvas = Canvas::new(9, 9);
        canvas.disc((4, 4), 2, 0x00FF00);
        assert_eq!(canvas.pixel(4, 4), Some(0x00FF00));
        assert_eq!(canvas.pixel(6, 4), Some(0x00FF00));
        assert_eq!(canvas.pixel(6, 6), Some(0));
    }

    #[test]
    fn test_draw_landmarks_colors_by_visibility() {
        let mut landmarks = [Landmark::new(0.5, 0.5, 0.0, 1.0); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::Nose as usize] = Landmark::new(0.1, 0.1, 0.0, 0.1);
        let set = LandmarkSet::new(landmarks);

        let mut canvas = Canvas::new(100, 100);
        canvas.draw_landmarks(&set);

        assert_eq!(canvas.pixel(10, 10), Some(LOW_VISIBILITY_COLOR));
        assert_eq!(canvas.pixel(50, 50), Some(LANDMARK_COLOR));
    }

    #[test]
    fn test_draw_roi_outline() {
        let roi = Roi {
            center_x: 0.5,
            center_y: 0.5,
            width: 0.5,
            height: 0.5,
            rotation: 0.0,
        };
        let mut canvas = Canvas::new(100, 100);
        canvas.draw_roi(&roi);

        assert_eq!(canvas.pixel(25, 25), Some(ROI_COLOR));
        assert_eq!(canvas.pixel(75, 50), Some(ROI_COLOR));
        assert_eq!(canvas.pixel(50, 50), Some(0));
    }

    #[test]
    fn test_far_off_canvas_landmark_is_clipped() {
        let mut landmarks = [Landmark::new(0.5, 0.5, 0.0, 1.0); LandmarkIndex::COUNT];
        // Nose(0.5, 0.5) - LeftEyeInner の辺がキャンバス右端まで伸びる
        landmarks[LandmarkIndex::LeftEyeInner as usize] = Landmark::new(1.0e7, 0.5, 0.0, 1.0);
        let set = LandmarkSet::new(landmarks);

        let mut canvas = Canvas::new(640, 480);
        canvas.draw_landmarks(&set);

        assert_eq!(canvas.pixel(639, 240), Some(SKELETON_COLOR));
        assert_eq!(canvas.pixel(400, 240), Some(SKELETON_COLOR));
    }

    #[test]
    fn test_non_finite_landmarks_are_skipped() {
        let mut landmarks = [Landmark::new(0.5, 0.5, 0.0, 1.0); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::LeftEyeInner as usize] = Landmark::new(f32::INFINITY, 0.5, 0.0, 1.0);
        landmarks[LandmarkIndex::RightEyeInner as usize] = Landmark::new(f32::NAN, f32::NAN, 0.0, 1.0);
        let set = LandmarkSet::new(landmarks);

        let mut canvas = Canvas::new(64, 48);
        canvas.draw_landmarks(&set);

        // NaN が (0, 0) に化けて描かれない
        assert_eq!(canvas.pixel(0, 0), Some(0));
        assert_eq!(canvas.pixel(63, 24), Some(0));
        assert_eq!(canvas.pixel(32, 24), Some(LANDMARK_COLOR));
    }

    #[test]
    fn test_line_with_extreme_endpoints() {
        let mut canvas = Canvas::new(10, 10);
        canvas.line((-1.0e12, 5.0), (1.0e12, 5.0), 0x00FFFF);
        assert_eq!(canvas.pixel(0, 5), Some(0x00FFFF));
        assert_eq!(canvas.pixel(9, 5), Some(0x00FFFF));
        assert_eq!(canvas.pixel(5, 4), Some(0));
    }

    #[test]
    fn test_disc_far_outside_is_ignored() {
        let mut canvas = Canvas::new(10, 10);
        canvas.disc((i32::MAX, i32::MIN), 3, 0xFFFFFF);
        assert!(canvas.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_clip_segment_outside() {
        assert_eq!(clip_segment((-5.0, -5.0), (-1.0, 20.0), 10, 10), None);
        assert_eq!(clip_segment((0.0, f64::NAN), (5.0, 5.0), 10, 10), None);
        assert_eq!(
            clip_segment((-10.0, 5.0), (20.0, 5.0), 10, 10),
            Some(((0, 5), (9, 5)))
        );
    }
}
