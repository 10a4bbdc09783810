use std::time::Duration;

use super::landmark::{Landmark, LandmarkIndex, LandmarkSet};

/// 座標用 One Euro Filter のパラメータ (MediaPipe Pose と同じ値)
pub const MIN_CUTOFF: f32 = 0.05;
pub const BETA: f32 = 80.0;
pub const DERIVATE_CUTOFF: f32 = 0.01;

/// 可視性の指数平滑化係数
pub const VISIBILITY_ALPHA: f32 = 0.1;

/// タイムスタンプが進まなかったときに使うフレーム間隔
const FALLBACK_DT: f32 = 1.0 / 30.0;

/// Low-pass filter component
#[derive(Debug, Clone, Copy, Default)]
struct LowPassFilter {
    prev: Option<f32>,
}

impl LowPassFilter {
    fn filter(&mut self, value: f32, alpha: f32) -> f32 {
        let result = match self.prev {
            Some(prev) => alpha * value + (1.0 - alpha) * prev,
            None => value,
        };
        self.prev = Some(result);
        result
    }
}

/// alpha = 1 / (1 + tau/Te), tau = 1/(2*pi*fc)
fn smoothing_factor(te: f32, cutoff: f32) -> f32 {
    let r = 2.0 * std::f32::consts::PI * cutoff * te;
    r / (r + 1.0)
}

/// One Euro Filter for a single scalar value
///
/// 速度は `value_scale` 倍してからカットオフ計算に使う。
/// 姿勢が小さく写っているほど同じ見かけの動きを大きな動きとして扱う。
#[derive(Debug, Clone, Copy)]
struct ScalarFilter {
    min_cutoff: f32,
    beta: f32,
    d_cutoff: f32,
    x_filter: LowPassFilter,
    dx_filter: LowPassFilter,
    prev_value: Option<f32>,
}

impl ScalarFilter {
    fn new(min_cutoff: f32, beta: f32, d_cutoff: f32) -> Self {
        Self {
            min_cutoff,
            beta,
            d_cutoff,
            x_filter: LowPassFilter::default(),
            dx_filter: LowPassFilter::default(),
            prev_value: None,
        }
    }

    fn filter(&mut self, value: f32, dt: f32, value_scale: f32) -> f32 {
        let dx = match self.prev_value {
            Some(prev) if dt > 0.0 => (value - prev) * value_scale / dt,
            _ => 0.0,
        };
        self.prev_value = Some(value);

        let edx = self
            .dx_filter
            .filter(dx, smoothing_factor(dt, self.d_cutoff));
        let cutoff = self.min_cutoff + self.beta * edx.abs();
        self.x_filter.filter(value, smoothing_factor(dt, cutoff))
    }
}

/// 33ランドマークの時系列平滑化
///
/// x/y/z は One Euro Filter、visibility は指数平滑化。
pub struct LandmarkSmoother {
    coords: [[ScalarFilter; 3]; LandmarkIndex::COUNT],
    visibility: [LowPassFilter; LandmarkIndex::COUNT],
    last_timestamp: Option<Duration>,
}

impl LandmarkSmoother {
    pub fn new() -> Self {
        Self {
            coords: [[ScalarFilter::new(MIN_CUTOFF, BETA, DERIVATE_CUTOFF); 3]; LandmarkIndex::COUNT],
            visibility: [LowPassFilter::default(); LandmarkIndex::COUNT],
            last_timestamp: None,
        }
    }

    /// `timestamp` は単調増加する任意の基準からの経過時間
    pub fn apply(&mut self, set: &LandmarkSet, timestamp: Duration) -> LandmarkSet {
        let dt = match self.last_timestamp {
            Some(last) => {
                let d = timestamp.saturating_sub(last).as_secs_f32();
                if d > 0.0 { d } else { FALLBACK_DT }
            }
            None => {
                self.last_timestamp = Some(timestamp);
                self.prime(set);
                return *set;
            }
        };
        self.last_timestamp = Some(timestamp);

        let value_scale = 1.0 / object_scale(set).max(f32::EPSILON);

        let mut out = *set.landmarks();
        for (i, lm) in set.iter().enumerate() {
            let [fx, fy, fz] = &mut self.coords[i];
            out[i] = Landmark::new(
                fx.filter(lm.x, dt, value_scale),
                fy.filter(lm.y, dt, value_scale),
                fz.filter(lm.z, dt, value_scale),
                self.visibility[i].filter(lm.visibility, VISIBILITY_ALPHA),
            );
        }
        LandmarkSet::new(out)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn prime(&mut self, set: &LandmarkSet) {
        for (i, lm) in set.iter().enumerate() {
            let [fx, fy, fz] = &mut self.coords[i];
            fx.filter(lm.x, 0.0, 1.0);
            fy.filter(lm.y, 0.0, 1.0);
            fz.filter(lm.z, 0.0, 1.0);
            self.visibility[i].filter(lm.visibility, 1.0);
        }
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::new()
    }
}

/// 姿勢の見かけの大きさ (BBoxの幅と高さの平均、正規化座標)
fn object_scale(set: &LandmarkSet) -> f32 {
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
    for lm in set {
        min_x = min_x.min(lm.x);
        min_y = min_y.min(lm.y);
        max_x = max_x.max(lm.x);
        max_y = max_y.max(lm.y);
    }
    ((max_x - min_x) + (max_y - min_y)) / 2.0
}
