use crate::pose::LandmarkIndex as L;

/// 骨格の接続定義 (開始ランドマーク, 終了ランドマーク)
pub const POSE_CONNECTIONS: [(L, L); 35] = [
    // 顔
    (L::Nose, L::LeftEyeInner),
    (L::LeftEyeInner, L::LeftEye),
    (L::LeftEye, L::LeftEyeOuter),
    (L::LeftEyeOuter, L::LeftEar),
    (L::Nose, L::RightEyeInner),
    (L::RightEyeInner, L::RightEye),
    (L::RightEye, L::RightEyeOuter),
    (L::RightEyeOuter, L::RightEar),
    (L::MouthLeft, L::MouthRight),
    // 上半身
    (L::LeftShoulder, L::RightShoulder),
    (L::LeftShoulder, L::LeftElbow),
    (L::LeftElbow, L::LeftWrist),
    (L::LeftWrist, L::LeftPinky),
    (L::LeftWrist, L::LeftIndex),
    (L::LeftWrist, L::LeftThumb),
    (L::LeftPinky, L::LeftIndex),
    (L::RightShoulder, L::RightElbow),
    (L::RightElbow, L::RightWrist),
    (L::RightWrist, L::RightPinky),
    (L::RightWrist, L::RightIndex),
    (L::RightWrist, L::RightThumb),
    (L::RightPinky, L::RightIndex),
    // 胴体
    (L::LeftShoulder, L::LeftHip),
    (L::RightShoulder, L::RightHip),
    (L::LeftHip, L::RightHip),
    // 下半身
    (L::LeftHip, L::LeftKnee),
    (L::RightHip, L::RightKnee),
    (L::LeftKnee, L::LeftAnkle),
    (L::RightKnee, L::RightAnkle),
    (L::LeftAnkle, L::LeftHeel),
    (L::RightAnkle, L::RightHeel),
    (L::LeftHeel, L::LeftFootIndex),
    (L::RightHeel, L::RightFootIndex),
    (L::LeftAnkle, L::LeftFootIndex),
    (L::RightAnkle, L::RightFootIndex),
];

/// 表示する可視性の閾値
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

/// ランドマークの色 (RGB)
pub const LANDMARK_COLOR: u32 = 0x00FF00; // 緑

/// 骨格線の色 (RGB)
pub const SKELETON_COLOR: u32 = 0xFFFFFF; // 白

/// 可視性が低いランドマークの色 (RGB)
pub const LOW_VISIBILITY_COLOR: u32 = 0xFF0000; // 赤

/// ROI枠の色 (RGB)
pub const ROI_COLOR: u32 = 0xFF00FF; // マゼンタ

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_connections_unique() {
        let edges: HashSet<(usize, usize)> = POSE_CONNECTIONS
            .iter()
            .map(|&(a, b)| ((a as usize).min(b as usize), (a as usize).max(b as usize)))
            .collect();
        assert_eq!(edges.len(), POSE_CONNECTIONS.len());
    }

    #[test]
    fn test_every_body_landmark_connected() {
        let used: HashSet<usize> = POSE_CONNECTIONS
            .iter()
            .flat_map(|&(a, b)| [a as usize, b as usize])
            .collect();
        assert_eq!(used.len(), L::COUNT);
    }
}
