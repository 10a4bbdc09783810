use anyhow::Result;
use ndarray::Array4;
use opencv::{
    core::{self, AlgorithmHint, Mat, Point2f, Scalar, Size, Vector, CV_32FC3},
    imgproc,
    prelude::*,
};

use super::roi::Roi;

/// BlazePose ランドマークモデルの入力サイズ
pub const BLAZEPOSE_INPUT_SIZE: i32 = 256;

/// ROI を切り出して BlazePose 用の入力テンソルに変換
///
/// - ROI の回転を打ち消すアフィン変換で 256x256 に切り出し (枠外は黒)
/// - BGR -> RGB
/// - [1, 256, 256, 3] の f32 テンソル (0.0-1.0)
pub fn preprocess_for_blazepose(frame: &Mat, roi: &Roi) -> Result<Array4<f32>> {
    let frame_w = frame.cols() as u32;
    let frame_h = frame.rows() as u32;
    let size = BLAZEPOSE_INPUT_SIZE as f32;

    // 左上, 右上, 左下 の3点で変換を決める
    let [tl, tr, _, bl] = roi.corners(frame_w, frame_h);
    let src: Vector<Point2f> = Vector::from_iter([
        Point2f::new(tl.0, tl.1),
        Point2f::new(tr.0, tr.1),
        Point2f::new(bl.0, bl.1),
    ]);
    let dst: Vector<Point2f> = Vector::from_iter([
        Point2f::new(0.0, 0.0),
        Point2f::new(size, 0.0),
        Point2f::new(0.0, size),
    ]);
    let transform = imgproc::get_affine_transform(&src, &dst)?;

    let mut cropped = Mat::default();
    imgproc::warp_affine(
        frame,
        &mut cropped,
        &transform,
        Size::new(BLAZEPOSE_INPUT_SIZE, BLAZEPOSE_INPUT_SIZE),
        imgproc::INTER_LINEAR,
        core::BORDER_CONSTANT,
        Scalar::all(0.0),
    )?;

    // BGR -> RGB
    let mut rgb = Mat::default();
    imgproc::cvt_color(&cropped, &mut rgb, imgproc::COLOR_BGR2RGB, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

    // f32 (0.0-1.0) に変換
    let mut float_mat = Mat::default();
    rgb.convert_to(&mut float_mat, CV_32FC3, 1.0 / 255.0, 0.0)?;

    let n = BLAZEPOSE_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, n, n, 3));

    for y in 0..BLAZEPOSE_INPUT_SIZE {
        for x in 0..BLAZEPOSE_INPUT_SIZE {
            let pixel = float_mat.at_2d::<core::Vec3f>(y, x)?;
            tensor[[0, y as usize, x as usize, 0]] = pixel[0];
            tensor[[0, y as usize, x as usize, 1]] = pixel[1];
            tensor[[0, y as usize, x as usize, 2]] = pixel[2];
        }
    }

    Ok(tensor)
}
