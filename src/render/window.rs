use anyhow::Result;
use minifb::{Key, Window, WindowOptions};
use opencv::core::{Mat, Vec3b};
use opencv::prelude::*;

use super::canvas::Canvas;
use super::Display;
use crate::pose::{LandmarkSet, Roi};

/// minifbを使用したレンダラー
pub struct MinifbRenderer {
    window: Window,
    canvas: Canvas,
}

impl MinifbRenderer {
    /// ウィンドウを作成
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        Ok(Self {
            window,
            canvas: Canvas::new(width, height),
        })
    }

    /// BGR Mat をキャンバスにコピー
    ///
    /// サイズが異なる場合ははみ出た分を捨てる
    pub fn draw_frame(&mut self, frame: &Mat) -> Result<()> {
        let rows = (frame.rows() as usize).min(self.canvas.height());
        let cols = (frame.cols() as usize).min(self.canvas.width());

        for y in 0..rows {
            for x in 0..cols {
                let bgr = frame.at_2d::<Vec3b>(y as i32, x as i32)?;
                let rgb = (bgr[2] as u32) << 16 | (bgr[1] as u32) << 8 | bgr[0] as u32;
                self.canvas.put(x as i32, y as i32, rgb);
            }
        }

        Ok(())
    }

    /// キャンバスをウィンドウに表示
    pub fn update(&mut self) -> Result<()> {
        self.window
            .update_with_buffer(self.canvas.pixels(), self.canvas.width(), self.canvas.height())?;
        Ok(())
    }
}

impl Display for MinifbRenderer {
    type Frame = Mat;

    fn show(&mut self, frame: &Mat, landmarks: Option<&LandmarkSet>, roi: Option<&Roi>) -> Result<()> {
        self.draw_frame(frame)?;
        if let Some(roi) = roi {
            self.canvas.draw_roi(roi);
        }
        if let Some(landmarks) = landmarks {
            self.canvas.draw_landmarks(landmarks);
        }
        self.update()
    }

    /// ウィンドウが閉じられたか ESC が押された
    fn cancel_requested(&self) -> bool {
        !self.window.is_open() || self.window.is_key_down(Key::Escape)
    }
}
