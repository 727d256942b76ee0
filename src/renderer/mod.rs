//! Renderer module for pp
//!
//! This module handles GPU-based rendering using wgpu. Frames are uploaded
//! as RGBA textures and drawn on a quad that is scaled to keep the video's
//! aspect ratio, leaving black bars where the window shape differs.

mod pipeline;
mod texture;
mod wgpu_renderer;

pub use wgpu_renderer::WgpuRenderer;

/// Quad scale in clip space that fits a video into a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Letterbox {
    /// The full window, used before any frame is known
    pub const FULL: Letterbox = Letterbox {
        scale_x: 1.0,
        scale_y: 1.0,
    };

    /// Fit a `video` sized frame into a `window` sized surface
    pub fn fit(video: (u32, u32), window: (u32, u32)) -> Self {
        if video.0 == 0 || video.1 == 0 || window.0 == 0 || window.1 == 0 {
            return Self::FULL;
        }

        let video_aspect = video.0 as f32 / video.1 as f32;
        let window_aspect = window.0 as f32 / window.1 as f32;

        if video_aspect > window_aspect {
            Self {
                scale_x: 1.0,
                scale_y: window_aspect / video_aspect,
            }
        } else {
            Self {
                scale_x: video_aspect / window_aspect,
                scale_y: 1.0,
            }
        }
    }

    /// Size of the video area in window pixels
    pub fn viewport(&self, window: (u32, u32)) -> (u32, u32) {
        (
            (window.0 as f32 * self.scale_x).round() as u32,
            (window.1 as f32 * self.scale_y).round() as u32,
        )
    }
}
