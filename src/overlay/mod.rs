//! Transient status text drawn over the video
//!
//! A message stays fully visible for most of its lifetime, fades out over
//! the last part and then disappears. It is composited straight into the
//! RGBA frame before upload, so the renderer never needs to know about it.

mod font;

pub use font::{blend_pixel, font_candidates, load_first, ClipRect, TextPainter};

use crate::decoder::VideoFrame;
use crate::utils::OverlayConfig;
use log::{info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Distance from the frame's top-left corner
const MARGIN: u32 = 10;

/// Space between panel edge and text
const PADDING: u32 = 8;

const PANEL_COLOR: [u8; 4] = [0, 0, 0, 160];
const TEXT_COLOR: [u8; 4] = [255, 255, 255, 255];

/// Frame height the configured font size is meant for
const REFERENCE_HEIGHT: f32 = 720.0;

struct Message {
    text: String,
    shown_at: Instant,
}

/// Font state, probed on first draw
enum FontState {
    Unprobed,
    Loaded(TextPainter),
    Missing,
}

/// The status overlay
pub struct StatusOverlay {
    duration: Duration,
    fade: Duration,
    font_size: f32,
    font_path: Option<PathBuf>,
    message: Option<Message>,
    font: FontState,
}

impl StatusOverlay {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            duration: config.duration(),
            fade: config.fade().min(config.duration()),
            font_size: config.font_size,
            font_path: config.font_path.clone(),
            message: None,
            font: FontState::Unprobed,
        }
    }

    /// Replace the current message
    pub fn show(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        info!("{}", text);
        self.message = Some(Message { text, shown_at: now });
    }

    /// Current message text, even if it has expired but not been cleared yet
    pub fn text(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.text.as_str())
    }

    /// Opacity of the message at `now`, clearing it once expired
    pub fn alpha(&mut self, now: Instant) -> Option<f32> {
        let elapsed = now.saturating_duration_since(self.message.as_ref()?.shown_at);

        if elapsed >= self.duration {
            self.message = None;
            return None;
        }

        let fade_start = self.duration - self.fade;
        if elapsed < fade_start || self.fade.is_zero() {
            return Some(1.0);
        }

        let into_fade = (elapsed - fade_start).as_secs_f32();
        Some((1.0 - into_fade / self.fade.as_secs_f32()).clamp(0.0, 1.0))
    }

    pub fn is_visible(&mut self, now: Instant) -> bool {
        self.alpha(now).is_some()
    }

    fn painter(&mut self) -> Option<&mut TextPainter> {
        if let FontState::Unprobed = self.font {
            let candidates = font_candidates(self.font_path.as_deref());
            self.font = match load_first(&candidates) {
                Some((path, font)) => {
                    log::debug!("Overlay font: {}", path.display());
                    FontState::Loaded(TextPainter::new(font))
                }
                None => {
                    warn!("No usable font found, status messages will show without text");
                    FontState::Missing
                }
            };
        }

        match &mut self.font {
            FontState::Loaded(painter) => Some(painter),
            _ => None,
        }
    }

    /// Composite the current message onto `frame`
    pub fn draw(&mut self, frame: &mut VideoFrame, now: Instant) {
        let alpha = match self.alpha(now) {
            Some(alpha) if alpha > 0.0 => alpha,
            _ => return,
        };
        let text = match self.text() {
            Some(text) => text.to_string(),
            None => return,
        };

        let size = self.font_size * (frame.height as f32 / REFERENCE_HEIGHT).max(1.0);
        let (width, height) = (frame.width, frame.height);

        let text_size = match self.painter() {
            Some(painter) => painter.measure(&text, size),
            None => ((size * 0.6 * text.chars().count() as f32) as u32, size.ceil() as u32),
        };

        let panel_w = (text_size.0 + 2 * PADDING).min(width.saturating_sub(MARGIN));
        let panel_h = (text_size.1 + 2 * PADDING).min(height.saturating_sub(MARGIN));
        fill_rect(frame, MARGIN, MARGIN, panel_w, panel_h, scale_alpha(PANEL_COLOR, alpha));

        let panel = ClipRect {
            x: MARGIN,
            y: MARGIN,
            width: panel_w,
            height: panel_h,
        };
        if let Some(painter) = self.painter() {
            painter.draw(
                &mut frame.data,
                width,
                height,
                panel,
                MARGIN + PADDING,
                MARGIN + PADDING,
                &text,
                size,
                scale_alpha(TEXT_COLOR, alpha),
            );
        }
    }
}

fn scale_alpha(color: [u8; 4], factor: f32) -> [u8; 4] {
    let alpha = (color[3] as f32 * factor.clamp(0.0, 1.0)).round() as u8;
    [color[0], color[1], color[2], alpha]
}

fn fill_rect(frame: &mut VideoFrame, x: u32, y: u32, w: u32, h: u32, color: [u8; 4]) {
    let x_end = (x + w).min(frame.width);
    let y_end = (y + h).min(frame.height);
    let stride = frame.stride();

    for py in y..y_end {
        for px in x..x_end {
            let idx = py as usize * stride + px as usize * 4;
            blend_pixel(&mut frame.data, idx, color);
        }
    }
}
