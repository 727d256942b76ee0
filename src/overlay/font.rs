//! Font discovery and glyph rendering for the status overlay

use crate::utils::error::{IntoPlayerError, Result};
use fontdue::layout::{
    CoordinateSystem, GlyphRasterConfig, HorizontalAlign, Layout, LayoutSettings, TextStyle, VerticalAlign,
    WrapStyle,
};
use fontdue::{Font, FontSettings};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// System fonts tried in order when no font is configured
#[cfg(target_os = "linux")]
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
];

#[cfg(target_os = "macos")]
const SYSTEM_FONTS: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/System/Library/Fonts/SFNS.ttf",
];

#[cfg(target_os = "windows")]
const SYSTEM_FONTS: &[&str] = &[
    "C:\\Windows\\Fonts\\segoeui.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\tahoma.ttf",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const SYSTEM_FONTS: &[&str] = &[];

/// Paths to try, the configured one first
pub fn font_candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONTS.iter().map(PathBuf::from))
        .collect()
}

/// Load the first candidate that parses as a font
pub fn load_first(candidates: &[PathBuf]) -> Option<(PathBuf, Font)> {
    candidates.iter().find_map(|path| match load_font(path) {
        Ok(font) => Some((path.clone(), font)),
        Err(e) => {
            debug!("Skipping font {}: {}", path.display(), e);
            None
        }
    })
}

fn load_font(path: &Path) -> Result<Font> {
    let bytes = std::fs::read(path)?;
    Font::from_bytes(bytes, FontSettings::default()).renderer_err("Invalid font")
}

/// Pixel rectangle that drawing is confined to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ClipRect {
    /// Limit the rectangle to a `width` x `height` frame
    fn within(self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }

    fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x as i32
            && py >= self.y as i32
            && px < (self.x + self.width) as i32
            && py < (self.y + self.height) as i32
    }
}

struct GlyphBitmap {
    width: usize,
    height: usize,
    bitmap: Vec<u8>,
}

/// Rasterizes single lines of text onto RGBA buffers
pub struct TextPainter {
    font: Font,
    glyph_cache: HashMap<GlyphRasterConfig, GlyphBitmap>,
}

impl TextPainter {
    pub fn new(font: Font) -> Self {
        Self {
            font,
            glyph_cache: HashMap::new(),
        }
    }

    fn layout(&self, text: &str, size: f32, x: f32, y: f32) -> Layout {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x,
            y,
            max_width: None,
            max_height: None,
            horizontal_align: HorizontalAlign::Left,
            vertical_align: VerticalAlign::Top,
            line_height: 1.0,
            wrap_style: WrapStyle::Letter,
            wrap_hard_breaks: true,
        });
        layout.append(&[&self.font], &TextStyle::new(text, size, 0));
        layout
    }

    /// Width and height of `text` at `size` pixels
    pub fn measure(&self, text: &str, size: f32) -> (u32, u32) {
        let layout = self.layout(text, size, 0.0, 0.0);
        let width = layout
            .glyphs()
            .iter()
            .map(|g| g.x + g.width as f32)
            .fold(0.0f32, f32::max);
        (width.ceil() as u32, layout.height().ceil() as u32)
    }

    /// Draw `text` with its top-left corner at (x, y), touching only `clip`
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        frame: &mut [u8],
        width: u32,
        height: u32,
        clip: ClipRect,
        x: u32,
        y: u32,
        text: &str,
        size: f32,
        color: [u8; 4],
    ) {
        let layout = self.layout(text, size, x as f32, y as f32);
        let clip = clip.within(width, height);

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let font = &self.font;
            let bitmap = self.glyph_cache.entry(glyph.key).or_insert_with(|| {
                let (_, bitmap) = font.rasterize_config(glyph.key);
                GlyphBitmap {
                    width: glyph.width,
                    height: glyph.height,
                    bitmap,
                }
            });
            blend_glyph(
                frame,
                width,
                clip,
                glyph.x.round() as i32,
                glyph.y.round() as i32,
                bitmap,
                color,
            );
        }
    }
}

fn blend_glyph(frame: &mut [u8], frame_width: u32, clip: ClipRect, x: i32, y: i32, glyph: &GlyphBitmap, color: [u8; 4]) {
    for row in 0..glyph.height {
        let py = y + row as i32;

        for col in 0..glyph.width {
            let px = x + col as i32;
            if !clip.contains(px, py) {
                continue;
            }
            let mask = glyph.bitmap[row * glyph.width + col];
            if mask == 0 {
                continue;
            }
            let alpha = ((u16::from(mask) * u16::from(color[3])) / 255) as u8;
            let idx = ((py as u32 * frame_width + px as u32) * 4) as usize;
            blend_pixel(frame, idx, [color[0], color[1], color[2], alpha]);
        }
    }
}

/// Source-over blend of one RGBA pixel
pub fn blend_pixel(frame: &mut [u8], idx: usize, src: [u8; 4]) {
    let alpha = u16::from(src[3]);
    if alpha == 0 {
        return;
    }
    let inv_alpha = 255_u16 - alpha;
    for channel in 0..3 {
        let dst = u16::from(frame[idx + channel]);
        let src_c = u16::from(src[channel]);
        frame[idx + channel] = ((src_c * alpha + dst * inv_alpha + 127) / 255) as u8;
    }
    frame[idx + 3] = 255;
}
