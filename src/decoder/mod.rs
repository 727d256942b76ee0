//! Decoder module for pp
//!
//! Video decoding is delegated to FFmpeg through the ffmpeg-next crate.
//! The player only sees the `Decoder` trait: open a file, pull RGBA frames
//! in presentation order and move the read cursor.

mod ffmpeg_decoder;

pub use ffmpeg_decoder::FFmpegDecoder;

use crate::utils::error::Result;
use std::path::Path;
use std::time::Duration;

/// Frame rate assumed when the container reports none
pub const FALLBACK_FPS: f64 = 30.0;

/// Decoder trait defining the interface for media decoding
pub trait Decoder {
    /// Open a media file for decoding
    ///
    /// Any previously opened file is closed first.
    fn open_file(&mut self, path: &Path) -> Result<MediaInfo>;

    /// Decode the next video frame
    ///
    /// Returns `None` once the end of the stream is reached.
    fn decode_frame(&mut self) -> Result<Option<VideoFrame>>;

    /// Move the read cursor so the next decoded frame is the one at
    /// (or just after) `position`
    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Timestamp of the last decoded frame
    fn position(&self) -> Duration;

    /// Check if end of stream is reached
    fn is_eof(&self) -> bool;

    /// Release the open file, if any
    fn close(&mut self);
}

/// Media information
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// File path
    pub source: String,

    /// Total duration
    pub duration: Duration,

    /// Frame rate (frames per second)
    pub fps: f64,

    /// Number of frames, 0 if unknown
    pub frame_count: u64,

    /// Video width
    pub width: u32,

    /// Video height
    pub height: u32,

    /// Whether the file carries an audio stream
    pub has_audio: bool,
}

impl MediaInfo {
    /// Length of one frame at normal speed
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps)
    }
}

/// Pick a usable frame rate from what the container reported
pub fn sanitize_fps(reported: f64) -> f64 {
    if reported.is_finite() && reported > 0.0 {
        reported
    } else {
        FALLBACK_FPS
    }
}

/// Resolve a duration, falling back to `frame_count / fps`
pub fn resolve_duration(container: Option<Duration>, frame_count: u64, fps: f64) -> Duration {
    match container {
        Some(duration) if !duration.is_zero() => duration,
        _ if frame_count > 0 => Duration::from_secs_f64(frame_count as f64 / sanitize_fps(fps)),
        _ => Duration::ZERO,
    }
}

/// Decoded video frame in tightly packed RGBA
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Pixel data, `width * height * 4` bytes
    pub data: Vec<u8>,

    /// Frame width
    pub width: u32,

    /// Frame height
    pub height: u32,

    /// Presentation timestamp
    pub pts: Duration,
}

impl VideoFrame {
    /// Create a frame filled with one color
    pub fn solid(width: u32, height: u32, pts: Duration, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            data,
            width,
            height,
            pts,
        }
    }

    /// Row length in bytes
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }
}
