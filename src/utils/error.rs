//! Error types for pp
//!
//! This module defines the error type shared by every part of the player.
//! We use thiserror for the library-side error enum and anyhow at the
//! binary boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pp
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Window-related errors
    #[error("Window error: {0}")]
    Window(String),

    /// Renderer errors
    #[error("Renderer error: {0}")]
    Renderer(String),

    /// Decoder errors
    #[error("Decoder error: {0}")]
    Decoder(String),

    /// Audio sidecar errors
    #[error("Audio error: {0}")]
    Audio(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Resume file (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// Directory scanned but nothing playable inside
    #[error("No video files found in {}", .0.display())]
    NoMedia(PathBuf),
}

impl From<ffmpeg_next::Error> for PlayerError {
    fn from(err: ffmpeg_next::Error) -> Self {
        PlayerError::Decoder(format!("FFmpeg error: {}", err))
    }
}

impl From<serde_json::Error> for PlayerError {
    fn from(err: serde_json::Error) -> Self {
        PlayerError::Serialization(err.to_string())
    }
}

impl PlayerError {
    /// Create a decoder error from string
    pub fn decoder_error<S: Into<String>>(msg: S) -> Self {
        PlayerError::Decoder(msg.into())
    }
}

/// Convenience type alias for Results in pp
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Extension trait for converting other errors to PlayerError
pub trait IntoPlayerError<T> {
    /// Convert this error into a PlayerError with the given context
    fn window_err(self, context: &str) -> Result<T>;
    fn renderer_err(self, context: &str) -> Result<T>;
    fn decoder_err(self, context: &str) -> Result<T>;
    fn audio_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoPlayerError<T> for std::result::Result<T, E> {
    fn window_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Window(format!("{}: {}", context, e)))
    }

    fn renderer_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Renderer(format!("{}: {}", context, e)))
    }

    fn decoder_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Decoder(format!("{}: {}", context, e)))
    }

    fn audio_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Audio(format!("{}: {}", context, e)))
    }
}
