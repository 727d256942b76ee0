//! pp - a small video player for browsing a directory of videos
//!
//! Video is decoded with FFmpeg and drawn with wgpu, audio is played by an
//! external ffplay process kept in step with the picture, and the position
//! of every file is remembered between sessions.

pub mod audio;
pub mod decoder;
pub mod overlay;
pub mod player;
pub mod playlist;
pub mod renderer;
pub mod resume;
pub mod utils;
pub mod window;

pub use player::{PlaybackState, PlayerCommand, PlayerController, PlayerEvent, PlayerEventHandler};
pub use utils::{Config, PlayerError, Result};
