//! Player controller module for pp
//!
//! This module drives playback: it paces decoded frames against the wall
//! clock, applies transport commands to both the picture and the external
//! audio process, keeps the two in sync and moves through the playlist.

mod clock;
mod controller;
mod transport;

pub use clock::{FrameAction, PlaybackClock, DROP_THRESHOLD_FRAMES};
pub use controller::{PlayerController, TickOutcome, MAX_DROPS_PER_TICK};
pub use transport::{seek_target, Transport, MIN_SPEED_DELTA};

use crate::decoder::MediaInfo;
use std::path::PathBuf;
use std::time::Duration;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Frames advance with the clock
    Playing,

    /// Frozen on the last presented frame
    Paused,
}

/// How far a seek key jumps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekStep {
    /// Arrow left/right, 10 s by default
    Short,

    /// Arrow up/down, 60 s by default
    Long,
}

/// User intent, produced by the key map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    TogglePause,
    ToggleMute,
    SeekForward(SeekStep),
    SeekBackward(SeekStep),
    NextVideo,
    PrevVideo,
    SpeedUp,
    SpeedDown,
    ResetSpeed,
    Quit,
}

/// Playback statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Video frames presented
    pub frames_rendered: u64,

    /// Video frames dropped for being late
    pub frames_dropped: u64,

    /// Audio processes started
    pub audio_starts: u64,

    /// Audio restarts caused by drift
    pub audio_resyncs: u64,
}

/// Player event for external event handling
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A playlist entry was opened
    MediaLoaded {
        path: PathBuf,
        index: usize,
        info: MediaInfo,
        resumed_from: Option<Duration>,
    },

    /// Playback resumed
    PlaybackStarted,

    /// Playback paused
    PlaybackPaused,

    /// Position jumped
    Seeked { position: Duration },

    /// Playback speed changed
    SpeedChanged { speed: f64 },

    /// Mute toggled
    MuteChanged { muted: bool },

    /// Audio was restarted to correct drift (seconds, video minus audio)
    AudioResynced { drift: f64 },

    /// The audio process ended before the video did
    AudioExited,

    /// End of media reached
    EndOfMedia,

    /// Error occurred
    Error { message: String },
}

/// Player event handler trait
pub trait PlayerEventHandler {
    /// Handle player event
    fn handle_event(&mut self, event: &PlayerEvent);
}
