//! Transport state: pause, speed, mute and the presented position

use super::PlaybackState;
use crate::utils::PlaybackConfig;
use std::time::Duration;

/// Speed changes smaller than this are ignored
pub const MIN_SPEED_DELTA: f64 = 0.01;

/// Clamp `current + delta_secs` into `[0, duration]`
///
/// An unknown (zero) duration only clamps at the start.
pub fn seek_target(current: Duration, delta_secs: f64, duration: Duration) -> Duration {
    let mut target = (current.as_secs_f64() + delta_secs).max(0.0);
    if !duration.is_zero() {
        target = target.min(duration.as_secs_f64());
    }
    Duration::from_secs_f64(target)
}

fn round_speed(speed: f64) -> f64 {
    (speed * 100.0).round() / 100.0
}

/// User-facing playback state
#[derive(Debug, Clone)]
pub struct Transport {
    state: PlaybackState,
    speed: f64,
    muted: bool,
    position: Duration,
    min_speed: f64,
    max_speed: f64,
}

impl Transport {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            state: PlaybackState::Playing,
            speed: round_speed(config.initial_speed.clamp(config.min_speed, config.max_speed)),
            muted: false,
            position: Duration::ZERO,
            min_speed: config.min_speed,
            max_speed: config.max_speed,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Timestamp of the last presented frame
    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn set_position(&mut self, position: Duration) {
        self.position = position;
    }

    /// Flip between playing and paused, returning the new state
    pub fn toggle_pause(&mut self) -> PlaybackState {
        self.state = match self.state {
            PlaybackState::Playing => PlaybackState::Paused,
            PlaybackState::Paused => PlaybackState::Playing,
        };
        self.state
    }

    /// Where a relative seek from the current position lands
    pub fn seek_target(&self, delta_secs: f64, duration: Duration) -> Duration {
        seek_target(self.position, delta_secs, duration)
    }

    /// Adjust the speed by `delta`
    ///
    /// Returns the new speed, or `None` when the delta is negligible or the
    /// speed is already at the limit.
    pub fn change_speed(&mut self, delta: f64) -> Option<f64> {
        if !delta.is_finite() || delta.abs() < MIN_SPEED_DELTA {
            return None;
        }

        let speed = round_speed((self.speed + delta).clamp(self.min_speed, self.max_speed));
        if (speed - self.speed).abs() < 1e-9 {
            return None;
        }

        self.speed = speed;
        Some(speed)
    }

    /// Return to normal speed
    pub fn reset_speed(&mut self) -> Option<f64> {
        self.change_speed(1.0 - self.speed)
    }

    /// Flip the mute flag, returning the new value
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }
}
