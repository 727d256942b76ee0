//! Audio/video drift correction for pp
//!
//! The audio process runs on its own and can only be observed through the
//! anchor it was started with. At a fixed interval the video position is
//! compared with where the audio should be, and when the two have wandered
//! too far apart the audio is restarted at the video position.

use std::time::{Duration, Instant};

/// Outcome of a drift check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncCheck {
    /// The interval has not elapsed yet
    NotDue,

    /// Drift (seconds, video minus audio) is within tolerance
    InSync(f64),

    /// Drift (seconds, video minus audio) is too large, audio must restart
    Resync(f64),
}

/// Periodic drift checker
#[derive(Debug, Clone)]
pub struct AvSync {
    /// Largest tolerated drift
    threshold: Duration,

    /// Time between checks
    interval: Duration,

    /// When the last check (or reset) happened
    last_check: Option<Instant>,
}

impl AvSync {
    pub fn new(threshold: Duration, interval: Duration) -> Self {
        Self {
            threshold,
            interval,
            last_check: None,
        }
    }

    /// Start a new interval, used whenever the audio is (re)started
    pub fn reset(&mut self, now: Instant) {
        self.last_check = Some(now);
    }

    /// Compare positions if a check is due
    pub fn check(&mut self, video: Duration, audio: Duration, now: Instant) -> SyncCheck {
        match self.last_check {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                return SyncCheck::NotDue;
            }
            None => {
                self.last_check = Some(now);
                return SyncCheck::NotDue;
            }
            _ => {}
        }

        self.last_check = Some(now);
        let drift = video.as_secs_f64() - audio.as_secs_f64();

        if drift.abs() > self.threshold.as_secs_f64() {
            SyncCheck::Resync(drift)
        } else {
            SyncCheck::InSync(drift)
        }
    }
}
