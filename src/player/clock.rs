//! Frame pacing against the wall clock
//!
//! The clock maps wall time to media time through an anchor: the media
//! position at a known instant plus the speed since then. Each decoded frame
//! is compared against it to decide whether to show it, hold it back or
//! throw it away.

use std::time::{Duration, Instant};

/// Frames later than this many frame intervals are dropped
pub const DROP_THRESHOLD_FRAMES: f64 = 2.0;

/// Action to take for a video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    /// Show the frame now
    Display,

    /// Hold the frame until the given instant
    Wait(Instant),

    /// The frame is too late to be worth showing
    Drop,
}

/// Media clock anchored to wall time
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    anchor_position: Duration,
    anchor_instant: Instant,
    speed: f64,
    paused: bool,
    frame_interval: Duration,
}

impl PlaybackClock {
    pub fn new(now: Instant, frame_interval: Duration) -> Self {
        Self {
            anchor_position: Duration::ZERO,
            anchor_instant: now,
            speed: 1.0,
            paused: false,
            frame_interval,
        }
    }

    /// Declare that `position` is being shown at `now`
    pub fn anchor(&mut self, position: Duration, now: Instant) {
        self.anchor_position = position;
        self.anchor_instant = now;
    }

    /// Change speed without a jump in media time
    pub fn set_speed(&mut self, speed: f64, now: Instant) {
        let position = self.media_time(now);
        self.anchor(position, now);
        self.speed = speed;
    }

    pub fn set_frame_interval(&mut self, frame_interval: Duration) {
        self.frame_interval = frame_interval;
    }

    /// Freeze media time at its current value
    pub fn pause(&mut self, now: Instant) {
        if !self.paused {
            let position = self.media_time(now);
            self.anchor(position, now);
            self.paused = true;
        }
    }

    /// Continue from `position`
    pub fn resume(&mut self, position: Duration, now: Instant) {
        self.anchor(position, now);
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Media position the screen should be showing at `now`
    pub fn media_time(&self, now: Instant) -> Duration {
        if self.paused {
            return self.anchor_position;
        }
        let elapsed = now.saturating_duration_since(self.anchor_instant).as_secs_f64();
        self.anchor_position + Duration::from_secs_f64(elapsed * self.speed)
    }

    /// Lateness in media time beyond which frames are dropped
    pub fn drop_threshold(&self) -> Duration {
        self.frame_interval.mul_f64(DROP_THRESHOLD_FRAMES)
    }

    /// Decide what to do with a frame carrying `pts`
    pub fn schedule(&self, pts: Duration, now: Instant) -> FrameAction {
        if self.paused {
            return FrameAction::Wait(now + self.frame_interval);
        }

        let media_now = self.media_time(now);

        if pts > media_now {
            let ahead = (pts - self.anchor_position).as_secs_f64() / self.speed;
            let deadline = self.anchor_instant + Duration::from_secs_f64(ahead);
            if deadline > now {
                return FrameAction::Wait(deadline);
            }
            return FrameAction::Display;
        }

        if media_now - pts > self.drop_threshold() {
            FrameAction::Drop
        } else {
            FrameAction::Display
        }
    }
}
