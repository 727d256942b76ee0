//! Audio module for pp
//!
//! Sound is played by an external ffplay process started at the current
//! position with the current speed and mute state baked into its filter
//! chain. The process cannot be adjusted while it runs, so every change of
//! state is a stop followed by a fresh start. This module tracks the single
//! running process and where its playback is expected to be.

mod command;
mod ffplay;
mod sync;

pub use command::{atempo_factors, filter_chain, AudioCommand, ATEMPO_MAX, ATEMPO_MIN};
pub use ffplay::{check_available, FfplayLauncher, FfplayProcess};
pub use sync::{AvSync, SyncCheck};

use crate::utils::error::Result;
use log::{debug, info, warn};
use std::path::Path;
use std::time::{Duration, Instant};

/// Handle to a spawned audio process
pub trait AudioProcess {
    /// Whether the process has not exited yet
    fn is_running(&mut self) -> bool;

    /// Terminate and reap the process
    fn kill(&mut self) -> Result<()>;
}

/// Something that can start audio processes
pub trait ProcessLauncher {
    /// Whether `program` can be run at all
    fn is_available(&self, program: &str) -> bool;

    /// Start a process for the given invocation
    fn launch(&self, command: &AudioCommand) -> Result<Box<dyn AudioProcess>>;
}

/// Where the audio was started and how fast it runs
#[derive(Debug, Clone, Copy, PartialEq)]
struct AudioAnchor {
    position: Duration,
    started: Instant,
    speed: f64,
}

/// The external audio player, at most one process at a time
pub struct AudioSidecar {
    launcher: Box<dyn ProcessLauncher>,
    program: String,
    enabled: bool,
    process: Option<Box<dyn AudioProcess>>,
    anchor: Option<AudioAnchor>,
    last_command: Option<AudioCommand>,
    launches: u64,
}

impl AudioSidecar {
    /// Create a sidecar; it stays silent if disabled or the program is missing
    pub fn new(launcher: Box<dyn ProcessLauncher>, program: &str, enabled: bool) -> Self {
        let enabled = if !enabled {
            info!("Audio disabled");
            false
        } else if !launcher.is_available(program) {
            warn!("'{}' not found, playing without audio", program);
            false
        } else {
            true
        };

        Self {
            launcher,
            program: program.to_string(),
            enabled,
            process: None,
            anchor: None,
            last_command: None,
            launches: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a process has been started and not stopped since
    pub fn is_active(&self) -> bool {
        self.process.is_some()
    }

    /// Number of processes started so far
    pub fn launches(&self) -> u64 {
        self.launches
    }

    /// The invocation used for the most recent start
    pub fn last_command(&self) -> Option<&AudioCommand> {
        self.last_command.as_ref()
    }

    /// Start playing `path` from `position`, replacing any running process
    pub fn start(&mut self, path: &Path, position: Duration, speed: f64, muted: bool, now: Instant) -> Result<()> {
        self.stop();

        if !self.enabled {
            return Ok(());
        }

        let command = AudioCommand::build(&self.program, path, position, speed, muted);
        debug!(
            "Starting audio at {:.2}s (filters: {})",
            position.as_secs_f64(),
            command.filters().unwrap_or("none")
        );

        let process = self.launcher.launch(&command)?;
        self.process = Some(process);
        self.anchor = Some(AudioAnchor {
            position,
            started: now,
            speed,
        });
        self.last_command = Some(command);
        self.launches += 1;

        Ok(())
    }

    /// Same as `start`; the name reads better at call sites that change state
    pub fn restart(&mut self, path: &Path, position: Duration, speed: f64, muted: bool, now: Instant) -> Result<()> {
        self.start(path, position, speed, muted, now)
    }

    /// Kill the running process, if any
    pub fn stop(&mut self) {
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill() {
                warn!("Failed to stop audio: {}", e);
            }
        }
        self.anchor = None;
    }

    /// Detect a process that ended on its own
    ///
    /// Returns true once per exit; the process is forgotten afterwards.
    pub fn poll_exited(&mut self) -> bool {
        let exited = match self.process.as_mut() {
            Some(process) => !process.is_running(),
            None => false,
        };

        if exited {
            self.process = None;
            self.anchor = None;
        }
        exited
    }

    /// Where the audio should be by now, if it is playing
    pub fn estimated_position(&self, now: Instant) -> Option<Duration> {
        self.anchor.map(|anchor| {
            let elapsed = now.saturating_duration_since(anchor.started).as_secs_f64();
            anchor.position + Duration::from_secs_f64(elapsed * anchor.speed)
        })
    }
}

impl Drop for AudioSidecar {
    fn drop(&mut self) {
        self.stop();
    }
}
