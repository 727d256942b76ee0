//! ffplay process management

use super::{AudioCommand, AudioProcess, ProcessLauncher};
use crate::utils::error::{IntoPlayerError, Result};
use log::{debug, trace};
use std::process::{Child, Command, Stdio};

/// Check whether `program` can be executed
pub fn check_available(program: &str) -> bool {
    let available = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false);

    debug!("Audio program '{}' available: {}", program, available);
    available
}

/// Launches real audio processes
#[derive(Debug, Default, Clone, Copy)]
pub struct FfplayLauncher;

impl ProcessLauncher for FfplayLauncher {
    fn is_available(&self, program: &str) -> bool {
        check_available(program)
    }

    fn launch(&self, command: &AudioCommand) -> Result<Box<dyn AudioProcess>> {
        trace!("Spawning {} {}", command.program, command.args.join(" "));

        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .audio_err(&format!("Failed to spawn {}", command.program))?;

        debug!("Audio process {} started", child.id());
        Ok(Box::new(FfplayProcess { child }))
    }
}

/// A running ffplay child
pub struct FfplayProcess {
    child: Child,
}

impl AudioProcess for FfplayProcess {
    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn kill(&mut self) -> Result<()> {
        if self.is_running() {
            self.child.kill().audio_err("Failed to kill audio process")?;
        }
        self.child.wait().audio_err("Failed to reap audio process")?;
        debug!("Audio process {} stopped", self.child.id());
        Ok(())
    }
}

impl Drop for FfplayProcess {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
