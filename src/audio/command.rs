//! Command line construction for the audio process

use crate::utils::format_factor;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest factor a single atempo filter accepts
pub const ATEMPO_MIN: f64 = 0.5;

/// Largest factor a single atempo filter accepts
pub const ATEMPO_MAX: f64 = 2.0;

/// Fully resolved audio process invocation
#[derive(Debug, Clone, PartialEq)]
pub struct AudioCommand {
    /// Program to run, `ffplay` unless configured otherwise
    pub program: String,

    /// Arguments in order
    pub args: Vec<String>,

    /// Media file being played
    pub path: PathBuf,
}

impl AudioCommand {
    /// Build the invocation that plays `path` from `position`
    pub fn build(program: &str, path: &Path, position: Duration, speed: f64, muted: bool) -> Self {
        let mut args = vec![
            "-nodisp".to_string(),
            "-autoexit".to_string(),
            "-loglevel".to_string(),
            "quiet".to_string(),
            "-ss".to_string(),
            format!("{:.3}", position.as_secs_f64()),
        ];

        if let Some(filters) = filter_chain(speed, muted) {
            args.push("-af".to_string());
            args.push(filters);
        }

        args.push(path.to_string_lossy().into_owned());

        Self {
            program: program.to_string(),
            args,
            path: path.to_path_buf(),
        }
    }

    /// Value passed with `-af`, if any
    pub fn filters(&self) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == "-af")
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Value passed with `-ss`
    pub fn start_secs(&self) -> Option<f64> {
        self.args
            .iter()
            .position(|a| a == "-ss")
            .and_then(|i| self.args.get(i + 1))
            .and_then(|v| v.parse().ok())
    }
}

/// Split a speed into atempo factors that each stay within range
///
/// Returns nothing for normal speed.
pub fn atempo_factors(speed: f64) -> Vec<f64> {
    if !speed.is_finite() || speed <= 0.0 || (speed - 1.0).abs() < 1e-9 {
        return Vec::new();
    }

    let mut factors = Vec::new();
    let mut remaining = speed;

    while remaining > ATEMPO_MAX {
        factors.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        factors.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    factors.push(remaining);

    factors
}

/// Comma separated `-af` filter string for the given state
pub fn filter_chain(speed: f64, muted: bool) -> Option<String> {
    let mut filters = Vec::new();

    if muted {
        filters.push("volume=0".to_string());
    }
    filters.extend(
        atempo_factors(speed)
            .into_iter()
            .map(|f| format!("atempo={}", format_factor(f))),
    );

    if filters.is_empty() {
        None
    } else {
        Some(filters.join(","))
    }
}
