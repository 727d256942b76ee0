//! Utility module for pp
//!
//! This module provides common utilities used throughout the application:
//! - Error handling with custom error types
//! - Configuration management
//! - Small formatting helpers shared by the overlay, title and audio code

pub mod config;
pub mod error;

pub use config::{AudioConfig, Config, GeneralConfig, OverlayConfig, PlaybackConfig, WindowConfig};
pub use error::{IntoPlayerError, PlayerError, Result};

/// Format a duration for display
///
/// Returns "HH:MM:SS", or "MM:SS" for durations under an hour
pub fn format_duration(duration: std::time::Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Format a multiplier with at most three decimals and no trailing zeros
///
/// `1.5` becomes "1.5", `2.0` becomes "2", `0.4000000001` becomes "0.4".
pub fn format_factor(value: f64) -> String {
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
