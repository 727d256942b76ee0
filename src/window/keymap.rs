//! Keyboard bindings
//!
//! Converts winit logical keys into player commands. Logical keys are used
//! so the bindings follow the user's keyboard layout.

use crate::player::{PlayerCommand, SeekStep};
use winit::keyboard::{Key, NamedKey};

/// Command bound to `key`, if any
pub fn command_for_key(key: &Key) -> Option<PlayerCommand> {
    match key.as_ref() {
        Key::Named(named) => command_for_named(named),
        Key::Character(text) => command_for_char(text),
        _ => None,
    }
}

fn command_for_named(key: NamedKey) -> Option<PlayerCommand> {
    match key {
        NamedKey::Space => Some(PlayerCommand::TogglePause),
        NamedKey::ArrowLeft => Some(PlayerCommand::SeekBackward(SeekStep::Short)),
        NamedKey::ArrowRight => Some(PlayerCommand::SeekForward(SeekStep::Short)),
        NamedKey::ArrowDown => Some(PlayerCommand::SeekBackward(SeekStep::Long)),
        NamedKey::ArrowUp => Some(PlayerCommand::SeekForward(SeekStep::Long)),
        NamedKey::Enter => Some(PlayerCommand::NextVideo),
        NamedKey::Escape => Some(PlayerCommand::Quit),
        _ => None,
    }
}

fn command_for_char(text: &str) -> Option<PlayerCommand> {
    match text.to_lowercase().as_str() {
        " " => Some(PlayerCommand::TogglePause),
        "m" => Some(PlayerCommand::ToggleMute),
        "j" => Some(PlayerCommand::PrevVideo),
        "k" => Some(PlayerCommand::NextVideo),
        "-" | "_" => Some(PlayerCommand::SpeedDown),
        "=" | "+" => Some(PlayerCommand::SpeedUp),
        "0" => Some(PlayerCommand::ResetSpeed),
        "q" => Some(PlayerCommand::Quit),
        _ => None,
    }
}

/// Help text printed at startup
pub fn controls_help(seek_short: u64, seek_long: u64) -> String {
    [
        "Controls:".to_string(),
        "  Space: Pause/Play".to_string(),
        format!("  Left/Right: Seek -/+{}s", seek_short),
        format!("  Down/Up: Seek -/+{}s", seek_long),
        "  j: Previous video".to_string(),
        "  k/Enter: Next video".to_string(),
        "  m: Mute/Unmute".to_string(),
        "  -/+: Slower/Faster, 0: Normal speed".to_string(),
        "  q/ESC: Quit".to_string(),
    ]
    .join("\n")
}
