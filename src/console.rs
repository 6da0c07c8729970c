//! Operator command parsing
//!
//! The operator line interface is a thin external collaborator; this
//! module only defines the command vocabulary and its parser. Matching is
//! case-insensitive. Invalid input is reported back to the operator and
//! changes no state.

use thiserror::Error;

/// Manual override bounds for `bpm=<value>`
pub const BPM_MIN: u16 = 30;
pub const BPM_MAX: u16 = 200;

pub const HELP_TEXT: &str = "\
commands:
  bpm=<30..200>  pin heart rate to a fixed value
  auto           return to motion-derived heart rate
  wifi on        enable the transport link
  wifi off       disable the transport link
  status         print the agent status
  help           this text";

/// One parsed operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetBpm(u16),
    Auto,
    WifiOn,
    WifiOff,
    Status,
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("bpm must be an integer between {BPM_MIN} and {BPM_MAX}, got '{0}'")]
    InvalidBpm(String),

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("empty command")]
    Empty,
}

/// Parse one operator line
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let normalized = line.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(CommandError::Empty);
    }

    if let Some(value) = normalized.strip_prefix("bpm=") {
        let value = value.trim();
        return match value.parse::<u16>() {
            Ok(bpm) if (BPM_MIN..=BPM_MAX).contains(&bpm) => Ok(Command::SetBpm(bpm)),
            _ => Err(CommandError::InvalidBpm(value.to_string())),
        };
    }

    let words: Vec<&str> = normalized.split_whitespace().collect();
    match words.as_slice() {
        ["auto"] => Ok(Command::Auto),
        ["wifi", "on"] => Ok(Command::WifiOn),
        ["wifi", "off"] => Ok(Command::WifiOff),
        ["status"] => Ok(Command::Status),
        ["help"] => Ok(Command::Help),
        _ => Err(CommandError::Unknown(line.trim().to_string())),
    }
}
