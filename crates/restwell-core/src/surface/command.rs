//! Single-slot command mailbox shared with out-of-process surfaces.
//!
//! Widgets and notification actions write one token; the session loop
//! polls, clears the slot first, then dispatches. A token that arrives
//! while another is pending overwrites it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ValidationError};
use crate::storage::PreferenceStore;

pub const COMMAND_KEY: &str = "session_command";

/// Notification action ids and the command each one stands for.
pub const ACTION_PAUSE: &str = "PAUSE_TIMER";
pub const ACTION_RESET: &str = "RESET_TIMER";
pub const ACTION_SET_COMPLETE: &str = "SET_COMPLETE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Toggle the timer.
    Pause,
    /// Reset the timer to its configured duration.
    Reset,
    /// Complete the current set.
    Next,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Pause => "pause",
            Command::Reset => "reset",
            Command::Next => "next",
        }
    }

    pub fn from_action(action_id: &str) -> Option<Self> {
        match action_id {
            ACTION_PAUSE => Some(Command::Pause),
            ACTION_RESET => Some(Command::Reset),
            ACTION_SET_COMPLETE => Some(Command::Next),
            _ => None,
        }
    }

    pub fn action_id(self) -> &'static str {
        match self {
            Command::Pause => ACTION_PAUSE,
            Command::Reset => ACTION_RESET,
            Command::Next => ACTION_SET_COMPLETE,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "pause" => Ok(Command::Pause),
            "reset" => Ok(Command::Reset),
            "next" => Ok(Command::Next),
            other => Err(ValidationError::InvalidValue {
                field: "command".into(),
                message: format!("unknown command token '{other}'"),
            }),
        }
    }
}

/// Leave a command for the session loop.
pub fn post(prefs: &dyn PreferenceStore, command: Command) -> Result<()> {
    prefs.set(COMMAND_KEY, command.as_str())
}

/// Read-then-clear. The slot is emptied before the token is interpreted,
/// so an unreadable token is dropped rather than retried forever.
pub fn take(prefs: &dyn PreferenceStore) -> Option<Command> {
    let raw = match prefs.get(COMMAND_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "could not read command mailbox");
            return None;
        }
    };
    if let Err(e) = prefs.remove(COMMAND_KEY) {
        warn!(error = %e, "could not clear command mailbox");
    }
    match raw.parse() {
        Ok(command) => Some(command),
        Err(e) => {
            warn!(error = %e, "dropping unknown command");
            None
        }
    }
}

pub fn clear(prefs: &dyn PreferenceStore) -> Result<()> {
    prefs.remove(COMMAND_KEY)
}
