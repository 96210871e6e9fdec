//! Presence state definitions

use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};

/// The four states of the presence machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceState {
    /// Nothing detected, presence off
    Idle,
    /// Signal above k_on, waiting out the on-debounce (presence still off)
    DebouncingOn,
    /// Confirmed presence
    Present,
    /// Signal below k_off, waiting out the off-debounce (presence still on)
    DebouncingOff,
}

impl PresenceState {
    /// Presence boolean published for this state
    pub fn presence(&self) -> bool {
        matches!(self, PresenceState::Present | PresenceState::DebouncingOff)
    }

    /// Is a debounce timer running?
    pub fn is_debouncing(&self) -> bool {
        matches!(self, PresenceState::DebouncingOn | PresenceState::DebouncingOff)
    }

    /// Short symbol for terminal display
    pub fn symbol(&self) -> &'static str {
        match self {
            PresenceState::Idle => "○",
            PresenceState::DebouncingOn => "◔",
            PresenceState::Present => "●",
            PresenceState::DebouncingOff => "◕",
        }
    }

    /// Colorize text in this state's color
    pub fn paint(&self, text: &str) -> ColoredString {
        match self {
            PresenceState::Idle => text.bright_black(),
            PresenceState::DebouncingOn => text.yellow(),
            PresenceState::Present => text.green(),
            PresenceState::DebouncingOff => text.magenta(),
        }
    }
}

impl std::fmt::Display for PresenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PresenceState::Idle => "IDLE",
            PresenceState::DebouncingOn => "DEBOUNCING_ON",
            PresenceState::Present => "PRESENT",
            PresenceState::DebouncingOff => "DEBOUNCING_OFF",
        };
        write!(f, "{}", name)
    }
}
