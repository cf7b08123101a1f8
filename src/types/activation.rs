//! Activation state definitions

use serde::{Deserialize, Serialize};

/// Whether detection runs on a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationState {
    /// No watcher, no panel
    #[default]
    Off,
    /// Watching the page and scoring opened emails
    On,
}

impl ActivationState {
    /// The opposite state
    pub fn toggled(self) -> Self {
        match self {
            ActivationState::Off => ActivationState::On,
            ActivationState::On => ActivationState::Off,
        }
    }

    pub fn is_on(self) -> bool {
        self == ActivationState::On
    }

    /// Text shown on the toolbar badge
    pub fn badge_text(self) -> &'static str {
        match self {
            ActivationState::Off => "OFF",
            ActivationState::On => "ON",
        }
    }

    /// ANSI color code for terminal display
    pub fn color_code(self) -> &'static str {
        match self {
            ActivationState::Off => "\x1b[90m", // Gray
            ActivationState::On => "\x1b[32m",  // Green
        }
    }
}

impl std::fmt::Display for ActivationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.badge_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_off() {
        assert_eq!(ActivationState::default(), ActivationState::Off);
    }

    #[test]
    fn test_toggle_round_trip() {
        let state = ActivationState::Off.toggled();
        assert!(state.is_on());
        assert_eq!(state.toggled(), ActivationState::Off);
    }

    #[test]
    fn test_badge_text() {
        assert_eq!(ActivationState::On.badge_text(), "ON");
        assert_eq!(ActivationState::Off.to_string(), "OFF");
    }
}
