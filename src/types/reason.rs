//! Reason codes for skipped extraction attempts
//!
//! None of these reach the user: a skip is the normal idle condition.

use serde::{Deserialize, Serialize};

/// Why an extraction attempt produced no event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum SkipReason {
    // =========================================================================
    // X001: Activation
    // =========================================================================
    /// Mutation arrived while detection is OFF
    X001_DETECTION_DISABLED,

    // =========================================================================
    // X002: Nothing open
    // =========================================================================
    /// Subject element missing or blank
    X002_NO_SUBJECT,
    /// Body element missing or blank
    X002_NO_BODY,

    // =========================================================================
    // X003: Dedup
    // =========================================================================
    /// Same identity as the last emitted email
    X003_DUPLICATE,
}

impl SkipReason {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::X001_DETECTION_DISABLED => "X001_DETECTION_DISABLED",
            Self::X002_NO_SUBJECT => "X002_NO_SUBJECT",
            Self::X002_NO_BODY => "X002_NO_BODY",
            Self::X003_DUPLICATE => "X003_DUPLICATE",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::X001_DETECTION_DISABLED => "Detection is off",
            Self::X002_NO_SUBJECT => "No email open (subject missing)",
            Self::X002_NO_BODY => "No email open (body missing)",
            Self::X003_DUPLICATE => "Email already shown",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
