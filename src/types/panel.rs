//! Panel state machine definitions
//!
//! Empty → MetadataShown → Loading → Resulted | Errored
//! A new snapshot always restarts from Empty.

use serde::{Deserialize, Serialize};
use crate::types::RiskBand;

/// Phase of the live panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PanelPhase {
    /// No panel in the document
    Empty,
    /// Metadata rendered, no request issued yet
    MetadataShown,
    /// Request in flight
    Loading,
    /// Score rendered (terminal)
    Resulted { probability: f64, band: RiskBand },
    /// Error label rendered (terminal)
    Errored,
}

impl PanelPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PanelPhase::Resulted { .. } | PanelPhase::Errored)
    }

    /// ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            PanelPhase::Empty => "\x1b[90m",
            PanelPhase::MetadataShown | PanelPhase::Loading => "\x1b[36m",
            PanelPhase::Resulted { band, .. } => band.color_code(),
            PanelPhase::Errored => "\x1b[35m",
        }
    }

    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }
}

impl std::fmt::Display for PanelPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PanelPhase::Empty => "EMPTY",
            PanelPhase::MetadataShown => "METADATA",
            PanelPhase::Loading => "LOADING",
            PanelPhase::Resulted { .. } => "RESULTED",
            PanelPhase::Errored => "ERRORED",
        };
        write!(f, "{}", name)
    }
}

/// Identifies one panel instance. Only the holder of the live ticket may
/// update the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PanelTicket(pub u64);

/// What happened to a scoring response
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringOutcome {
    /// Response rendered on the panel that asked for it
    Applied(PanelPhase),
    /// Panel was replaced or closed before the response arrived
    Discarded,
}

impl ScoringOutcome {
    pub fn is_discarded(&self) -> bool {
        matches!(self, ScoringOutcome::Discarded)
    }
}
