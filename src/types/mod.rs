//! Core types for PhishGuard

mod activation;
mod email;
mod error;
mod message;
mod output;
mod panel;
mod reason;
mod scoring;

pub use activation::ActivationState;
pub use email::{EmailIdentity, EmailSnapshot};
pub use error::{ConfigError, InjectError, ScoringError};
pub use message::{ActivationMessage, PageRequest, ScoreResponse};
pub use output::PanelUpdate;
pub use panel::{PanelPhase, PanelTicket, ScoringOutcome};
pub use reason::SkipReason;
pub use scoring::{normalize_probability, percent_label, RiskBand, ScoringRequest, ScoringResult};

/// Browser tab identifier
pub type TabId = u32;
