//! Error types

use thiserror::Error;

/// Failures on the scoring path. Each surfaces as a fixed panel label;
/// the message is only logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("credential acquisition failed: {0}")]
    Credential(String),
    #[error("classification request failed: {0}")]
    Network(String),
    #[error("controller unavailable")]
    ControllerUnavailable,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {field}: {detail}")]
    Invalid { field: &'static str, detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    #[error("no document registered for tab {0}")]
    UnknownTab(u32),
    #[error("injection refused: {0}")]
    Refused(String),
}
