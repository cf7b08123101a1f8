//! PhishGuard: live phishing risk scoring for a webmail page
//!
//! Pipeline: page mutations → ChangeDetector (debounce + dedup) →
//! PanelRenderer → ControllerClient → Controller → CredentialedRequester

pub mod config;
pub mod core;
pub mod telemetry;
pub mod types;

// =============================================================================
// CHANGE DETECTION
// =============================================================================

/// Quiet period after the last mutation before extraction is attempted (milliseconds)
pub const DEBOUNCE_MS: u64 = 500;

/// Subject line of the open email
pub const SUBJECT_SELECTOR: &str = "h2.hP";

/// Sender element: display name as text, address in the `email` attribute
pub const SENDER_SELECTOR: &str = "span.gD";
pub const SENDER_ADDRESS_ATTR: &str = "email";

/// Timestamp element: full date in the `title` attribute
pub const TIMESTAMP_SELECTOR: &str = "span.g3";
pub const TIMESTAMP_ATTR: &str = "title";

/// Message body container
pub const BODY_SELECTOR: &str = "div.a3s";

// =============================================================================
// PANEL
// =============================================================================

/// Fixed id of the single on-page panel
pub const PANEL_ID: &str = "phishing-detector-panel";
pub const SCORE_ID: &str = "phishing-detector-score";
pub const BODY_ID: &str = "phishing-detector-body";
pub const SHOW_FULL_ID: &str = "phishing-detector-show-full";
pub const CLOSE_ID: &str = "phishing-detector-close";

/// Body preview length in characters
pub const PREVIEW_CHARS: usize = 200;

/// Probability above which the score is high risk
pub const RISK_THRESHOLD_HIGH: f64 = 0.85;

/// Probability above which the score is medium risk
pub const RISK_THRESHOLD_MEDIUM: f64 = 0.5;

pub const LOADING_LABEL: &str = "Analyzing...";
pub const ERROR_LABEL: &str = "Error fetching score";

// =============================================================================
// CLASSIFIER
// =============================================================================

/// Default classification endpoint
pub const DEFAULT_CLASSIFIER_ENDPOINT: &str = "https://phishguard-classifier.example.com/predict";

/// Value of the `name` field in classification requests
pub const DEFAULT_REQUEST_NAME: &str = "email_body";

/// Environment variable holding the bearer token for the CLI
pub const TOKEN_ENV_VAR: &str = "PHISHGUARD_TOKEN";

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
