//! Core modules for PhishGuard

pub mod agent;
pub mod controller;
pub mod detector;
pub mod dom;
pub mod extractor;
pub mod messaging;
pub mod renderer;
pub mod replay;
pub mod requester;
pub mod sanitize;
pub mod session;

pub use agent::{InProcessInjector, PageAgent};
pub use controller::{Controller, PageInjector};
pub use detector::{ChangeDetector, DetectorStats};
pub use dom::{DomEdit, Element, ElementContent, MutationBatch, PageDocument, SafeText, UiNode};
pub use extractor::EmailExtractor;
pub use messaging::{score_channel, ControllerClient, PageLink, ScoreEnvelope, ScoreInbox};
pub use renderer::PanelRenderer;
pub use replay::{
    drain_until_quiet, email_view_edits, inbox_view_edits, ReplayDriver, ReplayScript, ReplayStep,
};
pub use requester::{
    extract_probability, Credential, CredentialedRequester, EnvTokenProvider, StaticTokenProvider,
    TokenProvider,
};
pub use sanitize::escape_text;
pub use session::{ScoringSession, SessionReport};
