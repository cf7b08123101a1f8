//! Scripted page sessions: drive a real Controller against an in-memory page
//!
//! Script format (JSON):
//! ```json
//! { "tab": 1, "steps": [
//!     { "op": "toggle" },
//!     { "op": "open_email", "subject": "...", "sender_address": "...", "body": "..." },
//!     { "op": "noise", "count": 20 },
//!     { "op": "wait", "ms": 1500 }
//! ] }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::core::agent::InProcessInjector;
use crate::core::controller::Controller;
use crate::core::dom::{DomEdit, ElementContent, PageDocument};
use crate::types::{ConfigError, EmailSnapshot, InjectError, PanelUpdate, TabId};
use crate::{
    BODY_SELECTOR, SENDER_ADDRESS_ATTR, SENDER_SELECTOR, SUBJECT_SELECTOR, TIMESTAMP_ATTR,
    TIMESTAMP_SELECTOR,
};

/// Unrelated element churned by `noise` steps
pub const NOISE_SELECTOR: &str = "div.aeF";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayStep {
    /// User clicks the toolbar button
    Toggle,
    /// Webmail renders an email
    OpenEmail {
        subject: String,
        #[serde(default)]
        sender_name: String,
        #[serde(default)]
        sender_address: String,
        #[serde(default)]
        timestamp: String,
        body: String,
    },
    /// Back to the inbox list
    CloseEmail,
    /// Unrelated DOM churn
    Noise {
        #[serde(default = "default_noise")]
        count: u32,
    },
    Wait { ms: u64 },
    /// User clicks "Show full email"
    Expand,
    /// Browser reloads the tab
    Reload,
}

fn default_noise() -> u32 {
    1
}

fn default_tab() -> TabId {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayScript {
    #[serde(default = "default_tab")]
    pub tab: TabId,
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Edits that make the page display `email` in the fixed layout
pub fn email_view_edits(email: &EmailSnapshot) -> Vec<DomEdit> {
    vec![
        DomEdit::Set {
            selector: SUBJECT_SELECTOR.to_string(),
            content: ElementContent::text(&email.subject),
        },
        DomEdit::Set {
            selector: SENDER_SELECTOR.to_string(),
            content: ElementContent::text(&email.sender_name)
                .with_attr(SENDER_ADDRESS_ATTR, &email.sender_address),
        },
        DomEdit::Set {
            selector: TIMESTAMP_SELECTOR.to_string(),
            content: ElementContent::text(&email.timestamp).with_attr(TIMESTAMP_ATTR, &email.timestamp),
        },
        DomEdit::Set {
            selector: BODY_SELECTOR.to_string(),
            content: ElementContent::text(&email.body_text),
        },
    ]
}

/// Edits that return the page to the inbox list
pub fn inbox_view_edits() -> Vec<DomEdit> {
    [SUBJECT_SELECTOR, SENDER_SELECTOR, TIMESTAMP_SELECTOR, BODY_SELECTOR]
        .into_iter()
        .map(|s| DomEdit::Remove { selector: s.to_string() })
        .collect()
}

/// Plays a script against one tab
pub struct ReplayDriver {
    controller: Arc<Controller>,
    injector: Arc<InProcessInjector>,
    tab: TabId,
    doc: PageDocument,
}

impl ReplayDriver {
    /// Registers a fresh document for `tab`
    pub fn new(controller: Arc<Controller>, injector: Arc<InProcessInjector>, tab: TabId) -> Self {
        let doc = PageDocument::new();
        injector.register_document(tab, doc.clone());
        Self { controller, injector, tab, doc }
    }

    pub fn document(&self) -> &PageDocument {
        &self.doc
    }

    pub async fn run(&mut self, script: &ReplayScript) -> Result<(), InjectError> {
        for step in &script.steps {
            self.step(step).await?;
        }
        Ok(())
    }

    pub async fn step(&mut self, step: &ReplayStep) -> Result<(), InjectError> {
        debug!(tab = self.tab, ?step, "replay step");
        match step {
            ReplayStep::Toggle => {
                self.controller.toggle(self.tab).await?;
            }
            ReplayStep::OpenEmail { subject, sender_name, sender_address, timestamp, body } => {
                let email = EmailSnapshot::new(subject, sender_name, sender_address, timestamp, body);
                self.doc.apply(email_view_edits(&email));
            }
            ReplayStep::CloseEmail => self.doc.apply(inbox_view_edits()),
            ReplayStep::Noise { count } => {
                for _ in 0..*count {
                    self.doc.touch(NOISE_SELECTOR);
                }
            }
            ReplayStep::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
            ReplayStep::Expand => {
                let expanded = self
                    .injector
                    .renderer(self.tab)
                    .map(|r| r.expand_body())
                    .unwrap_or(false);
                debug!(tab = self.tab, expanded, "expand requested");
            }
            ReplayStep::Reload => {
                self.controller.page_reloaded(self.tab);
                self.doc = PageDocument::new();
                self.injector.register_document(self.tab, self.doc.clone());
                info!(tab = self.tab, "page reloaded");
            }
        }
        Ok(())
    }
}

/// Hand every update to `on_update` until none arrives for `quiet`.
/// Returns how many were delivered.
///
/// Used after the last script step, when a toggle-OFF or a scoring request
/// may still be producing panel transitions.
pub async fn drain_until_quiet(
    rx: &mut broadcast::Receiver<PanelUpdate>,
    quiet: Duration,
    mut on_update: impl FnMut(PanelUpdate),
) -> usize {
    let mut delivered = 0;
    loop {
        match timeout(quiet, rx.recv()).await {
            Ok(Ok(update)) => {
                on_update(update);
                delivered += 1;
            }
            Ok(Err(broadcast::error::RecvError::Lagged(n))) => {
                warn!(skipped = n, "panel updates dropped while draining");
            }
            Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => break,
        }
    }
    delivered
}
