//! Controller: per-tab activation and the only holder of network access
//!
//! Activation changes are pushed to the page; the page never polls. The
//! page-side code is injected at most once per page load, on the first ON.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use crate::core::messaging::{ControllerClient, PageLink, ScoreEnvelope, ScoreInbox};
use crate::core::requester::CredentialedRequester;
use crate::types::{
    ActivationMessage, ActivationState, InjectError, PageRequest, ScoringResult, TabId,
};

/// Puts the detector and renderer into a page
#[async_trait]
pub trait PageInjector: Send + Sync {
    async fn inject(&self, link: PageLink) -> Result<(), InjectError>;
}

#[derive(Debug, Default)]
struct TabRecord {
    activation: ActivationState,
    link: Option<mpsc::UnboundedSender<ActivationMessage>>,
}

impl TabRecord {
    fn injected(&self) -> bool {
        self.link.as_ref().is_some_and(|l| !l.is_closed())
    }
}

pub struct Controller {
    requester: CredentialedRequester,
    injector: Arc<dyn PageInjector>,
    client: ControllerClient,
    tabs: Mutex<HashMap<TabId, TabRecord>>,
    /// Held across injection so each toggle reads and writes the record atomically
    toggling: AsyncMutex<()>,
}

impl Controller {
    /// `client` is the page-facing end of the inbox this controller serves
    pub fn new(
        requester: CredentialedRequester,
        injector: Arc<dyn PageInjector>,
        client: ControllerClient,
    ) -> Self {
        Self {
            requester,
            injector,
            client,
            tabs: Mutex::new(HashMap::new()),
            toggling: AsyncMutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TabId, TabRecord>> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn activation(&self, tab: TabId) -> ActivationState {
        self.lock().get(&tab).map(|r| r.activation).unwrap_or_default()
    }

    /// Badge text for `tab`
    pub fn badge_text(&self, tab: TabId) -> &'static str {
        self.activation(tab).badge_text()
    }

    /// Flip activation for `tab`. On an injection failure the tab stays OFF.
    ///
    /// Overlapping toggles are applied one after the other.
    pub async fn toggle(&self, tab: TabId) -> Result<ActivationState, InjectError> {
        let _toggling = self.toggling.lock().await;
        let (next, needs_injection) = {
            let mut tabs = self.lock();
            let record = tabs.entry(tab).or_default();
            (record.activation.toggled(), !record.injected())
        };

        let mut fresh_link = None;
        if next.is_on() && needs_injection {
            let (tx, rx) = mpsc::unbounded_channel();
            let link = PageLink { tab, activation: rx, client: self.client.for_tab(tab) };
            if let Err(e) = self.injector.inject(link).await {
                warn!(tab, error = %e, "page injection failed");
                return Err(e);
            }
            debug!(tab, "page code injected");
            fresh_link = Some(tx);
        }

        let mut tabs = self.lock();
        let record = tabs.entry(tab).or_default();
        if let Some(link) = fresh_link {
            record.link = Some(link);
        }
        record.activation = next;
        let delivered = record
            .link
            .as_ref()
            .is_some_and(|l| l.send(ActivationMessage::from(next)).is_ok());
        if !delivered {
            record.link = None;
        }
        info!(tab, state = %next, badge = next.badge_text(), delivered, "activation toggled");
        Ok(next)
    }

    /// Page reload: all state for `tab` is dropped, page side shuts down
    pub fn page_reloaded(&self, tab: TabId) {
        if self.lock().remove(&tab).is_some() {
            info!(tab, "page reloaded, tab state reset");
        }
    }

    /// Token, then one classification call
    pub async fn handle_scoring_request(&self, body_text: &str) -> ScoringResult {
        self.requester.classify(body_text).await
    }

    /// Fulfil one envelope
    pub async fn handle(&self, envelope: ScoreEnvelope) {
        let tab = envelope.tab;
        let result = match &envelope.request {
            PageRequest::FetchScore { body_text } => self.handle_scoring_request(body_text).await,
        };
        if !envelope.respond(result.into()) {
            debug!(tab, "page went away before the score arrived");
        }
    }

    /// Serve the inbox until every client is gone. Requests run concurrently.
    pub async fn serve(self: Arc<Self>, mut inbox: ScoreInbox) {
        while let Some(envelope) = inbox.recv().await {
            let controller = Arc::clone(&self);
            tokio::spawn(async move {
                controller.handle(envelope).await;
            });
        }
        debug!("controller inbox closed");
    }
}
