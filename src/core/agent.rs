//! Page-embedded side: activation mirror, detector, renderer, sessions

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::core::controller::PageInjector;
use crate::core::detector::{ChangeDetector, DetectorStats};
use crate::core::dom::PageDocument;
use crate::core::messaging::{ControllerClient, PageLink};
use crate::core::renderer::PanelRenderer;
use crate::core::session::ScoringSession;
use crate::types::{ActivationMessage, ActivationState, EmailSnapshot, InjectError, PanelUpdate, TabId};

/// Event loop of one injected page
pub struct PageAgent {
    tab: TabId,
    detector: ChangeDetector,
    renderer: Arc<PanelRenderer>,
    mirror: watch::Sender<ActivationState>,
    events: mpsc::UnboundedReceiver<EmailSnapshot>,
}

impl PageAgent {
    pub fn new(
        tab: TabId,
        doc: PageDocument,
        client: ControllerClient,
        config: &PipelineConfig,
        updates: broadcast::Sender<PanelUpdate>,
    ) -> Self {
        let (mirror, mirror_rx) = watch::channel(ActivationState::Off);
        let (events_tx, events) = mpsc::unbounded_channel();
        let detector = ChangeDetector::new(doc.clone(), mirror_rx, events_tx, config.debounce());
        let renderer = Arc::new(PanelRenderer::new(doc, client, config.preview_chars, updates));
        Self { tab, detector, renderer, mirror, events }
    }

    pub fn renderer(&self) -> Arc<PanelRenderer> {
        Arc::clone(&self.renderer)
    }

    pub fn detector_stats(&self) -> DetectorStats {
        self.detector.stats()
    }

    /// Run until the Controller drops the activation link
    pub async fn run(mut self, mut activation: mpsc::UnboundedReceiver<ActivationMessage>) {
        loop {
            tokio::select! {
                msg = activation.recv() => match msg {
                    Some(msg) => self.on_activation(msg.into()),
                    None => break,
                },
                Some(snapshot) = self.events.recv() => self.on_snapshot(snapshot),
            }
        }
        self.detector.stop();
        self.renderer.close();
        debug!(tab = self.tab, "page agent stopped");
    }

    fn on_activation(&mut self, state: ActivationState) {
        self.mirror.send_replace(state);
        match state {
            ActivationState::On => self.detector.start(),
            ActivationState::Off => {
                self.detector.stop();
                self.renderer.close();
            }
        }
        info!(tab = self.tab, state = %state, "page activation changed");
    }

    fn on_snapshot(&mut self, snapshot: EmailSnapshot) {
        if !self.mirror.borrow().is_on() {
            debug!(tab = self.tab, "snapshot dropped, detection off");
            return;
        }
        let session = ScoringSession::open(&self.renderer, snapshot);
        let renderer = Arc::clone(&self.renderer);
        tokio::spawn(async move {
            session.run(&renderer).await;
        });
    }
}

/// Injects `PageAgent`s into registered in-memory documents
pub struct InProcessInjector {
    config: PipelineConfig,
    documents: Mutex<HashMap<TabId, PageDocument>>,
    renderers: Mutex<HashMap<TabId, Arc<PanelRenderer>>>,
    updates: broadcast::Sender<PanelUpdate>,
}

impl InProcessInjector {
    pub fn new(config: PipelineConfig) -> Self {
        let (updates, _) = broadcast::channel(256);
        Self {
            config,
            documents: Mutex::new(HashMap::new()),
            renderers: Mutex::new(HashMap::new()),
            updates,
        }
    }

    fn documents(&self) -> MutexGuard<'_, HashMap<TabId, PageDocument>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn renderers(&self) -> MutexGuard<'_, HashMap<TabId, Arc<PanelRenderer>>> {
        self.renderers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `doc` the page loaded in `tab`
    pub fn register_document(&self, tab: TabId, doc: PageDocument) {
        self.documents().insert(tab, doc);
        self.renderers().remove(&tab);
    }

    /// Panel updates from every injected page
    pub fn subscribe(&self) -> broadcast::Receiver<PanelUpdate> {
        self.updates.subscribe()
    }

    /// Renderer of the page currently injected in `tab`
    pub fn renderer(&self, tab: TabId) -> Option<Arc<PanelRenderer>> {
        self.renderers().get(&tab).cloned()
    }
}

#[async_trait]
impl PageInjector for InProcessInjector {
    async fn inject(&self, link: PageLink) -> Result<(), InjectError> {
        let doc = self
            .documents()
            .get(&link.tab)
            .cloned()
            .ok_or(InjectError::UnknownTab(link.tab))?;
        let agent = PageAgent::new(link.tab, doc, link.client, &self.config, self.updates.clone());
        self.renderers().insert(link.tab, agent.renderer());
        tokio::spawn(agent.run(link.activation));
        Ok(())
    }
}
