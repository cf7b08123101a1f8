//! Panel Renderer: the single on-page panel and its scoring state machine
//!
//! Each `show` destroys the previous panel and hands out a fresh ticket.
//! Responses are applied only when their ticket is still the live one, so a
//! slow response for an earlier email can never touch a newer panel.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    BODY_ID, CLOSE_ID, ERROR_LABEL, LOADING_LABEL, PANEL_ID, SCORE_ID, SHOW_FULL_ID,
};
use crate::core::dom::{Element, PageDocument, UiNode};
use crate::core::messaging::ControllerClient;
use crate::core::sanitize::truncate_chars;
use crate::types::{
    percent_label, EmailSnapshot, PanelPhase, PanelTicket, PanelUpdate, RiskBand,
    ScoringOutcome, ScoringResult,
};

#[derive(Debug, Clone)]
struct LivePanel {
    ticket: PanelTicket,
    snapshot: EmailSnapshot,
    phase: PanelPhase,
    expanded: bool,
}

#[derive(Debug, Default)]
struct RendererState {
    next_generation: u64,
    live: Option<LivePanel>,
}

/// Owns the panel element of one page
pub struct PanelRenderer {
    doc: PageDocument,
    client: ControllerClient,
    preview_chars: usize,
    updates: broadcast::Sender<PanelUpdate>,
    state: Mutex<RendererState>,
}

impl PanelRenderer {
    pub fn new(
        doc: PageDocument,
        client: ControllerClient,
        preview_chars: usize,
        updates: broadcast::Sender<PanelUpdate>,
    ) -> Self {
        Self {
            doc,
            client,
            preview_chars,
            updates,
            state: Mutex::new(RendererState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RendererState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receive every panel transition
    pub fn subscribe(&self) -> broadcast::Receiver<PanelUpdate> {
        self.updates.subscribe()
    }

    /// Replace any panel with a new one showing `snapshot`'s metadata
    pub fn show(&self, snapshot: EmailSnapshot) -> PanelTicket {
        let mut state = self.lock();
        state.live = None;
        self.doc.remove_by_id(PANEL_ID);

        state.next_generation += 1;
        let panel = LivePanel {
            ticket: PanelTicket(state.next_generation),
            snapshot,
            phase: PanelPhase::MetadataShown,
            expanded: false,
        };
        self.doc.insert_overlay(self.build(&panel));
        self.publish(Some(&panel));
        let ticket = panel.ticket;
        state.live = Some(panel);
        debug!(ticket = ticket.0, "panel shown");
        ticket
    }

    /// Remove the panel. False if there was none.
    pub fn close(&self) -> bool {
        let mut state = self.lock();
        let had_panel = state.live.take().is_some();
        let removed = self.doc.remove_by_id(PANEL_ID) > 0;
        if had_panel || removed {
            self.publish(None);
            debug!("panel closed");
        }
        had_panel || removed
    }

    /// Reveal the untruncated body. False if there is nothing to reveal.
    pub fn expand_body(&self) -> bool {
        let mut state = self.lock();
        let preview_chars = self.preview_chars;
        let Some(panel) = state.live.as_mut() else {
            return false;
        };
        let (_, truncated) = truncate_chars(&panel.snapshot.body_text, preview_chars);
        if panel.expanded || !truncated {
            return false;
        }
        panel.expanded = true;
        let panel = panel.clone();
        self.rerender(&panel);
        true
    }

    /// Phase of the live panel (`Empty` when none)
    pub fn phase(&self) -> PanelPhase {
        self.lock().live.as_ref().map(|p| p.phase).unwrap_or(PanelPhase::Empty)
    }

    pub fn current_ticket(&self) -> Option<PanelTicket> {
        self.lock().live.as_ref().map(|p| p.ticket)
    }

    /// Enter Loading on the panel named by `ticket`
    fn begin_loading(&self, ticket: PanelTicket) -> bool {
        let mut state = self.lock();
        match state.live.as_mut() {
            Some(panel) if panel.ticket == ticket && panel.phase == PanelPhase::MetadataShown => {
                panel.phase = PanelPhase::Loading;
                let panel = panel.clone();
                self.rerender(&panel);
                true
            }
            _ => false,
        }
    }

    /// Loading → request → Resulted | Errored, for the panel named by `ticket`
    pub async fn run_scoring(&self, ticket: PanelTicket, body_text: &str) -> ScoringOutcome {
        if !self.begin_loading(ticket) {
            debug!(ticket = ticket.0, "panel gone before scoring started");
            return ScoringOutcome::Discarded;
        }
        let result = self.client.fetch_score(body_text).await;
        self.apply_result(ticket, &result)
    }

    /// Render `result` if `ticket` still names the live panel
    pub fn apply_result(&self, ticket: PanelTicket, result: &ScoringResult) -> ScoringOutcome {
        let mut state = self.lock();
        let Some(panel) = state.live.as_mut().filter(|p| p.ticket == ticket) else {
            debug!(ticket = ticket.0, "discarding stale scoring response");
            return ScoringOutcome::Discarded;
        };

        panel.phase = match result {
            ScoringResult::Success { probability } => {
                let band = RiskBand::from_probability(*probability);
                info!(ticket = ticket.0, probability = *probability, band = %band, "score rendered");
                PanelPhase::Resulted { probability: *probability, band }
            }
            ScoringResult::Failure { reason } => {
                warn!(ticket = ticket.0, reason = %reason, "scoring failed");
                PanelPhase::Errored
            }
        };
        let panel = panel.clone();
        self.rerender(&panel);
        ScoringOutcome::Applied(panel.phase)
    }

    fn rerender(&self, panel: &LivePanel) {
        if !self.doc.replace_by_id(PANEL_ID, self.build(panel)) {
            self.doc.insert_overlay(self.build(panel));
        }
        self.publish(Some(panel));
    }

    fn publish(&self, panel: Option<&LivePanel>) {
        let update = match panel {
            Some(p) => PanelUpdate::new(Some(p.ticket), p.phase, Some(p.snapshot.subject.clone()), p.expanded),
            None => PanelUpdate::new(None, PanelPhase::Empty, None, false),
        };
        // No subscribers is fine
        let _ = self.updates.send(update);
    }

    /// Build the panel tree. All email-derived text goes through `Element::text`.
    fn build(&self, panel: &LivePanel) -> UiNode {
        let snap = &panel.snapshot;

        let header = Element::new("div")
            .with_class("pd-header")
            .child(Element::new("span").with_class("pd-title").text("Phishing Analysis"))
            .child(Element::new("button").with_id(CLOSE_ID).text("\u{00d7}"));

        let meta = Element::new("div")
            .with_class("pd-meta")
            .child(meta_row("Subject", &snap.subject))
            .child(meta_row("From", &snap.sender_display()))
            .child(meta_row("Date", &snap.timestamp));

        let score = match panel.phase {
            PanelPhase::Empty | PanelPhase::MetadataShown => Element::new("div").with_id(SCORE_ID),
            PanelPhase::Loading => Element::new("div")
                .with_id(SCORE_ID)
                .child(Element::new("div").with_class("pd-spinner"))
                .text(LOADING_LABEL),
            PanelPhase::Resulted { probability, band } => Element::new("div")
                .with_id(SCORE_ID)
                .with_class("pd-score")
                .with_style(format!("color: {}", band.css_color()))
                .text(&percent_label(probability)),
            PanelPhase::Errored => Element::new("div")
                .with_id(SCORE_ID)
                .with_class("pd-error")
                .text(ERROR_LABEL),
        };

        let (preview, truncated) = truncate_chars(&snap.body_text, self.preview_chars);
        let body = if panel.expanded || !truncated {
            Element::new("div").with_id(BODY_ID).with_class("pd-body").text(&snap.body_text)
        } else {
            Element::new("div")
                .with_id(BODY_ID)
                .with_class("pd-body")
                .text(&format!("{}...", preview))
        };

        let mut root = Element::new("div")
            .with_id(PANEL_ID)
            .with_class("phishing-detector-panel")
            .child(header)
            .child(meta)
            .child(Element::new("div").with_class("pd-score-label").text("Phishing risk"))
            .child(score)
            .child(body);
        if truncated && !panel.expanded {
            root = root.child(Element::new("button").with_id(SHOW_FULL_ID).text("Show full email"));
        }
        root.into()
    }
}

fn meta_row(label: &str, value: &str) -> Element {
    Element::new("div")
        .with_class("pd-row")
        .child(Element::new("strong").text(&format!("{}: ", label)))
        .child(Element::new("span").text(value))
}
