//! Scoring Session: one email from panel open to score display

use chrono::{DateTime, Utc};
use tracing::info;

use crate::core::renderer::PanelRenderer;
use crate::types::{EmailIdentity, EmailSnapshot, PanelTicket, ScoringOutcome};

/// Summary of a finished session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub ticket: PanelTicket,
    pub outcome: ScoringOutcome,
    pub elapsed_ms: i64,
}

/// Ties a snapshot to the panel it opened and the request it drives
#[derive(Debug)]
pub struct ScoringSession {
    ticket: PanelTicket,
    identity: EmailIdentity,
    body_text: String,
    opened_at: DateTime<Utc>,
}

impl ScoringSession {
    /// Show `snapshot` (synchronous, no network) and open a session for it
    pub fn open(renderer: &PanelRenderer, snapshot: EmailSnapshot) -> Self {
        let identity = snapshot.identity();
        let body_text = snapshot.body_text.clone();
        let ticket = renderer.show(snapshot);
        Self {
            ticket,
            identity,
            body_text,
            opened_at: Utc::now(),
        }
    }

    pub fn ticket(&self) -> PanelTicket {
        self.ticket
    }

    /// Request the score and render it, unless the panel was superseded
    pub async fn run(self, renderer: &PanelRenderer) -> SessionReport {
        let outcome = renderer.run_scoring(self.ticket, &self.body_text).await;
        let elapsed_ms = (Utc::now() - self.opened_at).num_milliseconds();
        info!(
            email = %self.identity.fingerprint(),
            ticket = self.ticket.0,
            discarded = outcome.is_discarded(),
            elapsed_ms,
            "scoring session finished"
        );
        SessionReport {
            ticket: self.ticket,
            outcome,
            elapsed_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dom::PageDocument;
    use crate::core::messaging::score_channel;
    use crate::types::{PanelPhase, ScoreResponse};
    use tokio::sync::broadcast;

    #[tokio::test]
    async fn test_session_errored_on_failure() {
        let (client, mut inbox) = score_channel(4);
        let (tx, _) = broadcast::channel(8);
        let renderer = PanelRenderer::new(PageDocument::new(), client, 200, tx);

        let session = ScoringSession::open(
            &renderer,
            EmailSnapshot::new("Hi", "A", "a@example.com", "today", "body"),
        );
        assert_eq!(renderer.phase(), PanelPhase::MetadataShown);

        tokio::spawn(async move {
            let envelope = inbox.recv().await.unwrap();
            envelope.respond(ScoreResponse::Error { error: "HTTP 401 Unauthorized".into() });
        });
        let report = session.run(&renderer).await;
        assert_eq!(report.outcome, ScoringOutcome::Applied(PanelPhase::Errored));
        assert!(report.elapsed_ms >= 0);
    }
}
