//! Page ↔ Controller request/response
//!
//! Each request carries its own oneshot reply slot, so exactly one response
//! can be delivered per request. The caller waits with no timeout.

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::types::{
    ActivationMessage, PageRequest, ScoreResponse, ScoringError, ScoringResult, TabId,
};

/// One request in flight to the Controller
#[derive(Debug)]
pub struct ScoreEnvelope {
    pub tab: TabId,
    pub request: PageRequest,
    reply: oneshot::Sender<ScoreResponse>,
}

impl ScoreEnvelope {
    /// Deliver the response. False if the requester is gone.
    pub fn respond(self, response: ScoreResponse) -> bool {
        self.reply.send(response).is_ok()
    }
}

/// Controller side of the request channel
#[derive(Debug)]
pub struct ScoreInbox {
    rx: mpsc::Receiver<ScoreEnvelope>,
}

impl ScoreInbox {
    pub async fn recv(&mut self) -> Option<ScoreEnvelope> {
        self.rx.recv().await
    }
}

/// Page side handle for asking the Controller for scores
#[derive(Debug, Clone)]
pub struct ControllerClient {
    tx: mpsc::Sender<ScoreEnvelope>,
    tab: TabId,
}

impl ControllerClient {
    /// Same channel, requests attributed to `tab`
    pub fn for_tab(&self, tab: TabId) -> Self {
        Self { tx: self.tx.clone(), tab }
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// Ask for a score and wait for the single response
    pub async fn fetch_score(&self, body_text: &str) -> ScoringResult {
        let (reply, reply_rx) = oneshot::channel();
        let envelope = ScoreEnvelope {
            tab: self.tab,
            request: PageRequest::FetchScore { body_text: body_text.to_string() },
            reply,
        };

        if self.tx.send(envelope).await.is_err() {
            warn!(tab = self.tab, "controller channel closed");
            return ScoringResult::failure(ScoringError::ControllerUnavailable.to_string());
        }

        match reply_rx.await {
            Ok(response) => response.into(),
            Err(_) => {
                warn!(tab = self.tab, "controller dropped request without responding");
                ScoringResult::failure(ScoringError::ControllerUnavailable.to_string())
            }
        }
    }
}

/// Request channel shared by every page
pub fn score_channel(buffer: usize) -> (ControllerClient, ScoreInbox) {
    let (tx, rx) = mpsc::channel(buffer);
    (ControllerClient { tx, tab: 0 }, ScoreInbox { rx })
}

/// What an injected page receives from the Controller
#[derive(Debug)]
pub struct PageLink {
    pub tab: TabId,
    pub activation: mpsc::UnboundedReceiver<ActivationMessage>,
    pub client: ControllerClient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let (client, mut inbox) = score_channel(4);
        let client = client.for_tab(7);
        let responder = tokio::spawn(async move {
            let envelope = inbox.recv().await.unwrap();
            assert_eq!(envelope.tab, 7);
            assert_eq!(envelope.request, PageRequest::FetchScore { body_text: "body".into() });
            envelope.respond(ScoreResponse::Probability { probability: 0.25 })
        });
        let result = client.fetch_score("body").await;
        assert_eq!(result, ScoringResult::success(0.25));
        assert!(responder.await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_reply_is_failure() {
        let (client, mut inbox) = score_channel(4);
        tokio::spawn(async move {
            let envelope = inbox.recv().await.unwrap();
            drop(envelope);
        });
        let result = client.fetch_score("body").await;
        assert_eq!(result, ScoringResult::failure("controller unavailable"));
    }

    #[tokio::test]
    async fn test_closed_inbox_is_failure() {
        let (client, inbox) = score_channel(4);
        drop(inbox);
        assert!(!client.fetch_score("body").await.is_success());
    }
}
