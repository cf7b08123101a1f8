//! Messages exchanged between the page side and the Controller

use serde::{Deserialize, Serialize};
use crate::types::{ActivationState, ScoringResult};

/// Controller → page: start or stop detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ActivationMessage {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl From<ActivationState> for ActivationMessage {
    fn from(state: ActivationState) -> Self {
        match state {
            ActivationState::On => ActivationMessage::On,
            ActivationState::Off => ActivationMessage::Off,
        }
    }
}

impl From<ActivationMessage> for ActivationState {
    fn from(msg: ActivationMessage) -> Self {
        match msg {
            ActivationMessage::On => ActivationState::On,
            ActivationMessage::Off => ActivationState::Off,
        }
    }
}

/// Page → Controller request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum PageRequest {
    #[serde(rename = "FETCH_SCORE")]
    FetchScore {
        #[serde(rename = "bodyText")]
        body_text: String,
    },
}

/// Controller → page response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreResponse {
    Probability { probability: f64 },
    Error { error: String },
}

impl From<ScoringResult> for ScoreResponse {
    fn from(result: ScoringResult) -> Self {
        match result {
            ScoringResult::Success { probability } => ScoreResponse::Probability { probability },
            ScoringResult::Failure { reason } => ScoreResponse::Error { error: reason },
        }
    }
}

impl From<ScoreResponse> for ScoringResult {
    fn from(response: ScoreResponse) -> Self {
        match response {
            ScoreResponse::Probability { probability } => ScoringResult::success(probability),
            ScoreResponse::Error { error } => ScoringResult::Failure { reason: error },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_activation_wire_form() {
        assert_eq!(serde_json::to_value(ActivationMessage::On).unwrap(), json!({"action": "ON"}));
        let off: ActivationMessage = serde_json::from_value(json!({"action": "OFF"})).unwrap();
        assert_eq!(off, ActivationMessage::Off);
    }

    #[test]
    fn test_fetch_score_wire_form() {
        let req = PageRequest::FetchScore { body_text: "hello".to_string() };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"action": "FETCH_SCORE", "bodyText": "hello"})
        );
    }

    #[test]
    fn test_response_shapes() {
        let ok: ScoreResponse = serde_json::from_str(r#"{"probability": 0.7}"#).unwrap();
        assert_eq!(ok, ScoreResponse::Probability { probability: 0.7 });
        let err: ScoreResponse = serde_json::from_str(r#"{"error": "HTTP 500"}"#).unwrap();
        assert_eq!(ScoringResult::from(err), ScoringResult::failure("HTTP 500"));
    }
}
