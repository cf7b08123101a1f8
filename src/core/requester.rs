//! Credentialed Requester: token acquisition + one classification POST
//!
//! Nothing is retried and nothing is cached. Any failure comes back as
//! `ScoringResult::Failure` carrying a readable reason.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{normalize_probability, ScoringError, ScoringResult};

/// Bearer token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Identity provider seam
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a bearer token. `interactive` allows prompting the user for consent.
    async fn fetch_token(&self, interactive: bool) -> Result<Credential, ScoringError>;
}

/// Fixed token or fixed failure; counts calls
#[derive(Debug)]
pub struct StaticTokenProvider {
    outcome: Result<String, String>,
    calls: AtomicUsize,
}

impl StaticTokenProvider {
    pub fn granting(token: impl Into<String>) -> Self {
        Self { outcome: Ok(token.into()), calls: AtomicUsize::new(0) }
    }

    pub fn denying(reason: impl Into<String>) -> Self {
        Self { outcome: Err(reason.into()), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn fetch_token(&self, _interactive: bool) -> Result<Credential, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(token) => Ok(Credential::new(token.clone())),
            Err(reason) => Err(ScoringError::Credential(reason.clone())),
        }
    }
}

/// Reads the token from an environment variable on every call
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn fetch_token(&self, interactive: bool) -> Result<Credential, ScoringError> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(Credential::new(token.trim())),
            _ if interactive => Err(ScoringError::Credential(format!(
                "user consent required: set {} to a bearer token",
                self.var
            ))),
            _ => Err(ScoringError::Credential(format!("{} is not set", self.var))),
        }
    }
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    name: &'a str,
    body: &'a str,
}

/// Composes credential acquisition and the classification call
pub struct CredentialedRequester {
    http: Client,
    endpoint: String,
    request_name: String,
    interactive: bool,
    tokens: Arc<dyn TokenProvider>,
}

impl CredentialedRequester {
    pub fn new(
        endpoint: impl Into<String>,
        request_name: impl Into<String>,
        interactive: bool,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            request_name: request_name.into(),
            interactive,
            tokens,
        }
    }

    /// Use a preconfigured HTTP client (proxies, timeouts)
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Classify `body_text`
    pub async fn classify(&self, body_text: &str) -> ScoringResult {
        match self.try_classify(body_text).await {
            Ok(probability) => ScoringResult::success(probability),
            Err(e) => {
                warn!(error = %e, endpoint = %self.endpoint, "classification failed");
                ScoringResult::failure(e.to_string())
            }
        }
    }

    async fn try_classify(&self, body_text: &str) -> Result<f64, ScoringError> {
        // No token, no request
        let credential = self.tokens.fetch_token(self.interactive).await?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(credential.secret())
            .json(&ClassifyRequest { name: &self.request_name, body: body_text })
            .send()
            .await
            .map_err(|e| ScoringError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoringError::Network(format!("HTTP {}", status)));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| ScoringError::Network(e.to_string()))?;
        let probability = extract_probability(&raw);
        debug!(probability, bytes = raw.len(), "classifier responded");
        Ok(probability)
    }
}

/// Probability at `[0][0]` of the response body; 0 when the shape is wrong.
pub fn extract_probability(raw: &str) -> f64 {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| v.get(0)?.get(0)?.as_f64())
        .map(normalize_probability)
        .unwrap_or(0.0)
}
