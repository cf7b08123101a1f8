//! Integration tests for the Controller's scoring path
//!
//! Real HTTP against a local fake classifier.

mod common;

use std::sync::Arc;
use async_trait::async_trait;
use axum::http::StatusCode;
use phishguard::core::{
    score_channel, Controller, CredentialedRequester, PageInjector, PageLink, StaticTokenProvider,
};
use phishguard::types::{InjectError, ScoringResult};
use phishguard::DEFAULT_REQUEST_NAME;
use pretty_assertions::assert_eq;
use serde_json::json;

struct NoopInjector;

#[async_trait]
impl PageInjector for NoopInjector {
    async fn inject(&self, _link: PageLink) -> Result<(), InjectError> {
        Ok(())
    }
}

fn requester(endpoint: &str, tokens: Arc<StaticTokenProvider>) -> CredentialedRequester {
    CredentialedRequester::new(endpoint, DEFAULT_REQUEST_NAME, false, tokens)
        .with_http_client(common::local_client())
}

#[tokio::test]
async fn test_success_sends_bearer_and_body() {
    let (endpoint, recorded) = common::spawn_classifier(StatusCode::OK, "[[0.9, 0.1]]").await;
    let tokens = Arc::new(StaticTokenProvider::granting("tok-123"));
    let requester = requester(&endpoint, tokens.clone());

    let result = requester.classify("Please verify your account").await;

    assert_eq!(result, ScoringResult::Success { probability: 0.9 });
    assert_eq!(recorded.hits(), 1);
    assert_eq!(tokens.calls(), 1);
    let (auth, body) = recorded.last_request().unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer tok-123"));
    assert_eq!(body, json!({"name": "email_body", "body": "Please verify your account"}));
}

#[tokio::test]
async fn test_credential_failure_sends_nothing() {
    let (endpoint, recorded) = common::spawn_classifier(StatusCode::OK, "[[0.9]]").await;
    let requester = requester(&endpoint, Arc::new(StaticTokenProvider::denying("user declined")));

    let result = requester.classify("body").await;

    assert!(!result.is_success());
    assert!(matches!(&result, ScoringResult::Failure { reason } if reason.contains("user declined")));
    assert_eq!(recorded.hits(), 0);
}

#[tokio::test]
async fn test_malformed_response_scores_zero() {
    let (endpoint, recorded) =
        common::spawn_classifier(StatusCode::OK, "{\"label\": \"phishing\"}").await;
    let requester = requester(&endpoint, Arc::new(StaticTokenProvider::granting("t")));

    let result = requester.classify("body").await;

    assert_eq!(result, ScoringResult::Success { probability: 0.0 });
    assert_eq!(recorded.hits(), 1);
}

#[tokio::test]
async fn test_out_of_range_probability_is_clamped() {
    let (endpoint, _recorded) = common::spawn_classifier(StatusCode::OK, "[[1.7]]").await;
    let requester = requester(&endpoint, Arc::new(StaticTokenProvider::granting("t")));
    assert_eq!(requester.classify("body").await.probability(), Some(1.0));
}

#[tokio::test]
async fn test_server_error_is_failure_without_retry() {
    let (endpoint, recorded) =
        common::spawn_classifier(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;
    let requester = requester(&endpoint, Arc::new(StaticTokenProvider::granting("t")));

    let result = requester.classify("body").await;

    match result {
        ScoringResult::Failure { reason } => assert!(reason.contains("HTTP 500"), "{}", reason),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(recorded.hits(), 1);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_failure() {
    let requester = requester("http://127.0.0.1:9/predict", Arc::new(StaticTokenProvider::granting("t")));
    assert!(!requester.classify("body").await.is_success());
}

/// Page request → served inbox → HTTP → response back to the page
#[tokio::test]
async fn test_served_inbox_answers_page_requests() {
    let (endpoint, recorded) = common::spawn_classifier(StatusCode::OK, "[[0.42]]").await;
    let (client, inbox) = score_channel(8);
    let controller = Arc::new(Controller::new(
        requester(&endpoint, Arc::new(StaticTokenProvider::granting("t"))),
        Arc::new(NoopInjector),
        client.clone(),
    ));
    tokio::spawn(Arc::clone(&controller).serve(inbox));

    let page = client.for_tab(5);
    let (first, second) = tokio::join!(page.fetch_score("one"), page.fetch_score("two"));

    assert_eq!(first, ScoringResult::Success { probability: 0.42 });
    assert_eq!(second, ScoringResult::Success { probability: 0.42 });
    assert_eq!(recorded.hits(), 2);
}
