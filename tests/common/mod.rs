//! Fake classification service for integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

/// What the fake service saw
#[derive(Default)]
pub struct Recorded {
    hits: AtomicUsize,
    last: Mutex<Option<(Option<String>, Value)>>,
}

#[allow(dead_code)]
impl Recorded {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Authorization header and JSON body of the last request
    pub fn last_request(&self) -> Option<(Option<String>, Value)> {
        self.last.lock().unwrap().clone()
    }
}

/// Serve `reply` with `status` on POST /predict. Returns the endpoint URL.
pub async fn spawn_classifier(status: StatusCode, reply: &'static str) -> (String, Arc<Recorded>) {
    let recorded = Arc::new(Recorded::default());
    let seen = Arc::clone(&recorded);
    let app = Router::new().route(
        "/predict",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let seen = Arc::clone(&seen);
            async move {
                seen.hits.fetch_add(1, Ordering::SeqCst);
                let auth = headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                *seen.last.lock().unwrap() = Some((auth, body));
                (status, reply)
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/predict", addr), recorded)
}

/// HTTP client that ignores proxy settings from the environment
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
