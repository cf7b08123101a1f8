//! End-to-end: toggle → page mutations → debounce → panel → HTTP → score
//!
//! Runs the replay driver against a real Controller, in-process page agents
//! and a local fake classifier.

mod common;

use std::sync::Arc;
use std::time::Duration;
use axum::http::StatusCode;
use phishguard::config::PipelineConfig;
use phishguard::core::{
    score_channel, Controller, CredentialedRequester, InProcessInjector, ReplayDriver,
    ReplayScript, ReplayStep, StaticTokenProvider,
};
use phishguard::types::{ActivationState, PanelPhase, RiskBand};
use phishguard::{DEFAULT_REQUEST_NAME, PANEL_ID, SHOW_FULL_ID};
use pretty_assertions::assert_eq;
use tokio::time::{sleep, timeout};

struct Pipeline {
    controller: Arc<Controller>,
    injector: Arc<InProcessInjector>,
    recorded: Arc<common::Recorded>,
}

async fn pipeline(reply: &'static str) -> Pipeline {
    let (endpoint, recorded) = common::spawn_classifier(StatusCode::OK, reply).await;
    let config = PipelineConfig {
        classifier_endpoint: endpoint.clone(),
        debounce_ms: 50,
        preview_chars: 20,
        ..PipelineConfig::default()
    };
    let requester = CredentialedRequester::new(
        endpoint,
        DEFAULT_REQUEST_NAME,
        false,
        Arc::new(StaticTokenProvider::granting("tok")),
    )
    .with_http_client(common::local_client());

    let injector = Arc::new(InProcessInjector::new(config));
    let (client, inbox) = score_channel(8);
    let controller = Arc::new(Controller::new(requester, injector.clone(), client));
    tokio::spawn(Arc::clone(&controller).serve(inbox));
    Pipeline { controller, injector, recorded }
}

/// Poll `cond` until it holds; fail after a generous bound
async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    let polled = timeout(Duration::from_secs(10), async {
        while !cond() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {}", what);
}

/// Quiet period for checks that something did NOT happen
async fn settle() {
    sleep(Duration::from_millis(300)).await;
}

fn open_email(subject: &str, body: &str) -> ReplayStep {
    ReplayStep::OpenEmail {
        subject: subject.to_string(),
        sender_name: "Bank".to_string(),
        sender_address: "bank@example.com".to_string(),
        timestamp: "Mon".to_string(),
        body: body.to_string(),
    }
}

/// Toggle ON and wait until the page side is watching
async fn activate(driver: &mut ReplayDriver) {
    driver.step(&ReplayStep::Toggle).await.unwrap();
    eventually("detector to attach", || driver.document().watcher_count() == 1).await;
}

fn resulted(p: &Pipeline, tab: u32) -> bool {
    p.injector
        .renderer(tab)
        .is_some_and(|r| matches!(r.phase(), PanelPhase::Resulted { .. }))
}

#[tokio::test]
async fn test_open_email_gets_scored() {
    let p = pipeline("[[0.93]]").await;
    let mut driver = ReplayDriver::new(Arc::clone(&p.controller), Arc::clone(&p.injector), 1);

    activate(&mut driver).await;
    driver
        .step(&open_email("Urgent: verify", "Your account is locked, click here to restore access"))
        .await
        .unwrap();
    driver.step(&ReplayStep::Noise { count: 5 }).await.unwrap();
    eventually("score to render", || resulted(&p, 1)).await;

    let renderer = p.injector.renderer(1).unwrap();
    assert_eq!(
        renderer.phase(),
        PanelPhase::Resulted { probability: 0.93, band: RiskBand::High }
    );
    assert_eq!(driver.document().count_by_id(PANEL_ID), 1);
    assert_eq!(p.recorded.hits(), 1);
    assert_eq!(p.controller.badge_text(1), "ON");

    // Truncated preview, then expanded
    let panel = driver.document().get_by_id(PANEL_ID).unwrap();
    assert!(panel.find(SHOW_FULL_ID).is_some());
    driver.step(&ReplayStep::Expand).await.unwrap();
    let panel = driver.document().get_by_id(PANEL_ID).unwrap();
    assert!(panel.find(SHOW_FULL_ID).is_none());
}

#[tokio::test]
async fn test_noise_on_same_email_does_not_rescore() {
    let p = pipeline("[[0.2]]").await;
    let mut driver = ReplayDriver::new(Arc::clone(&p.controller), Arc::clone(&p.injector), 1);

    activate(&mut driver).await;
    driver.step(&open_email("Lunch", "Noon?")).await.unwrap();
    eventually("score to render", || resulted(&p, 1)).await;

    driver.step(&ReplayStep::Noise { count: 3 }).await.unwrap();
    settle().await;

    assert_eq!(p.recorded.hits(), 1);
    assert_eq!(driver.document().count_by_id(PANEL_ID), 1);
}

#[tokio::test]
async fn test_toggle_off_removes_panel_and_stops_detection() {
    let p = pipeline("[[0.6]]").await;
    let mut driver = ReplayDriver::new(Arc::clone(&p.controller), Arc::clone(&p.injector), 1);

    activate(&mut driver).await;
    driver.step(&open_email("First", "one")).await.unwrap();
    eventually("score to render", || resulted(&p, 1)).await;

    driver.step(&ReplayStep::Toggle).await.unwrap();
    eventually("detector to detach", || driver.document().watcher_count() == 0).await;
    eventually("panel to close", || driver.document().count_by_id(PANEL_ID) == 0).await;

    driver.step(&open_email("Second", "two")).await.unwrap();
    settle().await;

    assert_eq!(p.controller.activation(1), ActivationState::Off);
    assert_eq!(p.controller.badge_text(1), "OFF");
    assert_eq!(driver.document().count_by_id(PANEL_ID), 0);
    assert_eq!(p.recorded.hits(), 1);
}

#[tokio::test]
async fn test_reload_resets_activation() {
    let p = pipeline("[[0.6]]").await;
    let mut driver = ReplayDriver::new(Arc::clone(&p.controller), Arc::clone(&p.injector), 2);

    activate(&mut driver).await;
    driver.step(&ReplayStep::Reload).await.unwrap();
    driver.step(&open_email("After reload", "text")).await.unwrap();
    settle().await;

    assert_eq!(p.controller.activation(2), ActivationState::Off);
    assert_eq!(driver.document().watcher_count(), 0);
    assert_eq!(driver.document().count_by_id(PANEL_ID), 0);
    assert_eq!(p.recorded.hits(), 0);
}

/// The JSON script form drives the same pipeline
#[tokio::test]
async fn test_json_script_runs() {
    let p = pipeline("[[0.1]]").await;
    let mut driver = ReplayDriver::new(Arc::clone(&p.controller), Arc::clone(&p.injector), 4);
    let script = ReplayScript::from_json(r#"{"tab": 4, "steps": [{"op": "toggle"}]}"#).unwrap();

    driver.run(&script).await.unwrap();
    eventually("detector to attach", || driver.document().watcher_count() == 1).await;
    driver.step(&open_email("Newsletter", "weekly digest")).await.unwrap();
    eventually("score to render", || resulted(&p, 4)).await;

    assert_eq!(p.recorded.hits(), 1);
}
