//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use signalbox_api::routes;
use signalbox_api::state::AppState;
use signalbox_core::clock::Clock;
use signalbox_core::config::DlqConfig;
use signalbox_dlq::DlqProcessor;
use signalbox_test_support::{
    InMemoryDeadLetterStore, InMemoryOutboxStore, RecordingEscalation, RecordingPublisher,
};

/// Everything a pipeline scenario needs: the router plus handles to the
/// doubles behind it.
pub struct TestPipeline {
    pub app: Router,
    pub outbox_store: Arc<InMemoryOutboxStore>,
    pub dead_letter_store: Arc<InMemoryDeadLetterStore>,
    pub publisher: Arc<RecordingPublisher>,
    pub escalation: Arc<RecordingEscalation>,
    pub processor: Arc<DlqProcessor>,
}

/// Builds the full app router over in-memory stores, with the same route
/// structure as `main.rs`.
pub fn build_test_pipeline(publisher: RecordingPublisher, clock: Arc<dyn Clock>) -> TestPipeline {
    let outbox_store = Arc::new(InMemoryOutboxStore::new());
    let dead_letter_store = Arc::new(InMemoryDeadLetterStore::new());
    let publisher = Arc::new(publisher);
    let escalation = Arc::new(RecordingEscalation::new());

    let processor = Arc::new(DlqProcessor::new(
        dead_letter_store.clone(),
        publisher.clone(),
        escalation.clone(),
        clock,
        DlqConfig::default(),
    ));

    let state = AppState::new(processor.clone(), outbox_store.clone());
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/dead-letters", routes::dead_letters::router())
        .nest("/api/v1/outbox", routes::outbox::router())
        .with_state(state);

    TestPipeline {
        app,
        outbox_store,
        dead_letter_store,
        publisher,
        escalation,
        processor,
    }
}

/// Send a POST request with an empty body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
