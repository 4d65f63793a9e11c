//! Routes for the dead-letter operator surface.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get, routing::post};
use serde::Serialize;
use signalbox_core::event::DeadLetterStats;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body returned after a manual retry.
#[derive(Debug, Serialize)]
pub struct RetryResponse {
    /// The message that was retried.
    pub id: Uuid,
    /// What happened: `published`, `rescheduled`, or `escalated`.
    pub outcome: &'static str,
}

/// POST /{id}/retry
#[instrument(skip(state), fields(message_id = %id))]
async fn retry_dead_letter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RetryResponse>, ApiError> {
    let outcome = state.processor.retry_message(id).await?;

    info!(outcome = outcome.as_str(), "manual retry handled");

    Ok(Json(RetryResponse {
        id,
        outcome: outcome.as_str(),
    }))
}

/// GET /statistics
async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<DeadLetterStats>, ApiError> {
    let stats = state.processor.statistics().await?;
    Ok(Json(stats))
}

/// Returns the router for the dead-letter surface.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/retry", post(retry_dead_letter))
        .route("/statistics", get(statistics))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use signalbox_core::config::DlqConfig;
    use signalbox_core::event::{DeadLetterEvent, DeadLetterStatus, NewDeadLetterEvent};
    use signalbox_dlq::DlqProcessor;
    use signalbox_test_support::{
        FixedClock, InMemoryDeadLetterStore, InMemoryOutboxStore, RecordingEscalation,
        RecordingPublisher,
    };
    use tower::ServiceExt;

    fn app_with(store: Arc<InMemoryDeadLetterStore>) -> Router {
        let processor = Arc::new(DlqProcessor::new(
            store,
            Arc::new(RecordingPublisher::new()),
            Arc::new(RecordingEscalation::new()),
            Arc::new(FixedClock(Utc::now())),
            DlqConfig::default(),
        ));
        let state = AppState::new(processor, Arc::new(InMemoryOutboxStore::new()));
        router().with_state(state)
    }

    fn pending_message(topic: &str) -> DeadLetterEvent {
        DeadLetterEvent::pending(
            NewDeadLetterEvent {
                original_topic: topic.into(),
                payload: serde_json::json!({"k": "v"}),
                metadata: HashMap::new(),
                last_error: None,
            },
            Utc::now(),
        )
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_retry_returns_200_with_outcome() {
        let store = Arc::new(InMemoryDeadLetterStore::new());
        let message = pending_message("payment.created");
        let id = message.id;
        store.seed(message);
        let app = app_with(store.clone());

        let request = Request::builder()
            .method("POST")
            .uri(format!("/{id}/retry"))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["outcome"], "published");
        assert_eq!(json["id"], id.to_string());
    }

    #[tokio::test]
    async fn test_retry_of_unknown_message_returns_404() {
        let app = app_with(Arc::new(InMemoryDeadLetterStore::new()));

        let request = Request::builder()
            .method("POST")
            .uri(format!("/{}/retry", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "message_not_found");
    }

    #[tokio::test]
    async fn test_retry_of_processed_message_returns_409() {
        let store = Arc::new(InMemoryDeadLetterStore::new());
        let mut message = pending_message("payment.created");
        message.status = DeadLetterStatus::Processed;
        let id = message.id;
        store.seed(message);
        let app = app_with(store);

        let request = Request::builder()
            .method("POST")
            .uri(format!("/{id}/retry"))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "invalid_state");
    }

    #[tokio::test]
    async fn test_statistics_reports_counts_and_topics() {
        let store = Arc::new(InMemoryDeadLetterStore::new());
        store.seed(pending_message("payment.created"));
        store.seed(pending_message("payment.created"));
        let mut processed = pending_message("order.created");
        processed.status = DeadLetterStatus::Processed;
        store.seed(processed);
        let app = app_with(store);

        let request = Request::builder()
            .method("GET")
            .uri("/statistics")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["pending"], 2);
        assert_eq!(json["processed"], 1);
        assert_eq!(json["failed"], 0);
        assert_eq!(json["pending_by_topic"][0]["topic"], "payment.created");
        assert_eq!(json["pending_by_topic"][0]["count"], 2);
    }
}
