//! Routes for the outbox operator surface.
//!
//! Permanently failed outbox events have no automatic follow-up; operators
//! watch for them here.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use signalbox_core::event::OutboxStats;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /statistics
async fn statistics(State(state): State<AppState>) -> Result<Json<OutboxStats>, ApiError> {
    let stats = state.outbox_store.statistics().await?;
    Ok(Json(stats))
}

/// Returns the router for the outbox surface.
pub fn router() -> Router<AppState> {
    Router::new().route("/statistics", get(statistics))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use signalbox_core::config::DlqConfig;
    use signalbox_core::event::{NewOutboxEvent, OutboxEvent, OutboxStatus};
    use signalbox_dlq::DlqProcessor;
    use signalbox_test_support::{
        FixedClock, InMemoryDeadLetterStore, InMemoryOutboxStore, RecordingEscalation,
        RecordingPublisher,
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_statistics_reports_status_counts() {
        let outbox = Arc::new(InMemoryOutboxStore::new());
        let mut failed = OutboxEvent::pending(
            NewOutboxEvent {
                aggregate_type: "order".into(),
                aggregate_id: "order-1".into(),
                event_type: "order.created".into(),
                payload: serde_json::json!({}),
                correlation_id: None,
            },
            Utc::now(),
        );
        failed.status = OutboxStatus::Failed;
        outbox.seed(failed);

        let processor = Arc::new(DlqProcessor::new(
            Arc::new(InMemoryDeadLetterStore::new()),
            Arc::new(RecordingPublisher::new()),
            Arc::new(RecordingEscalation::new()),
            Arc::new(FixedClock(Utc::now())),
            DlqConfig::default(),
        ));
        let state = AppState::new(processor, outbox);
        let app = router().with_state(state);

        let request = Request::builder()
            .method("GET")
            .uri("/statistics")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["pending"], 0);
    }
}
