//! Integration tests for the delivery pipeline behind the operator API.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use signalbox_core::clock::Clock;
use signalbox_core::config::RelayConfig;
use signalbox_core::event::{NewDeadLetterEvent, NewOutboxEvent, OutboxEvent};
use signalbox_core::ports::DeadLetterStore;
use signalbox_outbox::OutboxRelay;
use signalbox_test_support::{MutableClock, PublishFailure, RecordingPublisher};

fn test_clock() -> MutableClock {
    MutableClock::new(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let pipeline = common::build_test_pipeline(RecordingPublisher::new(), Arc::new(test_clock()));

    let (status, json) = common::get_json(pipeline.app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_relayed_events_show_up_in_outbox_statistics() {
    let clock = test_clock();
    let pipeline =
        common::build_test_pipeline(RecordingPublisher::new(), Arc::new(clock.clone()));

    for n in 0..3 {
        pipeline.outbox_store.seed(OutboxEvent::pending(
            NewOutboxEvent {
                aggregate_type: "order".into(),
                aggregate_id: format!("order-{n}"),
                event_type: "order.created".into(),
                payload: serde_json::json!({"n": n}),
                correlation_id: None,
            },
            clock.now(),
        ));
    }

    let relay = OutboxRelay::new(
        pipeline.outbox_store.clone(),
        pipeline.publisher.clone(),
        Arc::new(clock),
        RelayConfig::default(),
    );
    relay.tick().await.unwrap();

    let (status, json) = common::get_json(pipeline.app, "/api/v1/outbox/statistics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["processed"], 3);
    assert_eq!(json["pending"], 0);
    assert_eq!(pipeline.publisher.call_count(), 3);
}

#[tokio::test]
async fn test_dead_letter_flows_from_intake_through_manual_retry() {
    let clock = test_clock();
    // First publish attempt fails, the manual retry succeeds.
    let pipeline = common::build_test_pipeline(
        RecordingPublisher::with_failure(PublishFailure::FirstN(1)),
        Arc::new(clock.clone()),
    );

    // Consumer-side intake.
    let message = pipeline
        .dead_letter_store
        .insert(NewDeadLetterEvent {
            original_topic: "payment.created".into(),
            payload: serde_json::json!({"paymentId": "p-1"}),
            metadata: HashMap::new(),
            last_error: Some("consumer handler threw".into()),
        })
        .await
        .unwrap();

    // Scheduled pass fails and reschedules the message.
    pipeline.processor.tick().await.unwrap();
    let (status, json) =
        common::get_json(pipeline.app.clone(), "/api/v1/dead-letters/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pending"], 1);
    assert_eq!(json["pending_by_topic"][0]["topic"], "payment.created");

    // Operator forces a retry; it bypasses the backoff window.
    let (status, json) = common::post_empty(
        pipeline.app.clone(),
        &format!("/api/v1/dead-letters/{}/retry", message.id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "published");

    let (status, json) = common::get_json(pipeline.app, "/api/v1/dead-letters/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pending"], 0);
    assert_eq!(json["processed"], 1);
    assert_eq!(pipeline.escalation.alert_count(), 0);
}
