//! Signalbox pipeline server entry point.
//!
//! Wires the PostgreSQL stores, spawns the outbox relay and DLQ processor
//! as background tasks, and serves the operator API. Shutdown is graceful:
//! ctrl-c stops the HTTP server, then the workers finish their in-flight
//! batch before the process exits.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use signalbox_api::error::AppError;
use signalbox_api::routes;
use signalbox_api::state::AppState;
use signalbox_core::clock::{Clock, SystemClock};
use signalbox_core::config::{DlqConfig, RelayConfig};
use signalbox_core::ports::{
    DeadLetterStore, EscalationSink, NoopEscalation, OutboxStore, Publisher, TracingPublisher,
};
use signalbox_dlq::DlqProcessor;
use signalbox_outbox::OutboxRelay;
use signalbox_store::{PgDeadLetterStore, PgOutboxStore};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Signalbox pipeline server");

    // Read configuration from environment.
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| AppError::Config("DATABASE_URL environment variable must be set".into()))?;
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
    let relay_config = RelayConfig::from_env().map_err(|e| AppError::Config(e.to_string()))?;
    let dlq_config = DlqConfig::from_env().map_err(|e| AppError::Config(e.to_string()))?;

    // Create database connection pool and apply migrations.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    // Shared collaborators. The tracing publisher stands in until a real
    // broker adapter is configured.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let publisher: Arc<dyn Publisher> = Arc::new(TracingPublisher);
    let escalation: Arc<dyn EscalationSink> = Arc::new(NoopEscalation);
    let outbox_store: Arc<dyn OutboxStore> = Arc::new(PgOutboxStore::new(pool.clone()));
    let dead_letter_store: Arc<dyn DeadLetterStore> = Arc::new(PgDeadLetterStore::new(pool));

    // Spawn the background workers.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = OutboxRelay::new(
        outbox_store.clone(),
        publisher.clone(),
        clock.clone(),
        relay_config,
    );
    let processor = Arc::new(DlqProcessor::new(
        dead_letter_store,
        publisher,
        escalation,
        clock,
        dlq_config,
    ));
    let relay_task = tokio::spawn(relay.run(shutdown_rx.clone()));
    let dlq_task = tokio::spawn(processor.clone().run(shutdown_rx));

    // Build router.
    let app_state = AppState::new(processor, outbox_store);
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/dead-letters", routes::dead_letters::router())
        .nest("/api/v1/outbox", routes::outbox::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST/PORT: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "operator API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    // Stop the workers; in-flight batches drain before the tasks return.
    let _ = shutdown_tx.send(true);
    let _ = relay_task.await;
    let _ = dlq_task.await;

    tracing::info!("Signalbox pipeline server stopped");
    Ok(())
}
