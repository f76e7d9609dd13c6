use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    data, get_config, health_check, latest, put_config, subscribe, subscription_count,
    unsubscribe, AppState,
};
use crate::alerts::{AlertWorker, WebhookTransport};
use crate::collector::CollectorWorker;
use crate::sensor::SimulatedSensor;
use crate::store::Store;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub collect_interval_secs: u64,
    pub alert_poll_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            db_path: "airmon.db".to_string(),
            collect_interval_secs: 10,
            alert_poll_interval_secs: 5,
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Readings
        .route("/api/latest", get(latest))
        .route("/api/data", get(data))
        // Alert config
        .route("/api/config", get(get_config))
        .route("/api/config", put(put_config))
        // Recipient registry
        .route("/api/subscriptions", get(subscription_count))
        .route("/api/subscriptions", post(subscribe))
        .route("/api/subscriptions", delete(unsubscribe))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server together with the collector and alert workers.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(&config.db_path).await?;

    // Fails fast when the persisted alert config is invalid.
    let mut alert_worker = AlertWorker::new(
        store.clone(),
        Arc::new(WebhookTransport::new()),
        std::time::Duration::from_secs(config.alert_poll_interval_secs),
    )
    .await?;
    let alert_handle = alert_worker.start().await?;

    let mut collector = CollectorWorker::new(
        store.clone(),
        Arc::new(SimulatedSensor::new()),
        std::time::Duration::from_secs(config.collect_interval_secs),
    );
    let collector_handle = collector.start();

    let state = Arc::new(AppState { store: store.clone() });
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting airmon server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Workers finish their in-progress cycle before the handles resolve.
    alert_worker.stop().await;
    collector.stop().await;
    let _ = alert_handle.await;
    let _ = collector_handle.await;

    store.close().await;
    tracing::info!("airmon server stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");

    tracing::info!("Shutdown signal received, stopping workers...");
}
