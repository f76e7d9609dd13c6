//! airmon server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - AIRMON_HOST: Bind address (default: 0.0.0.0)
//! - AIRMON_PORT: Port number (default: 8080)
//! - AIRMON_DB: SQLite database path (default: airmon.db)
//! - AIRMON_COLLECT_INTERVAL_SECS: Seconds between sensor reads (default: 10)
//! - AIRMON_ALERT_POLL_INTERVAL_SECS: Seconds between alert cycles (default: 5)
//! - RUST_LOG: Log level (default: info)

use airmon::api::{run_server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airmon=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = std::env::var("AIRMON_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("AIRMON_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let db_path = std::env::var("AIRMON_DB").unwrap_or_else(|_| "airmon.db".to_string());
    let collect_interval_secs = std::env::var("AIRMON_COLLECT_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let alert_poll_interval_secs = std::env::var("AIRMON_ALERT_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);

    let config = ServerConfig {
        host,
        port,
        db_path,
        collect_interval_secs,
        alert_poll_interval_secs,
    };

    tracing::info!("airmon configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!("  Database: {}", config.db_path);
    tracing::info!("  Collect interval: {} seconds", config.collect_interval_secs);
    tracing::info!(
        "  Alert poll interval: {} seconds",
        config.alert_poll_interval_secs
    );

    run_server(config).await
}
