//! Collector worker: polls the sensor and appends readings to the log.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;

use crate::sensor::Sensor;
use crate::store::Store;

/// Rows older than this are pruned from the log.
const RETENTION: Duration = Duration::from_secs(7 * 24 * 3600);
/// How often the prune runs.
const PRUNE_EVERY: Duration = Duration::from_secs(3600);

/// Background collector worker.
pub struct CollectorWorker {
    store: Store,
    sensor: Arc<dyn Sensor>,
    interval: Duration,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl CollectorWorker {
    pub fn new(store: Store, sensor: Arc<dyn Sensor>, interval: Duration) -> Self {
        Self {
            store,
            sensor,
            interval,
            shutdown_tx: None,
        }
    }

    /// Start the collection loop. A failed sensor read is logged and the
    /// loop keeps polling; it never exits on one bad read.
    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let store = self.store.clone();
        let sensor = Arc::clone(&self.sensor);
        let poll_interval = self.interval;

        tokio::spawn(async move {
            tracing::info!(interval_secs = poll_interval.as_secs(), "Collector started");

            let mut ticker = interval(poll_interval);
            let mut last_prune: i64 = 0;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        collect_once(&store, sensor.as_ref(), &mut last_prune).await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Collector shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Signal the collector to stop.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }
}

async fn collect_once(store: &Store, sensor: &dyn Sensor, last_prune: &mut i64) {
    let ts = chrono::Utc::now().timestamp();

    let measurement = match sensor.read() {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "Sensor read error");
            return;
        }
    };

    match store
        .append_reading(ts, measurement.co2, measurement.temperature, measurement.humidity)
        .await
    {
        Ok(id) => {
            tracing::debug!(
                id,
                ts,
                co2 = measurement.co2,
                temperature = measurement.temperature,
                humidity = measurement.humidity,
                "Reading stored"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to store reading");
            return;
        }
    }

    if ts - *last_prune >= PRUNE_EVERY.as_secs() as i64 {
        *last_prune = ts;
        let cutoff = ts - RETENTION.as_secs() as i64;
        match store.prune_readings_before(cutoff).await {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "Pruned old readings"),
            Err(e) => tracing::warn!(error = %e, "Prune failed"),
        }
    }
}
