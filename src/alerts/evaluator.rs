//! Per-reading alert decision logic and the polling worker that drives it.
//!
//! Decisions are a pure function of `(reading, state, config)`, so replaying
//! a reading after a crash yields the same outcome. State transitions are
//! gated on delivery results: a fire only sticks when at least one recipient
//! actually received it, and a clear sticks when someone received it or
//! nobody is left to notify.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;

use super::config::{AlertConfig, AlertRuntimeState, ConfigError};
use super::notifier::{
    build_high_payload, build_recovery_payload, deliver_to_all, NotificationTransport,
};
use crate::store::{Reading, Store, StoreError};

/// Rows fetched per log query, to bound memory.
pub const BATCH_LIMIT: i64 = 500;

/// What a single reading asks the evaluator to do.
///
/// `fire` and `clear` are mutually exclusive because `fire` requires
/// `!in_alert` and `clear` requires `in_alert`. `repeat` and `clear` are
/// mutually exclusive because `co2_clear < co2_high`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decision {
    /// Send a new high alert
    pub fire: bool,
    /// Re-send the high alert while still in alert
    pub repeat: bool,
    /// Send a recovery notice
    pub clear: bool,
}

/// Pure decision function; no side effects, no state mutation.
///
/// Cooldown is measured from the last fire and is not reset by a clear.
/// A state that has never fired (`last_alert_ts == 0`) is not gated.
pub fn evaluate(reading: &Reading, state: &AlertRuntimeState, config: &AlertConfig) -> Decision {
    let cooldown_ok =
        state.last_alert_ts == 0 || reading.ts - state.last_alert_ts >= config.cooldown_seconds;

    let fire = !state.in_alert && reading.co2 >= config.co2_high as f64 && cooldown_ok;

    let repeat = state.in_alert
        && config.repeat_seconds > 0
        && reading.co2 >= config.co2_high as f64
        && reading.ts - state.last_alert_ts >= config.repeat_seconds;

    let clear = state.in_alert && reading.co2 <= config.co2_clear as f64;

    Decision { fire, repeat, clear }
}

/// Apply one reading: decide, deliver, and transition state.
///
/// `state.last_seen_id` advances whether or not anything fires, so a crash
/// mid-batch resumes from the last fully processed row.
pub async fn process_reading(
    store: &Store,
    transport: &dyn NotificationTransport,
    reading: &Reading,
    state: &mut AlertRuntimeState,
    config: &AlertConfig,
) -> Result<(), StoreError> {
    let decision = evaluate(reading, state, config);
    state.last_seen_id = reading.id;

    if decision.fire || decision.repeat {
        let payload = build_high_payload(reading, config.co2_high);
        let stats = deliver_to_all(store, transport, &payload).await?;

        if stats.sent > 0 {
            // A repeat refreshes the cooldown clock but leaves in_alert as is.
            state.in_alert = true;
            state.last_alert_ts = reading.ts;
            tracing::info!(
                id = reading.id,
                co2 = reading.co2,
                ts = reading.ts,
                sent = stats.sent,
                attempted = stats.attempted,
                removed = stats.removed,
                repeat = decision.repeat,
                "Alert sent"
            );
        } else {
            // Nobody received it: stay unalerted so the next eligible
            // reading retries instead of silently swallowing the episode.
            tracing::warn!(
                id = reading.id,
                co2 = reading.co2,
                ts = reading.ts,
                attempted = stats.attempted,
                removed = stats.removed,
                "Alert not sent"
            );
        }
    }

    if decision.clear {
        let payload = build_recovery_payload(reading, config.co2_clear);
        let stats = deliver_to_all(store, transport, &payload).await?;

        // Also leave the alert when nobody is left capable of receiving,
        // otherwise an emptied registry would pin in_alert forever.
        if stats.sent > 0 || !stats.has_remaining_recipients() {
            state.in_alert = false;
        }
        tracing::info!(
            id = reading.id,
            co2 = reading.co2,
            ts = reading.ts,
            sent = stats.sent,
            attempted = stats.attempted,
            removed = stats.removed,
            in_alert_after = state.in_alert,
            "Recovery processed"
        );
    }

    Ok(())
}

/// One polling cycle: re-validate config, then drain new readings in
/// id order, persisting runtime state after each batch.
///
/// An invalid live-edited config skips the cycle without consuming
/// readings; they stay in the log until an operator fixes it.
pub async fn run_cycle(
    store: &Store,
    transport: &dyn NotificationTransport,
    state: &mut AlertRuntimeState,
) -> Result<(), StoreError> {
    let config = store.ensure_alert_config().await?;
    if let Err(e) = config.validate() {
        tracing::warn!(error = %e, "Invalid alert config, skipping cycle");
        return Ok(());
    }

    loop {
        let batch = store.readings_after(state.last_seen_id, BATCH_LIMIT).await?;
        if batch.is_empty() {
            break;
        }

        let batch_len = batch.len();
        for reading in &batch {
            process_reading(store, transport, reading, state, &config).await?;
        }
        store.persist_runtime_state(state).await?;

        if (batch_len as i64) < BATCH_LIMIT {
            break;
        }
    }

    Ok(())
}

/// Background alert worker, one logical process in discrete cycles.
pub struct AlertWorker {
    store: Store,
    transport: Arc<dyn NotificationTransport>,
    poll_interval: Duration,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl AlertWorker {
    /// Create a worker, failing fast when the persisted config violates
    /// its invariants at startup.
    pub async fn new(
        store: Store,
        transport: Arc<dyn NotificationTransport>,
        poll_interval: Duration,
    ) -> Result<Self, EvaluatorError> {
        let config = store.ensure_alert_config().await?;
        config.validate()?;

        Ok(Self {
            store,
            transport,
            poll_interval,
            shutdown_tx: None,
        })
    }

    /// Start the polling loop. Shutdown is observed between cycles, so an
    /// in-progress batch always finishes before exit.
    pub async fn start(&mut self) -> Result<tokio::task::JoinHandle<()>, EvaluatorError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let store = self.store.clone();
        let transport = Arc::clone(&self.transport);
        let poll_interval = self.poll_interval;
        let mut state = store.load_runtime_state().await?;

        tracing::info!(
            last_seen_id = state.last_seen_id,
            in_alert = state.in_alert,
            poll_interval_secs = poll_interval.as_secs(),
            "Alert worker started"
        );

        Ok(tokio::spawn(async move {
            let mut ticker = interval(poll_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = run_cycle(&store, transport.as_ref(), &mut state).await {
                            tracing::error!(error = %e, "Alert cycle failed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Alert worker shutting down");
                        break;
                    }
                }
            }
        }))
    }

    /// Signal the worker to stop after its current cycle.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }
}

/// Alert worker errors
#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid alert config: {0}")]
    Config(#[from] ConfigError),
}
