//! Alert thresholds and hysteresis runtime state, persisted in the state map.

use serde::{Deserialize, Serialize};

use crate::store::state::{bool_from_state, int_from_state};
use crate::store::{Store, StoreError};

pub const DEFAULT_CO2_HIGH: i64 = 1500;
pub const DEFAULT_CO2_CLEAR: i64 = 500;
pub const DEFAULT_COOLDOWN_SECONDS: i64 = 1800;
pub const DEFAULT_REPEAT_SECONDS: i64 = 0;

pub const KEY_CO2_HIGH: &str = "alert:co2_high";
pub const KEY_CO2_CLEAR: &str = "alert:co2_clear";
pub const KEY_COOLDOWN_SECONDS: &str = "alert:cooldown_seconds";
pub const KEY_REPEAT_SECONDS: &str = "alert:repeat_seconds";

pub const KEY_LAST_SEEN_ID: &str = "alert:last_seen_id";
pub const KEY_IN_ALERT: &str = "alert:in_alert";
pub const KEY_LAST_ALERT_TS: &str = "alert:last_alert_ts";

/// Alert thresholds. `co2_clear < co2_high` is enforced at every boundary
/// that accepts a config; an invalid combination is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// CO2 ppm at or above which an alert fires
    pub co2_high: i64,
    /// CO2 ppm at or below which an active alert clears
    pub co2_clear: i64,
    /// Minimum seconds between consecutive fires
    pub cooldown_seconds: i64,
    /// Seconds between repeat notices while still in alert; 0 disables repeats
    #[serde(default)]
    pub repeat_seconds: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            co2_high: DEFAULT_CO2_HIGH,
            co2_clear: DEFAULT_CO2_CLEAR,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            repeat_seconds: DEFAULT_REPEAT_SECONDS,
        }
    }
}

impl AlertConfig {
    /// Check the config invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.co2_clear >= self.co2_high {
            return Err(ConfigError::ClearNotBelowHigh {
                clear: self.co2_clear,
                high: self.co2_high,
            });
        }
        if self.cooldown_seconds < 0 {
            return Err(ConfigError::NegativeInterval("cooldown_seconds"));
        }
        if self.repeat_seconds < 0 {
            return Err(ConfigError::NegativeInterval("repeat_seconds"));
        }
        Ok(())
    }
}

/// Mutable hysteresis state, owned by the evaluator between persists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertRuntimeState {
    /// High-water mark of processed reading ids; never decreases
    pub last_seen_id: i64,
    /// True while a high alert is active and recovery is unconfirmed
    pub in_alert: bool,
    /// Timestamp of the most recently fired alert, for cooldown gating
    pub last_alert_ts: i64,
}

impl Store {
    /// Load the alert config, lazily writing defaults for any missing key
    /// so subsequent reads are stable. Does not validate.
    pub async fn ensure_alert_config(&self) -> Result<AlertConfig, StoreError> {
        let high_raw = self.get_state(KEY_CO2_HIGH).await?;
        let clear_raw = self.get_state(KEY_CO2_CLEAR).await?;
        let cooldown_raw = self.get_state(KEY_COOLDOWN_SECONDS).await?;
        let repeat_raw = self.get_state(KEY_REPEAT_SECONDS).await?;

        let config = AlertConfig {
            co2_high: int_from_state(high_raw.as_deref(), DEFAULT_CO2_HIGH),
            co2_clear: int_from_state(clear_raw.as_deref(), DEFAULT_CO2_CLEAR),
            cooldown_seconds: int_from_state(cooldown_raw.as_deref(), DEFAULT_COOLDOWN_SECONDS),
            repeat_seconds: int_from_state(repeat_raw.as_deref(), DEFAULT_REPEAT_SECONDS),
        };

        if high_raw.is_none() {
            self.set_state(KEY_CO2_HIGH, &config.co2_high.to_string()).await?;
        }
        if clear_raw.is_none() {
            self.set_state(KEY_CO2_CLEAR, &config.co2_clear.to_string()).await?;
        }
        if cooldown_raw.is_none() {
            self.set_state(KEY_COOLDOWN_SECONDS, &config.cooldown_seconds.to_string())
                .await?;
        }
        if repeat_raw.is_none() {
            self.set_state(KEY_REPEAT_SECONDS, &config.repeat_seconds.to_string())
                .await?;
        }

        Ok(config)
    }

    /// Persist a config that has already passed validation.
    pub async fn persist_alert_config(&self, config: &AlertConfig) -> Result<(), StoreError> {
        self.set_state(KEY_CO2_HIGH, &config.co2_high.to_string()).await?;
        self.set_state(KEY_CO2_CLEAR, &config.co2_clear.to_string()).await?;
        self.set_state(KEY_COOLDOWN_SECONDS, &config.cooldown_seconds.to_string())
            .await?;
        self.set_state(KEY_REPEAT_SECONDS, &config.repeat_seconds.to_string())
            .await?;
        Ok(())
    }

    /// Load the hysteresis state, defaulting missing keys to zero values.
    pub async fn load_runtime_state(&self) -> Result<AlertRuntimeState, StoreError> {
        Ok(AlertRuntimeState {
            last_seen_id: int_from_state(self.get_state(KEY_LAST_SEEN_ID).await?.as_deref(), 0),
            in_alert: bool_from_state(self.get_state(KEY_IN_ALERT).await?.as_deref(), false),
            last_alert_ts: int_from_state(self.get_state(KEY_LAST_ALERT_TS).await?.as_deref(), 0),
        })
    }

    /// Persist the hysteresis state. Called once per processed batch.
    pub async fn persist_runtime_state(&self, state: &AlertRuntimeState) -> Result<(), StoreError> {
        self.set_state(KEY_LAST_SEEN_ID, &state.last_seen_id.to_string())
            .await?;
        self.set_state(KEY_IN_ALERT, if state.in_alert { "1" } else { "0" })
            .await?;
        self.set_state(KEY_LAST_ALERT_TS, &state.last_alert_ts.to_string())
            .await?;
        Ok(())
    }
}

/// Config invariant violations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("co2_clear ({clear}) must be lower than co2_high ({high})")]
    ClearNotBelowHigh { clear: i64, high: i64 },

    #[error("{0} must be >= 0")]
    NegativeInterval(&'static str),
}
