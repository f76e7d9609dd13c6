//! airmon: Home Air-Quality Monitor
//!
//! A collector polls a CO2/temperature/humidity sensor and appends readings
//! to a SQLite-backed log. An HTTP API serves the latest reading and
//! downsampled range queries. An alert worker watches new readings and sends
//! webhook notifications when CO2 crosses a high threshold, with hysteresis
//! (a separate clear threshold) and a cooldown so notifications do not flood.
//!
//! # Example
//!
//! ```no_run
//! use airmon::alerts::{evaluate, AlertConfig, AlertRuntimeState};
//! use airmon::store::Reading;
//!
//! let reading = Reading { id: 1, ts: 1000, co2: 1600.0, temperature: 22.0, humidity: 45.0 };
//! let state = AlertRuntimeState::default();
//! let decision = evaluate(&reading, &state, &AlertConfig::default());
//! assert!(decision.fire);
//! ```

pub mod alerts;
pub mod api;
pub mod collector;
pub mod downsample;
pub mod sensor;
pub mod store;

// Re-export commonly used types
pub use alerts::{AlertConfig, AlertRuntimeState, AlertWorker};
pub use downsample::sieve_evenly;
pub use store::{Reading, Store, StoreError};
