//! Threshold alerting with hysteresis and cooldown.
//!
//! A polling worker consumes new readings in id order, fires a notification
//! when CO2 crosses the high threshold, and sends a recovery notice once it
//! drops back below the clear threshold.

pub mod config;
pub mod evaluator;
pub mod notifier;

pub use config::{AlertConfig, AlertRuntimeState, ConfigError};
pub use evaluator::{evaluate, AlertWorker, Decision, EvaluatorError};
pub use notifier::{
    deliver_to_all, DeliveryError, DeliveryStats, NotificationPayload, NotificationTransport,
    WebhookTransport,
};
