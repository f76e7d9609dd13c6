//! Notification transport and delivery-stats accounting.
//!
//! The evaluator is parameterized over [`NotificationTransport`] so push,
//! webhook, or any other delivery channel can be swapped in. The webhook
//! implementation treats HTTP 404/410 as "this endpoint no longer exists"
//! and everything else that fails as transient.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::store::{Reading, Store, StoreError, Subscription};

/// Delivery attempt timeout per recipient.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Notification body sent to every recipient.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    /// "co2_high" or "co2_recovery"
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub body: String,
    pub ts: i64,
    pub url: &'static str,
}

/// Build the payload for a threshold-crossing alert.
pub fn build_high_payload(reading: &Reading, high: i64) -> NotificationPayload {
    NotificationPayload {
        kind: "co2_high",
        title: "AirMon: High CO2 Alert".to_string(),
        body: format!(
            "CO2 is high: {:.0} ppm (threshold {} ppm). Temp {:.1} C, humidity {:.1}%.",
            reading.co2, high, reading.temperature, reading.humidity
        ),
        ts: reading.ts,
        url: "/",
    }
}

/// Build the payload for a recovery notice.
pub fn build_recovery_payload(reading: &Reading, clear: i64) -> NotificationPayload {
    NotificationPayload {
        kind: "co2_recovery",
        title: "AirMon: CO2 Normalized".to_string(),
        body: format!(
            "CO2 is back to normal: {:.0} ppm (clear threshold {} ppm). Temp {:.1} C, humidity {:.1}%.",
            reading.co2, clear, reading.temperature, reading.humidity
        ),
        ts: reading.ts,
        url: "/",
    }
}

/// One delivery attempt failure.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The recipient endpoint no longer exists; remove it and never retry.
    #[error("Recipient permanently gone")]
    Gone,

    /// Anything else: timeout, connect error, non-2xx. Retried naturally
    /// on the next eligible reading.
    #[error("Transient delivery failure: {0}")]
    Transient(String),
}

/// Capability to deliver one payload to one recipient.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn deliver(
        &self,
        subscription: &Subscription,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError>;
}

/// Webhook transport: POSTs the payload JSON to the subscription endpoint.
pub struct WebhookTransport {
    client: reqwest::Client,
}

impl WebhookTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(DELIVERY_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

impl Default for WebhookTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationTransport for WebhookTransport {
    async fn deliver(
        &self,
        subscription: &Subscription,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&subscription.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            Err(DeliveryError::Gone)
        } else {
            Err(DeliveryError::Transient(format!(
                "endpoint returned status {}",
                status
            )))
        }
    }
}

/// Outcome counters for one deliver-to-all pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Recipient count at call time
    pub attempted: u32,
    /// Successful deliveries
    pub sent: u32,
    /// Recipients pruned as permanently gone
    pub removed: u32,
}

impl DeliveryStats {
    /// Whether anyone capable of receiving is still registered.
    pub fn has_remaining_recipients(&self) -> bool {
        self.attempted - self.removed > 0
    }
}

/// Deliver `payload` to every registered recipient.
///
/// Recipients reported permanently gone are removed from the registry
/// immediately, independent of how the rest of the pass goes; this is the
/// only mechanism by which stale recipients leave the registry.
pub async fn deliver_to_all(
    store: &Store,
    transport: &dyn NotificationTransport,
    payload: &NotificationPayload,
) -> Result<DeliveryStats, StoreError> {
    let subscriptions = store.list_subscriptions().await?;
    let mut stats = DeliveryStats {
        attempted: subscriptions.len() as u32,
        sent: 0,
        removed: 0,
    };

    for subscription in &subscriptions {
        match transport.deliver(subscription, payload).await {
            Ok(()) => {
                stats.sent += 1;
                tracing::debug!(endpoint = %subscription.endpoint, kind = payload.kind, "Notification delivered");
            }
            Err(DeliveryError::Gone) => {
                store.remove_subscription(&subscription.endpoint).await?;
                stats.removed += 1;
                tracing::info!(endpoint = %subscription.endpoint, "Recipient gone, removed from registry");
            }
            Err(DeliveryError::Transient(cause)) => {
                tracing::warn!(endpoint = %subscription.endpoint, %cause, "Notification delivery failed");
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Scripted transport: maps endpoint suffixes to fixed outcomes.
    pub(crate) struct FakeTransport {
        pub delivered: Mutex<Vec<String>>,
        pub gone_endpoints: Vec<String>,
        pub failing_endpoints: Vec<String>,
    }

    impl FakeTransport {
        pub fn ok() -> Self {
            Self {
                delivered: Mutex::new(Vec::new()),
                gone_endpoints: Vec::new(),
                failing_endpoints: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl NotificationTransport for FakeTransport {
        async fn deliver(
            &self,
            subscription: &Subscription,
            _payload: &NotificationPayload,
        ) -> Result<(), DeliveryError> {
            if self.gone_endpoints.contains(&subscription.endpoint) {
                return Err(DeliveryError::Gone);
            }
            if self.failing_endpoints.contains(&subscription.endpoint) {
                return Err(DeliveryError::Transient("connection refused".to_string()));
            }
            self.delivered.lock().push(subscription.endpoint.clone());
            Ok(())
        }
    }

    fn reading(ts: i64, co2: f64) -> Reading {
        Reading {
            id: 1,
            ts,
            co2,
            temperature: 22.5,
            humidity: 44.0,
        }
    }

    #[test]
    fn test_payload_builders() {
        let high = build_high_payload(&reading(1000, 1612.4), 1500);
        assert_eq!(high.kind, "co2_high");
        assert!(high.body.contains("1612 ppm"));
        assert!(high.body.contains("threshold 1500 ppm"));
        assert_eq!(high.ts, 1000);

        let recovery = build_recovery_payload(&reading(2000, 440.0), 500);
        assert_eq!(recovery.kind, "co2_recovery");
        assert!(recovery.body.contains("clear threshold 500 ppm"));
    }

    #[tokio::test]
    async fn test_stats_count_sent_and_removed() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_subscription("https://p/1", "{}").await.unwrap();
        store.add_subscription("https://p/2", "{}").await.unwrap();
        store.add_subscription("https://p/3", "{}").await.unwrap();

        let transport = FakeTransport {
            gone_endpoints: vec!["https://p/2".to_string()],
            ..FakeTransport::ok()
        };

        let payload = build_high_payload(&reading(1000, 1600.0), 1500);
        let stats = deliver_to_all(&store, &transport, &payload).await.unwrap();

        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.sent, 2);
        assert_eq!(stats.removed, 1);
        assert!(stats.has_remaining_recipients());

        // The gone endpoint self-healed out of the registry
        assert_eq!(store.count_subscriptions().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_transient_failures_are_not_removed() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_subscription("https://p/1", "{}").await.unwrap();

        let transport = FakeTransport {
            failing_endpoints: vec!["https://p/1".to_string()],
            ..FakeTransport::ok()
        };

        let payload = build_high_payload(&reading(1000, 1600.0), 1500);
        let stats = deliver_to_all(&store, &transport, &payload).await.unwrap();

        assert_eq!(stats.attempted, 1);
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.removed, 0);
        assert!(stats.has_remaining_recipients());
        assert_eq!(store.count_subscriptions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_registry_has_no_remaining_recipients() {
        let store = Store::open_in_memory().await.unwrap();
        let transport = FakeTransport::ok();

        let payload = build_recovery_payload(&reading(1000, 400.0), 500);
        let stats = deliver_to_all(&store, &transport, &payload).await.unwrap();

        assert_eq!(stats.attempted, 0);
        assert!(!stats.has_remaining_recipients());
    }

    #[test]
    fn test_remaining_recipients_predicate() {
        let stats = DeliveryStats {
            attempted: 3,
            sent: 0,
            removed: 3,
        };
        assert!(!stats.has_remaining_recipients());

        let stats = DeliveryStats {
            attempted: 3,
            sent: 1,
            removed: 2,
        };
        assert!(stats.has_remaining_recipients());
    }
}
