//! Notification recipient registry.
//!
//! Rows are created on subscribe and removed either by explicit unsubscribe
//! or when the transport reports the endpoint permanently gone; there is no
//! separate sweep job.

use serde::{Deserialize, Serialize};
use sqlx::Row;

use super::{Store, StoreError};

/// One registered recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique delivery endpoint (https URL)
    pub endpoint: String,
    /// Opaque credential blob the transport knows how to use
    pub credentials: String,
}

impl Store {
    /// Register a recipient. Returns true when a new row was created,
    /// false when an existing endpoint had its credentials replaced.
    pub async fn add_subscription(
        &self,
        endpoint: &str,
        credentials: &str,
    ) -> Result<bool, StoreError> {
        let existing = sqlx::query("SELECT endpoint FROM subscriptions WHERE endpoint = ?")
            .bind(endpoint)
            .fetch_optional(self.pool())
            .await?;

        sqlx::query(
            "INSERT OR REPLACE INTO subscriptions (endpoint, credentials, created_ts)
             VALUES (?, ?, ?)",
        )
        .bind(endpoint)
        .bind(credentials)
        .bind(chrono::Utc::now().timestamp())
        .execute(self.pool())
        .await?;

        Ok(existing.is_none())
    }

    /// Remove a recipient. Idempotent; returns whether a row was actually deleted.
    pub async fn remove_subscription(&self, endpoint: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE endpoint = ?")
            .bind(endpoint)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All registered recipients.
    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query("SELECT endpoint, credentials FROM subscriptions ORDER BY created_ts")
            .fetch_all(self.pool())
            .await?;

        Ok(rows
            .iter()
            .map(|row| Subscription {
                endpoint: row.get("endpoint"),
                credentials: row.get("credentials"),
            })
            .collect())
    }

    /// Number of registered recipients.
    pub async fn count_subscriptions(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM subscriptions")
            .fetch_one(self.pool())
            .await?;

        Ok(row.get("n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_and_list() {
        let store = Store::open_in_memory().await.unwrap();

        let created = store
            .add_subscription("https://push.example/a", "{\"auth\":\"x\"}")
            .await
            .unwrap();
        assert!(created);

        // Re-subscribing the same endpoint replaces credentials, no new row
        let created = store
            .add_subscription("https://push.example/a", "{\"auth\":\"y\"}")
            .await
            .unwrap();
        assert!(!created);

        let subs = store.list_subscriptions().await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].credentials, "{\"auth\":\"y\"}");
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let store = Store::open_in_memory().await.unwrap();

        store
            .add_subscription("https://push.example/a", "{}")
            .await
            .unwrap();

        assert!(store.remove_subscription("https://push.example/a").await.unwrap());
        assert!(!store.remove_subscription("https://push.example/a").await.unwrap());
        assert_eq!(store.count_subscriptions().await.unwrap(), 0);
    }
}
