//! Durable string key-value map shared by the alerter and the config API.

use sqlx::Row;

use super::{Store, StoreError};

impl Store {
    /// Read a state value, None if the key has never been set.
    pub async fn get_state(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM app_state WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    /// Write a state value, replacing any previous one.
    pub async fn set_state(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT OR REPLACE INTO app_state (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(self.pool())
            .await?;

        Ok(())
    }
}

/// Parse a stored integer, falling back to `default` on missing or garbled text.
pub fn int_from_state(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Parse a stored boolean ("1"/"0"), falling back to `default`.
pub fn bool_from_state(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}
