//! Append-only reading log keyed by a monotonically increasing id.

use serde::{Deserialize, Serialize};
use sqlx::Row;

use super::{Store, StoreError};

/// One sensor measurement, immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Monotonic id assigned by the log on insert
    pub id: i64,
    /// Unix seconds
    pub ts: i64,
    /// CO2 concentration in ppm
    pub co2: f64,
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

fn row_to_reading(row: &sqlx::sqlite::SqliteRow) -> Reading {
    Reading {
        id: row.get("id"),
        ts: row.get("ts"),
        co2: row.get("co2"),
        temperature: row.get("temperature"),
        humidity: row.get("humidity"),
    }
}

impl Store {
    /// Append a reading and return its assigned id.
    pub async fn append_reading(
        &self,
        ts: i64,
        co2: f64,
        temperature: f64,
        humidity: f64,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO measurements (ts, co2, temperature, humidity) VALUES (?, ?, ?, ?)",
        )
        .bind(ts)
        .bind(co2)
        .bind(temperature)
        .bind(humidity)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Readings with id strictly greater than `watermark`, ascending, at most `limit` rows.
    pub async fn readings_after(&self, watermark: i64, limit: i64) -> Result<Vec<Reading>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, ts, co2, temperature, humidity FROM measurements
             WHERE id > ? ORDER BY id ASC LIMIT ?",
        )
        .bind(watermark)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(row_to_reading).collect())
    }

    /// Readings with ts in `[start, end]`, ascending by ts.
    pub async fn readings_in_range(&self, start: i64, end: i64) -> Result<Vec<Reading>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, ts, co2, temperature, humidity FROM measurements
             WHERE ts BETWEEN ? AND ? ORDER BY ts ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(row_to_reading).collect())
    }

    /// Most recent reading, or None when the log is empty.
    pub async fn latest_reading(&self) -> Result<Option<Reading>, StoreError> {
        let row = sqlx::query(
            "SELECT id, ts, co2, temperature, humidity FROM measurements
             ORDER BY ts DESC, id DESC LIMIT 1",
        )
        .fetch_optional(self.pool())
        .await?;

        Ok(row.as_ref().map(row_to_reading))
    }

    /// Delete readings older than `cutoff` (unix seconds). Returns rows removed.
    pub async fn prune_readings_before(&self, cutoff: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM measurements WHERE ts < ?")
            .bind(cutoff)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_assigns_monotonic_ids() {
        let store = Store::open_in_memory().await.unwrap();

        let first = store.append_reading(1000, 420.0, 22.0, 45.0).await.unwrap();
        let second = store.append_reading(1010, 430.0, 22.1, 45.2).await.unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn test_readings_after_watermark() {
        let store = Store::open_in_memory().await.unwrap();

        for i in 0..5 {
            store
                .append_reading(1000 + i, 400.0 + i as f64, 22.0, 45.0)
                .await
                .unwrap();
        }

        let all = store.readings_after(0, 500).await.unwrap();
        assert_eq!(all.len(), 5);

        let tail = store.readings_after(all[2].id, 500).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert!(tail.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_readings_after_respects_limit() {
        let store = Store::open_in_memory().await.unwrap();

        for i in 0..10 {
            store.append_reading(1000 + i, 400.0, 22.0, 45.0).await.unwrap();
        }

        let page = store.readings_after(0, 3).await.unwrap();
        assert_eq!(page.len(), 3);
    }

    #[tokio::test]
    async fn test_range_query_and_latest() {
        let store = Store::open_in_memory().await.unwrap();

        store.append_reading(1000, 400.0, 22.0, 45.0).await.unwrap();
        store.append_reading(2000, 500.0, 22.0, 45.0).await.unwrap();
        store.append_reading(3000, 600.0, 22.0, 45.0).await.unwrap();

        let rows = store.readings_in_range(1500, 2500).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ts, 2000);

        let latest = store.latest_reading().await.unwrap().unwrap();
        assert_eq!(latest.ts, 3000);
    }

    #[tokio::test]
    async fn test_latest_on_empty_log() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(store.latest_reading().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prune_old_readings() {
        let store = Store::open_in_memory().await.unwrap();

        store.append_reading(1000, 400.0, 22.0, 45.0).await.unwrap();
        store.append_reading(2000, 500.0, 22.0, 45.0).await.unwrap();

        let removed = store.prune_readings_before(1500).await.unwrap();
        assert_eq!(removed, 1);

        let remaining = store.readings_after(0, 500).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].ts, 2000);
    }
}
