//! Anomaly model - the durable log table of one deployment

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use sentinel_core::constants::JOURNAL_TIME_FORMAT;
use sentinel_core::{AnomalyJournal, JournalEntry, JournalError, Variant};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnomalyRow {
    pub id: String,
    pub timestamp: String,
    pub source_ip: Option<String>,
    pub dest_ip: Option<String>,
    pub protocol: Option<String>,
    pub anomaly_score: f64,
    pub is_anomaly: i64,
}

impl AnomalyRow {
    /// `None` when the stored timestamp is unreadable
    pub fn into_entry(self) -> Option<JournalEntry> {
        let timestamp = NaiveDateTime::parse_from_str(&self.timestamp, JOURNAL_TIME_FORMAT)
            .ok()?
            .and_utc();

        Some(JournalEntry {
            id: entry_id(&self.id),
            timestamp,
            source_ip: self.source_ip.unwrap_or_default(),
            dest_ip: self.dest_ip.unwrap_or_default(),
            protocol: self.protocol.unwrap_or_default(),
            anomaly_score: self.anomaly_score,
            is_anomaly: self.is_anomaly != 0,
        })
    }
}

/// Rows written by older tooling carry integer ids; map each to a stable UUID
fn entry_id(raw: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_bytes()))
}

/// SQLite-backed durable log
#[derive(Debug, Clone)]
pub struct SqlJournal {
    pool: SqlitePool,
    table: &'static str,
}

impl SqlJournal {
    pub fn new(pool: SqlitePool, variant: Variant) -> Self {
        Self {
            pool,
            table: variant.journal_table(),
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert one row
    pub async fn insert(&self, entry: &JournalEntry) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (id, timestamp, source_ip, dest_ip, protocol, anomaly_score, is_anomaly)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            self.table
        ))
        .bind(entry.id.to_string())
        .bind(entry.timestamp.format(JOURNAL_TIME_FORMAT).to_string())
        .bind(&entry.source_ip)
        .bind(&entry.dest_ip)
        .bind(&entry.protocol)
        .bind(entry.anomaly_score)
        .bind(entry.is_anomaly as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Rows at or after `cutoff`, newest first
    pub async fn list_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<AnomalyRow>, sqlx::Error> {
        sqlx::query_as::<_, AnomalyRow>(&format!(
            r#"
            SELECT CAST(id AS TEXT) AS id, timestamp, source_ip, dest_ip, protocol,
                   anomaly_score, is_anomaly
            FROM {}
            WHERE timestamp >= ?
            ORDER BY timestamp DESC
            "#,
            self.table
        ))
        .bind(cutoff.format(JOURNAL_TIME_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await
    }
}

fn write_error(err: sqlx::Error) -> JournalError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            JournalError::Unavailable(err.to_string())
        }
        other => JournalError::WriteFailed(other.to_string()),
    }
}

impl AnomalyJournal for SqlJournal {
    async fn append(&self, entry: &JournalEntry) -> Result<(), JournalError> {
        self.insert(entry).await.map_err(write_error)
    }

    async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<JournalEntry>, JournalError> {
        let rows = self
            .list_since(cutoff)
            .await
            .map_err(|e| JournalError::ReadFailed(e.to_string()))?;

        Ok(rows.into_iter().filter_map(AnomalyRow::into_entry).collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{Duration, TimeZone};
    use sqlx::sqlite::SqlitePoolOptions;
    use tokio_test::{assert_err, assert_ok};

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn entry(minutes_ago: i64, ip: &str) -> JournalEntry {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        JournalEntry {
            id: Uuid::new_v4(),
            timestamp: now - Duration::minutes(minutes_ago),
            source_ip: ip.to_string(),
            dest_ip: "N/A".to_string(),
            protocol: "DNS".to_string(),
            anomaly_score: 0.4,
            is_anomaly: true,
        }
    }

    #[tokio::test]
    async fn test_append_and_read_window() {
        let journal = SqlJournal::new(memory_pool().await, Variant::Dns);

        let old = entry(120, "10.0.0.1");
        let recent = entry(10, "10.0.0.2");
        let newest = entry(1, "10.0.0.3");
        for e in [&old, &recent, &newest] {
            journal.append(e).await.unwrap();
        }

        let cutoff = Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap();
        let rows = journal.since(cutoff).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, newest.id);
        assert_eq!(rows[1].id, recent.id);
        assert_eq!(rows[1].timestamp, recent.timestamp);
        assert!(rows[0].is_anomaly);
    }

    #[tokio::test]
    async fn test_variants_use_separate_tables() {
        let pool = memory_pool().await;
        let dns = SqlJournal::new(pool.clone(), Variant::Dns);
        let dos = SqlJournal::new(pool, Variant::Dos);

        dos.append(&entry(5, "10.9.9.9")).await.unwrap();

        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert!(dns.since(epoch).await.unwrap().is_empty());
        assert_eq!(dos.since(epoch).await.unwrap().len(), 1);
        assert_eq!(dos.table(), "dos_anomalies");
    }

    #[tokio::test]
    async fn test_duplicate_id_is_a_write_failure() {
        let journal = SqlJournal::new(memory_pool().await, Variant::Dns);
        let e = entry(5, "10.0.0.1");

        assert_ok!(journal.append(&e).await);
        let err = assert_err!(journal.append(&e).await);

        assert!(matches!(err, JournalError::WriteFailed(_)));
    }

    #[tokio::test]
    async fn test_unreadable_rows_are_skipped() {
        let journal = SqlJournal::new(memory_pool().await, Variant::Dns);
        sqlx::query(
            "INSERT INTO anomalies (id, timestamp, source_ip, dest_ip, protocol, anomaly_score, is_anomaly) \
             VALUES ('7', 'yesterday', NULL, NULL, NULL, 0.2, 1)",
        )
        .execute(journal.pool())
        .await
        .unwrap();
        journal.append(&entry(1, "10.0.0.1")).await.unwrap();

        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let rows = journal.since(epoch).await.unwrap();

        // 'yesterday' sorts after any digit, so it passes the cutoff but cannot be parsed
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_legacy_integer_ids_stay_distinct() {
        let journal = SqlJournal::new(memory_pool().await, Variant::Dns);
        for id in [1, 2] {
            sqlx::query(
                "INSERT INTO anomalies (id, timestamp, source_ip, dest_ip, protocol, anomaly_score, is_anomaly) \
                 VALUES (?, '2024-06-01 11:30:00', '10.0.0.1', NULL, NULL, 0.2, 1)",
            )
            .bind(id)
            .execute(journal.pool())
            .await
            .unwrap();
        }

        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let ids = |rows: Vec<JournalEntry>| {
            let mut ids: Vec<Uuid> = rows.into_iter().map(|e| e.id).collect();
            ids.sort();
            ids
        };
        let first = ids(journal.since(epoch).await.unwrap());
        let again = ids(journal.since(epoch).await.unwrap());

        assert_eq!(first.len(), 2);
        assert_ne!(first[0], first[1]);
        assert!(first.iter().all(|id| !id.is_nil()));
        assert_eq!(first, again);
    }
}
