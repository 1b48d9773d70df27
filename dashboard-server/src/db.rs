//! Database module - SQLite connection and migrations

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Create tables if not exist
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
///
/// Timestamps are `YYYY-MM-DD HH:MM:SS` UTC text so string order is time order.
const SCHEMA_SQL: &str = r#"
-- DNS deployment anomalies
CREATE TABLE IF NOT EXISTS anomalies (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    source_ip TEXT,
    dest_ip TEXT,
    protocol TEXT,
    anomaly_score REAL NOT NULL,
    is_anomaly INTEGER NOT NULL
);

-- DoS deployment anomalies
CREATE TABLE IF NOT EXISTS dos_anomalies (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    source_ip TEXT,
    dest_ip TEXT,
    protocol TEXT,
    anomaly_score REAL NOT NULL,
    is_anomaly INTEGER NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_anomalies_timestamp ON anomalies(timestamp);
CREATE INDEX IF NOT EXISTS idx_dos_anomalies_timestamp ON dos_anomalies(timestamp);
"#;
