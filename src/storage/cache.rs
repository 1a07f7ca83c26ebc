use crate::analysis::AnalysisOutcome;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use thiserror::Error;

/// The one slot the producer writes and the gateway reads.
const SLOT_KEY: &str = "latest_analysis";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache store error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Cached value is not a valid outcome: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Single-slot, overwrite-only store for the latest analysis outcome.
///
/// Deliberately not a generic key-value API: `put` replaces the whole
/// slot in one statement and `get` returns the whole slot, which keeps
/// the at-most-one-current-value invariant visible in the interface.
/// Only the producer writes; readers either see the previous value or
/// the new one, never a partial write.
#[derive(Clone)]
pub struct AnalysisCache {
    pool: SqlitePool,
}

impl AnalysisCache {
    /// Open the backing SQLite file (created if missing) and run the
    /// schema migration. `":memory:"` works for tests.
    ///
    /// A single connection is enough for a one-row table and keeps an
    /// in-memory database coherent across calls.
    pub async fn open(path: &str) -> Result<Self, CacheError> {
        let url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await?;
        let cache = Self { pool };
        cache.migrate().await?;
        Ok(cache)
    }

    async fn migrate(&self) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analysis_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replace the slot with a new outcome. Atomic: a concurrent `get`
    /// sees either the old value or the new one.
    pub async fn put(&self, outcome: &AnalysisOutcome) -> Result<(), CacheError> {
        let value = serde_json::to_string(outcome)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO analysis_cache (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
        "#,
        )
        .bind(SLOT_KEY)
        .bind(&value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::debug!(bytes = value.len(), "Stored analysis outcome");
        Ok(())
    }

    /// Read the current slot value, if any producer run has completed.
    pub async fn get(&self) -> Result<Option<AnalysisOutcome>, CacheError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM analysis_cache WHERE key = ?")
                .bind(SLOT_KEY)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            None => Ok(None),
            Some((value,)) => Ok(Some(serde_json::from_str(&value)?)),
        }
    }
}
