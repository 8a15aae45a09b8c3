use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache storage failed: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("Cached payload is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Two-tier cache for raw Overpass payloads, keyed by query type. The
/// SQLite tier survives restarts; the moka tier answers repeated category
/// switches without touching the pool. Both tiers age entries from the
/// capture timestamp, and a stale durable row is reported absent without
/// being deleted (the next fetch overwrites it wholesale).
#[derive(Clone)]
pub struct ResponseCache {
    pool: SqlitePool,
    memory: Cache<String, (DateTime<Utc>, Value)>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(pool: SqlitePool, ttl_hours: i64) -> Self {
        Self::with_ttl(pool, Duration::hours(ttl_hours))
    }

    /// Sub-hour TTLs are only interesting to tests.
    pub fn with_ttl(pool: SqlitePool, ttl: Duration) -> Self {
        let memory = Cache::builder().max_capacity(64).build();
        Self { pool, memory, ttl }
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        Utc::now() - fetched_at <= self.ttl
    }

    pub async fn init_tables(&self) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS overpass_cache (
                query_type TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                fetched_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn cache_key(query_type: &str) -> String {
        format!("palmela_{}_cache", query_type)
    }

    /// A hit is returned only while younger than the TTL. Storage errors are
    /// logged and reported as a miss so the caller falls through to the
    /// network.
    pub async fn get(&self, query_type: &str) -> Option<Value> {
        let key = Self::cache_key(query_type);

        // The memory tier carries the capture time so a hit ages out on
        // the same clock as the durable row, and a promoted row keeps its
        // remaining lifetime instead of gaining a fresh TTL.
        if let Some((fetched_at, payload)) = self.memory.get(&key).await {
            if self.is_fresh(fetched_at) {
                tracing::debug!("Memory cache hit: {}", key);
                return Some(payload);
            }
            self.memory.invalidate(&key).await;
        }

        match self.load_durable(&key).await {
            Ok(Some((fetched_at, payload))) => {
                self.memory
                    .insert(key.clone(), (fetched_at, payload.clone()))
                    .await;
                tracing::info!("Loaded data from cache: {}", key);
                Some(payload)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    async fn load_durable(&self, key: &str) -> Result<Option<(DateTime<Utc>, Value)>, CacheError> {
        let row = sqlx::query("SELECT payload, fetched_at FROM overpass_cache WHERE query_type = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let fetched_at: DateTime<Utc> = row.try_get("fetched_at")?;
        if !self.is_fresh(fetched_at) {
            let age = Utc::now() - fetched_at;
            tracing::info!(
                "Cache too old ({:.1} hours): {}",
                age.num_minutes() as f64 / 60.0,
                key
            );
            return Ok(None);
        }

        let payload: String = row.try_get("payload")?;
        Ok(Some((fetched_at, serde_json::from_str(&payload)?)))
    }

    /// Written after every successful fetch. A failed durable write is
    /// logged and swallowed; worst case the payload is fetched again.
    pub async fn put(&self, query_type: &str, payload: &Value) {
        let key = Self::cache_key(query_type);
        let fetched_at = Utc::now();
        self.memory
            .insert(key.clone(), (fetched_at, payload.clone()))
            .await;

        let result = sqlx::query(
            r#"
            INSERT INTO overpass_cache (query_type, payload, fetched_at)
            VALUES (?, ?, ?)
            ON CONFLICT(query_type) DO UPDATE SET
                payload = excluded.payload,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(&key)
        .bind(payload.to_string())
        .bind(fetched_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => tracing::info!("Saved data to cache: {}", key),
            Err(e) => tracing::warn!("Cache write failed: {}", e),
        }
    }
}
