//! Expiring cache of computed recommendations
//!
//! Results are keyed by the rounded search origin, infrastructure type and
//! radius. [`PersistentCache`] keeps them in a SQLite file, [`MemoryCache`]
//! in process memory. Both expire entries a fixed TTL after they were written.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task;

use crate::config::CacheConfig;
use crate::models::{GeoPoint, InfraType, Recommendation};

/// Default lifetime of a cached recommendation
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache key for recommendation searches
#[derive(Debug, Clone, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub struct SearchCacheKey {
    pub center_lat: i64, // Lat * 100000
    pub center_lon: i64, // Lon * 100000
    pub infra: String,
    pub radius_m: u32,
}

impl SearchCacheKey {
    #[must_use]
    pub fn new(origin: GeoPoint, infra: &InfraType, radius_m: u32) -> Self {
        // Coordinates are bounded to +-180, so the scaled values fit easily
        let lat_scaled = (origin.lat * 100_000.0).round();
        let lon_scaled = (origin.lon * 100_000.0).round();

        Self {
            center_lat: lat_scaled as i64,
            center_lon: lon_scaled as i64,
            infra: infra.as_str().to_string(),
            radius_m,
        }
    }
}

impl fmt::Display for SearchCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat = self.center_lat as f64 / 100_000.0;
        let lon = self.center_lon as f64 / 100_000.0;
        write!(f, "{lat:.5}_{lon:.5}_{}_{}", self.infra, self.radius_m)
    }
}

/// Store for computed recommendations
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Fresh entry for `key`, `None` when missing or expired
    async fn get(&self, key: &SearchCacheKey) -> Result<Option<Recommendation>>;

    async fn put(&self, key: &SearchCacheKey, value: &Recommendation) -> Result<()>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Remove expired entries and return how many were dropped
    async fn evict_expired(&self) -> Result<usize>;
}

#[derive(Clone, Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: i64, // Unix timestamp (seconds)
}

fn unix_now() -> i64 {
    Utc::now().timestamp()
}

fn expiry_after(ttl: Duration) -> Result<i64> {
    let ttl = chrono::Duration::from_std(ttl)?;
    let expires = Utc::now()
        .checked_add_signed(ttl)
        .ok_or(anyhow!("TTL overflow"))?;
    Ok(expires.timestamp())
}

/// SQLite-backed result cache
pub struct PersistentCache {
    conn: Arc<Mutex<Connection>>,
    ttl: Duration,
}

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS search_cache (
    key TEXT PRIMARY KEY,
    expires_at INTEGER NOT NULL,
    value BLOB NOT NULL
)";

impl PersistentCache {
    /// Open (or create) the cache database at `path`
    pub fn open(path: impl AsRef<Path>, ttl: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open cache database {}", path.display()))?;
        conn.execute_batch(CREATE_TABLE)
            .context("Failed to create cache table")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            ttl,
        })
    }

    /// Run a blocking closure against the connection on the blocking pool
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| anyhow!("Cache connection lock poisoned"))?;
            f(&guard)
        })
        .await?
    }
}

#[async_trait]
impl ResultCache for PersistentCache {
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    async fn get(&self, key: &SearchCacheKey) -> Result<Option<Recommendation>> {
        let key = key.to_string();
        let now = unix_now();

        let row: Option<(i64, Vec<u8>)> = {
            let key = key.clone();
            self.with_conn(move |conn| {
                conn.query_row(
                    "SELECT expires_at, value FROM search_cache WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .context("Failed to read cache entry")
            })
            .await?
        };

        let Some((expires_at, bytes)) = row else {
            tracing::debug!("Key not found");
            return Ok(None);
        };

        if now < expires_at {
            tracing::debug!("Key found and still fresh");
            let value: Recommendation = postcard::from_bytes(&bytes)?;
            Ok(Some(value))
        } else {
            tracing::debug!("Key found but expired");
            self.with_conn(move |conn| {
                conn.execute("DELETE FROM search_cache WHERE key = ?1", params![key])
                    .context("Failed to remove expired cache entry")
            })
            .await?;
            Ok(None)
        }
    }

    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    async fn put(&self, key: &SearchCacheKey, value: &Recommendation) -> Result<()> {
        let key = key.to_string();
        let expires_at = expiry_after(self.ttl)?;
        let bytes = postcard::to_stdvec(value)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO search_cache (key, expires_at, value) VALUES (?1, ?2, ?3)",
                params![key, expires_at, bytes],
            )
            .context("Failed to write cache entry")
        })
        .await?;
        Ok(())
    }

    #[tracing::instrument(name = "clear_cache", level = "debug", skip(self))]
    async fn clear(&self) -> Result<()> {
        let removed = self
            .with_conn(|conn| {
                conn.execute("DELETE FROM search_cache", [])
                    .context("Failed to clear cache")
            })
            .await?;
        tracing::info!("Cleared {} cache entries", removed);
        Ok(())
    }

    #[tracing::instrument(name = "evict_cache", level = "debug", skip(self))]
    async fn evict_expired(&self) -> Result<usize> {
        let now = unix_now();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM search_cache WHERE expires_at <= ?1",
                params![now],
            )
            .context("Failed to evict expired cache entries")
        })
        .await
    }
}

/// In-process result cache
pub struct MemoryCache {
    entries: RwLock<HashMap<String, StoredEntry<Recommendation>>>,
    ttl: Duration,
}

impl MemoryCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &SearchCacheKey) -> Result<Option<Recommendation>> {
        let key = key.to_string();
        let now = unix_now();

        let entry = self.entries.read().await.get(&key).cloned();
        match entry {
            Some(entry) if now < entry.expires_at => Ok(Some(entry.value)),
            Some(_) => {
                self.entries.write().await.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &SearchCacheKey, value: &Recommendation) -> Result<()> {
        let entry = StoredEntry {
            value: value.clone(),
            expires_at: expiry_after(self.ttl)?,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn evict_expired(&self) -> Result<usize> {
        let now = unix_now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        Ok(before - entries.len())
    }
}

/// Open the configured on-disk cache, falling back to memory when the file
/// cannot be opened.
#[must_use]
pub fn open_configured(config: &CacheConfig) -> Arc<dyn ResultCache> {
    let ttl = Duration::from_secs(u64::from(config.ttl_hours) * 60 * 60);
    match PersistentCache::open(&config.location, ttl) {
        Ok(cache) => {
            tracing::info!("Using result cache at {}", config.location);
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!("Could not open result cache, keeping results in memory: {:#}", e);
            Arc::new(MemoryCache::new(ttl))
        }
    }
}
