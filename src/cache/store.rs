use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::entry::CacheEntry;
use crate::clock::{Clock, SystemClock};
use crate::error::CacheError;

/// Raw keyed storage behind a [`CacheStore`].
///
/// Backends only store and return entries; expiry is decided by the store.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn kind(&self) -> &'static str;

    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    async fn store(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Remove `key` only while it still holds `seen`.
    ///
    /// Returns `false` when the entry was replaced or removed in the meantime.
    /// The check and the removal must not interleave with [`CacheBackend::store`].
    async fn remove_if_unchanged(&self, key: &str, seen: &CacheEntry) -> Result<bool, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;

    async fn len(&self) -> Result<usize, CacheError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub backend: String,
    pub entries: Option<usize>,
}

/// Best-effort TTL cache.
///
/// Nothing here returns an error: a failing backend is logged and behaves
/// like an empty cache.
pub struct CacheStore {
    backend: Box<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl CacheStore {
    pub fn new(backend: impl CacheBackend + 'static, default_ttl: Duration) -> Self {
        Self::with_clock(backend, default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        backend: impl CacheBackend + 'static,
        default_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend: Box::new(backend),
            clock,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.load_live(key).await.map(|entry| entry.value)
    }

    /// Typed read. A payload that no longer deserializes is dropped.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.load_live(key).await?;
        match serde_json::from_value(entry.value.clone()) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(key, error = %e, "discarding undecodable cache entry");
                self.discard(key, &entry).await;
                None
            }
        }
    }

    async fn load_live(&self, key: &str) -> Option<CacheEntry> {
        let entry = match self.backend.load(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache get failed");
                return None;
            }
        };

        if entry.is_expired(self.clock.now()) {
            debug!(key, "cache entry expired");
            self.discard(key, &entry).await;
            return None;
        }
        Some(entry)
    }

    /// Drop `seen` without clobbering a write that replaced it after it was read.
    async fn discard(&self, key: &str, seen: &CacheEntry) {
        match self.backend.remove_if_unchanged(key, seen).await {
            Ok(true) => {}
            Ok(false) => debug!(key, "cache entry replaced concurrently, keeping it"),
            Err(e) => warn!(key, error = %e, "cache delete failed"),
        }
    }

    /// Store `value` for `ttl` (or the default TTL), replacing any prior entry.
    pub async fn set(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            debug!(key, "zero ttl, not caching");
            return;
        }

        let created_at = self.clock.now();
        let entry = CacheEntry {
            value,
            created_at,
            expires_at: expiry(created_at, ttl),
        };

        if let Err(e) = self.backend.store(key, entry).await {
            warn!(key, error = %e, "cache set failed");
        }
    }

    pub async fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        match serde_json::to_value(value) {
            Ok(json) => self.set(key, json, ttl).await,
            Err(e) => warn!(key, error = %e, "cache payload not serializable"),
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.backend.remove(key).await {
            warn!(key, error = %e, "cache delete failed");
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.backend.clear().await {
            warn!(error = %e, "cache clear failed");
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = match self.backend.len().await {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(error = %e, "cache stats unavailable");
                None
            }
        };
        CacheStats {
            backend: self.backend.kind().to_string(),
            entries,
        }
    }
}

fn expiry(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
    created_at
        .checked_add_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
