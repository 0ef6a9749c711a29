//! Time-boxed read cache over the local key/value storage.
//!
//! Every cached value is wrapped in a [`CacheEntry`] envelope carrying its
//! expiry; a read past `expires_at` counts as a miss and evicts the entry,
//! so stale data is never returned. There is no size-bounded eviction:
//! key cardinality is a handful of entries per user, TTL expiry is enough.
//!
//! Balance-derived classes (balance, history, monthly stats, summary) are
//! always invalidated together via [`Cache::invalidate_balance`]; removing
//! them individually could serve a stale balance next to a fresh history.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Datelike;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{Clock, KeyValueStorage, StoreError};

const NAMESPACE: &str = "@sofinance_cache";

/// Envelope format version; entries written by an older layout are misses.
const ENTRY_VERSION: u32 = 1;

/// Per-data-class TTLs, in seconds. Deserializable so hosts can load the
/// table from their settings file; defaults match the product values.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CacheConfig {
    pub balance_ttl_secs: u64,
    pub history_ttl_secs: u64,
    pub monthly_stats_ttl_secs: u64,
    pub user_data_ttl_secs: u64,
    pub summary_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            balance_ttl_secs: 5 * 60,
            history_ttl_secs: 10 * 60,
            monthly_stats_ttl_secs: 30 * 60,
            user_data_ttl_secs: 60 * 60,
            summary_ttl_secs: 15 * 60,
        }
    }
}

/// Addressable cache entries, one per data class per user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKey<'a> {
    Balance { user_id: &'a str },
    History { user_id: &'a str },
    MonthlyStats { user_id: &'a str, year: i32, month: u32 },
    UserData { user_id: &'a str },
    Summary { user_id: &'a str },
}

impl CacheKey<'_> {
    fn storage_key(&self) -> String {
        match self {
            Self::Balance { user_id } => format!("{NAMESPACE}:balance:{user_id}"),
            Self::History { user_id } => format!("{NAMESPACE}:history:{user_id}"),
            Self::MonthlyStats {
                user_id,
                year,
                month,
            } => format!("{NAMESPACE}:monthly_stats:{user_id}:{year}-{month:02}"),
            Self::UserData { user_id } => format!("{NAMESPACE}:user_data:{user_id}"),
            Self::Summary { user_id } => format!("{NAMESPACE}:summary:{user_id}"),
        }
    }

    fn ttl_secs(&self, config: &CacheConfig) -> u64 {
        match self {
            Self::Balance { .. } => config.balance_ttl_secs,
            Self::History { .. } => config.history_ttl_secs,
            Self::MonthlyStats { .. } => config.monthly_stats_ttl_secs,
            Self::UserData { .. } => config.user_data_ttl_secs,
            Self::Summary { .. } => config.summary_ttl_secs,
        }
    }
}

/// Persisted wrapper around a cached value.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry<T> {
    data: T,
    timestamp: i64,
    expires_at: i64,
    version: u32,
}

/// Counters and occupancy reported by [`Cache::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
pub struct Cache<S, C> {
    storage: S,
    clock: C,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: KeyValueStorage, C: Clock> Cache<S, C> {
    pub fn new(storage: S, clock: C, config: CacheConfig) -> Self {
        Self {
            storage,
            clock,
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Stores `data` under `key` with the key's configured TTL.
    pub async fn set<T: Serialize>(&self, key: CacheKey<'_>, data: &T) -> Result<(), StoreError> {
        let now = self.clock.now().timestamp_millis();
        let ttl_ms = key.ttl_secs(&self.config) as i64 * 1000;
        let entry = CacheEntry {
            data,
            timestamp: now,
            expires_at: now + ttl_ms,
            version: ENTRY_VERSION,
        };
        let payload = serde_json::to_string(&entry)?;
        self.storage.set_item(&key.storage_key(), payload).await
    }

    /// Reads `key`, treating expired or unreadable entries as misses (and
    /// evicting them).
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: CacheKey<'_>,
    ) -> Result<Option<T>, StoreError> {
        let storage_key = key.storage_key();
        let Some(raw) = self.storage.get_item(&storage_key).await? else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key = %storage_key, error = %err, "evicting unreadable cache entry");
                self.storage.remove_item(&storage_key).await?;
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
        };

        let now = self.clock.now().timestamp_millis();
        if entry.version != ENTRY_VERSION || now > entry.expires_at {
            debug!(key = %storage_key, "cache entry expired");
            self.storage.remove_item(&storage_key).await?;
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(entry.data))
    }

    /// Whether an unexpired entry exists for `key`. Does not touch the
    /// hit/miss counters.
    pub async fn has(&self, key: CacheKey<'_>) -> Result<bool, StoreError> {
        let Some(raw) = self.storage.get_item(&key.storage_key()).await? else {
            return Ok(false);
        };
        let Ok(entry) = serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw) else {
            return Ok(false);
        };
        Ok(entry.version == ENTRY_VERSION && self.clock.now().timestamp_millis() <= entry.expires_at)
    }

    pub async fn remove(&self, key: CacheKey<'_>) -> Result<(), StoreError> {
        self.storage.remove_item(&key.storage_key()).await
    }

    /// Removes every cache entry, expired or not.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let keys = self.namespace_keys().await?;
        self.storage.multi_remove(&keys).await
    }

    /// Removes only the entries past their expiry.
    pub async fn clear_expired(&self) -> Result<(), StoreError> {
        let now = self.clock.now().timestamp_millis();
        let keys = self.namespace_keys().await?;
        let mut expired = Vec::new();
        for (key, raw) in self.storage.multi_get(&keys).await? {
            let Some(raw) = raw else { continue };
            match serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw) {
                Ok(entry) if now <= entry.expires_at && entry.version == ENTRY_VERSION => {}
                _ => expired.push(key),
            }
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "evicting expired cache entries");
            self.storage.multi_remove(&expired).await?;
        }
        Ok(())
    }

    /// Removes every balance-derived entry for `user_id` as one unit:
    /// balance, history, current-month stats and summary. Writes only ever
    /// touch the current month, so the current-month stats key is the one
    /// that can be stale.
    pub async fn invalidate_balance(&self, user_id: &str) -> Result<(), StoreError> {
        let now = self.clock.now();
        let keys = vec![
            CacheKey::Balance { user_id }.storage_key(),
            CacheKey::History { user_id }.storage_key(),
            CacheKey::MonthlyStats {
                user_id,
                year: now.year(),
                month: now.month(),
            }
            .storage_key(),
            CacheKey::Summary { user_id }.storage_key(),
        ];
        debug!(user_id, "invalidating balance-derived cache entries");
        self.storage.multi_remove(&keys).await
    }

    pub async fn stats(&self) -> Result<CacheStats, StoreError> {
        let now = self.clock.now().timestamp_millis();
        let keys = self.namespace_keys().await?;
        let mut expired = 0;
        let entries = keys.len();
        for (_, raw) in self.storage.multi_get(&keys).await? {
            let Some(raw) = raw else { continue };
            match serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw) {
                Ok(entry) if now <= entry.expires_at && entry.version == ENTRY_VERSION => {}
                _ => expired += 1,
            }
        }
        Ok(CacheStats {
            entries,
            expired,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }

    async fn namespace_keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|key| key.starts_with(NAMESPACE))
            .collect())
    }
}
