//! Cache manager for persisting fetched pages
//!
//! Provides a `CacheManager` that stores `ContentPage`s as JSON in a
//! `KeyValueStore`, stamped with the time they were written. An entry is valid
//! while `now - stored_at < ttl`; anything older, or anything that no longer
//! parses, is treated as absent and removed on the next read.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::store::{remove_key, KeyValueStore, CACHE_PREFIX};
use crate::clock::Clock;
use crate::data::ContentPage;

/// Wrapper struct for cached data held in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Fingerprint this entry was written under
    pub key: String,
    /// When the data was cached
    pub stored_at: DateTime<Utc>,
    /// The cached page
    pub payload: ContentPage,
}

/// Reads and writes cached pages with a fixed time-to-live
///
/// Storage failures never reach the caller: a failed read is a miss and a
/// failed write is logged and dropped.
#[derive(Debug, Clone)]
pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CacheManager {
    /// Creates a cache over `store` whose entries live for `ttl`
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Returns the page cached under `key` if it is still valid
    ///
    /// Expired and unparsable entries are removed and reported as `None`.
    pub fn get(&self, key: &str) -> Option<ContentPage> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry = self.decode(key, &raw)?;
        if self.is_valid(&entry) {
            debug!(key, "cache hit");
            Some(entry.payload)
        } else {
            debug!(key, stored_at = %entry.stored_at, "cache entry expired");
            remove_key(self.store.as_ref(), key);
            None
        }
    }

    /// Stores `payload` under `key`, replacing whatever was there
    pub fn put(&self, key: &str, payload: &ContentPage) {
        let entry = CacheEntry {
            key: key.to_string(),
            stored_at: self.clock.now(),
            payload: payload.clone(),
        };

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "failed to encode cache entry");
                return;
            }
        };

        if let Err(e) = self.store.set(key, &json) {
            warn!(key, error = %e, "cache write failed, continuing uncached");
        }
    }

    /// Every valid cached page, most recently stored first
    ///
    /// Malformed entries are skipped and expired ones removed along the way.
    pub fn scan_all(&self) -> Vec<ContentPage> {
        self.valid_entries()
            .into_iter()
            .map(|entry| entry.payload)
            .collect()
    }

    /// Number of valid entries
    pub fn len(&self) -> usize {
        self.valid_entries().len()
    }

    /// Whether there are no valid entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn valid_entries(&self) -> Vec<CacheEntry> {
        let keys = match self.store.keys(CACHE_PREFIX) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "cache scan failed");
                return Vec::new();
            }
        };

        let mut entries: Vec<CacheEntry> = keys
            .iter()
            .filter_map(|key| {
                let raw = self.store.get(key).ok().flatten()?;
                let entry = self.decode(key, &raw)?;
                if self.is_valid(&entry) {
                    Some(entry)
                } else {
                    remove_key(self.store.as_ref(), key);
                    None
                }
            })
            .collect();

        entries.sort_by(|a, b| b.stored_at.cmp(&a.stored_at));
        entries
    }

    fn is_valid(&self, entry: &CacheEntry) -> bool {
        self.clock.now() - entry.stored_at < self.ttl
    }

    fn decode(&self, key: &str, raw: &str) -> Option<CacheEntry> {
        match serde_json::from_str::<CacheEntry>(raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(key, error = %e, "skipping malformed cache entry");
                None
            }
        }
    }
}
