//! Quota circuit breaker
//!
//! The provider's quota is shared by every query shape, so one breaker guards
//! all live calls. It opens when a call reports quota exhaustion and closes
//! lazily: the first `is_open()` after the block duration clears the stored
//! timestamp, so the next exhaustion starts a fresh window.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::store::{read_timestamp, remove_key, write_timestamp, KeyValueStore, QUOTA_KEY};
use crate::clock::Clock;

/// Tracks quota exhaustion across all requests
#[derive(Debug, Clone)]
pub struct QuotaBreaker {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    block_duration: Duration,
}

impl QuotaBreaker {
    /// Creates a breaker that stays open for `block_duration` after each exhaustion
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        block_duration: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            block_duration,
        }
    }

    /// Whether live calls are currently suppressed
    pub fn is_open(&self) -> bool {
        self.active_since().is_some()
    }

    /// Opens the breaker as of now, replacing any earlier window
    pub fn record_quota_exceeded(&self) {
        let now = self.clock.now();
        warn!(
            until = %(now + self.block_duration),
            "provider quota exhausted, suspending live fetches"
        );
        write_timestamp(self.store.as_ref(), QUOTA_KEY, now);
    }

    /// When the current window started, if the breaker is open
    pub fn exceeded_at(&self) -> Option<DateTime<Utc>> {
        self.active_since()
    }

    /// Time left until the breaker closes, if it is open
    pub fn remaining(&self) -> Option<Duration> {
        let since = self.active_since()?;
        Some(since + self.block_duration - self.clock.now())
    }

    fn active_since(&self) -> Option<DateTime<Utc>> {
        let exceeded_at = read_timestamp(self.store.as_ref(), QUOTA_KEY)?;
        if self.clock.now() - exceeded_at >= self.block_duration {
            info!("quota block elapsed, resuming live fetches");
            remove_key(self.store.as_ref(), QUOTA_KEY);
            return None;
        }
        Some(exceeded_at)
    }
}
