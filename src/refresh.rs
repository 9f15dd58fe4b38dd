//! Manual refresh governor
//!
//! Rate-limits user-initiated refreshes so impatient clicking does not burn
//! provider quota. This is advisory backpressure for the UI boundary; the
//! orchestrator's regular fetch paths do not consult it.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::cache::store::{read_timestamp, write_timestamp, KeyValueStore, REFRESH_KEY};
use crate::clock::Clock;

/// Cooldown tracker for manual refreshes
#[derive(Debug, Clone)]
pub struct RefreshGovernor {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
}

impl RefreshGovernor {
    /// Creates a governor allowing one refresh per `cooldown`
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, cooldown: Duration) -> Self {
        Self {
            store,
            clock,
            cooldown,
        }
    }

    /// True if no refresh is on record or the cooldown has passed
    pub fn can_refresh(&self) -> bool {
        self.retry_after().is_none()
    }

    /// Records a refresh happening now
    pub fn record_refresh(&self) {
        write_timestamp(self.store.as_ref(), REFRESH_KEY, self.clock.now());
    }

    /// When the last refresh was recorded
    pub fn last_refresh_at(&self) -> Option<DateTime<Utc>> {
        read_timestamp(self.store.as_ref(), REFRESH_KEY)
    }

    /// How long until the next refresh is allowed, or `None` if allowed now
    pub fn retry_after(&self) -> Option<Duration> {
        let last = self.last_refresh_at()?;
        let elapsed = self.clock.now() - last;
        if elapsed >= self.cooldown {
            None
        } else {
            Some(self.cooldown - elapsed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn create_governor() -> (RefreshGovernor, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let governor = RefreshGovernor::new(store, clock.clone(), Duration::minutes(5));
        (governor, clock)
    }

    #[test]
    fn test_first_refresh_is_allowed() {
        let (governor, _) = create_governor();
        assert!(governor.can_refresh());
        assert!(governor.last_refresh_at().is_none());
    }

    #[test]
    fn test_refresh_blocked_during_cooldown() {
        let (governor, clock) = create_governor();
        governor.record_refresh();

        assert!(!governor.can_refresh());
        clock.advance(Duration::minutes(4));
        assert!(!governor.can_refresh());
        assert_eq!(governor.retry_after(), Some(Duration::minutes(1)));
    }

    #[test]
    fn test_refresh_allowed_once_cooldown_passes() {
        let (governor, clock) = create_governor();
        governor.record_refresh();

        clock.advance(Duration::minutes(5));
        assert!(governor.can_refresh());
        assert!(governor.retry_after().is_none());
    }

    #[test]
    fn test_each_refresh_restarts_cooldown() {
        let (governor, clock) = create_governor();
        governor.record_refresh();
        clock.advance(Duration::minutes(6));
        governor.record_refresh();

        clock.advance(Duration::minutes(2));
        assert!(!governor.can_refresh());
        // State is kept, never deleted
        assert!(governor.last_refresh_at().is_some());
    }
}
