//! # Steeping Countdown
//!
//! While a tea is steeping the countdown screen shows the seconds left until the
//! alarm fires. The remaining time is always derived from the fire time the host
//! recorded for the alarm, never from a local counter, so it stays correct after
//! the app was closed and relaunched.
//!
//! The ticker does not end the countdown when it reaches zero: the fired wakeup
//! does that, and until it arrives a slightly negative value may be shown.

use crate::store::{PersistentStore, PERSIST_WAKEUP};
use crate::wakeup::{WakeupHandle, WakeupRegistry};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Tick period of the countdown screen, in milliseconds.
pub const TICK_MILLIS: u64 = 1000;

#[derive(Debug, Default, Clone)]
pub struct CountdownTicker {
    handle: Option<WakeupHandle>,
    fire_at: Option<DateTime<Utc>>,
    queried: bool,
}

impl CountdownTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start showing the countdown for `handle`. The fire time is looked up on
    /// the first tick.
    pub fn enter(&mut self, handle: WakeupHandle) {
        self.handle = Some(handle);
        self.fire_at = None;
        self.queried = false;
    }

    pub fn handle(&self) -> Option<WakeupHandle> {
        self.handle
    }

    /// Cached fire time, once known.
    pub fn fire_at(&self) -> Option<DateTime<Utc>> {
        self.fire_at
    }

    /// Seconds until the alarm fires, `None` if there is no countdown or the
    /// registry could not tell its fire time.
    pub fn tick<W: WakeupRegistry>(&mut self, registry: &W, now: DateTime<Utc>) -> Option<i64> {
        let handle = self.handle?;
        if self.fire_at.is_none() && !self.queried {
            self.queried = true;
            self.fire_at = match registry.query(handle) {
                Ok(fire_at) => fire_at,
                Err(err) => {
                    warn!(%handle, %err, "could not read wakeup fire time");
                    None
                }
            };
            debug!(%handle, fire_at = ?self.fire_at, "countdown fire time cached");
        }
        self.fire_at.map(|fire_at| (fire_at - now).num_seconds())
    }

    /// Cancel the pending alarm and forget it.
    ///
    /// Returns `false` when there was nothing to cancel; calling it again is a no-op.
    pub fn cancel<S, W>(&mut self, store: &mut S, registry: &mut W) -> bool
    where
        S: PersistentStore,
        W: WakeupRegistry,
    {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        registry.cancel(handle);
        if let Err(err) = store.delete(PERSIST_WAKEUP) {
            warn!(%err, "could not delete persisted wakeup handle");
        }
        self.fire_at = None;
        self.queried = false;
        info!(%handle, "countdown cancelled");
        true
    }

    /// Leave the countdown screen while the alarm keeps running.
    pub fn back(&mut self) {
        if let Some(handle) = self.handle {
            debug!(%handle, "countdown continues in background");
        }
        self.fire_at = None;
        self.queried = false;
    }

    /// Drop in-memory state after the alarm fired.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::wakeup::{HostError, SimulatedWakeups, WakeupEvent};
    use chrono::{Duration, TimeZone};
    use std::cell::Cell;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 24, 8, 0, 0).unwrap()
    }

    /// Counts registry calls the ticker makes.
    #[derive(Default)]
    struct Counting {
        inner: SimulatedWakeups,
        queries: Cell<usize>,
        cancels: usize,
    }

    impl WakeupRegistry for Counting {
        fn schedule(&mut self, fire_at: DateTime<Utc>, payload: i32) -> i32 {
            self.inner.schedule(fire_at, payload)
        }
        fn query(&self, handle: WakeupHandle) -> Result<Option<DateTime<Utc>>, HostError> {
            self.queries.set(self.queries.get() + 1);
            self.inner.query(handle)
        }
        fn cancel(&mut self, handle: WakeupHandle) {
            self.cancels += 1;
            self.inner.cancel(handle)
        }
        fn launch_event(&self) -> Option<WakeupEvent> {
            self.inner.launch_event()
        }
    }

    fn scheduled(registry: &mut Counting, store: &mut MemoryStore) -> WakeupHandle {
        let id = registry.schedule(t0() + Duration::minutes(3), 2);
        store.write_int(PERSIST_WAKEUP, id).unwrap();
        WakeupHandle::from_raw(id).unwrap()
    }

    #[test]
    fn test_tick_counts_down_from_fire_time() {
        let mut registry = Counting::default();
        let mut store = MemoryStore::new();
        let mut ticker = CountdownTicker::new();
        ticker.enter(scheduled(&mut registry, &mut store));

        assert_eq!(ticker.tick(&registry, t0()), Some(180));
        assert_eq!(ticker.tick(&registry, t0() + Duration::seconds(1)), Some(179));
        assert_eq!(ticker.tick(&registry, t0() + Duration::seconds(60)), Some(120));
        assert_eq!(registry.queries.get(), 1, "fire time is queried once");
    }

    #[test]
    fn test_tick_may_go_negative() {
        let mut registry = Counting::default();
        let mut store = MemoryStore::new();
        let mut ticker = CountdownTicker::new();
        ticker.enter(scheduled(&mut registry, &mut store));

        assert_eq!(ticker.tick(&registry, t0() + Duration::seconds(182)), Some(-2));
    }

    #[test]
    fn test_tick_without_countdown() {
        let registry = Counting::default();
        let mut ticker = CountdownTicker::new();
        assert_eq!(ticker.tick(&registry, t0()), None);
        assert_eq!(registry.queries.get(), 0);
    }

    #[test]
    fn test_tick_with_unknown_fire_time() {
        let registry = Counting::default();
        let mut ticker = CountdownTicker::new();
        ticker.enter(WakeupHandle::from_raw(5).unwrap());
        assert_eq!(ticker.tick(&registry, t0()), None);
        assert_eq!(ticker.tick(&registry, t0()), None);
        assert_eq!(registry.queries.get(), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut registry = Counting::default();
        let mut store = MemoryStore::new();
        let mut ticker = CountdownTicker::new();
        let handle = scheduled(&mut registry, &mut store);
        ticker.enter(handle);

        assert!(ticker.cancel(&mut store, &mut registry));
        assert!(!ticker.cancel(&mut store, &mut registry));

        assert_eq!(registry.cancels, 1);
        assert!(!store.exists(PERSIST_WAKEUP));
        assert_eq!(registry.inner.query(handle).unwrap(), None);
        assert_eq!(ticker.handle(), None);
        assert_eq!(ticker.fire_at(), None);
    }

    #[test]
    fn test_back_keeps_alarm() {
        let mut registry = Counting::default();
        let mut store = MemoryStore::new();
        let mut ticker = CountdownTicker::new();
        let handle = scheduled(&mut registry, &mut store);
        ticker.enter(handle);
        ticker.tick(&registry, t0());

        ticker.back();

        assert_eq!(ticker.handle(), Some(handle));
        assert_eq!(store.read_int(PERSIST_WAKEUP), Some(handle.raw()));
        assert!(registry.inner.query(handle).unwrap().is_some());
        assert_eq!(registry.cancels, 0);
    }
}
