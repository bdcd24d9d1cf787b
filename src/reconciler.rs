//! # Launch Reconciliation
//!
//! On every launch the persisted wakeup handle is matched against what the host
//! registry still knows about, and the launch is classified:
//!
//! | persisted handle | registry   | launched by wakeup | state              |
//! |------------------|------------|--------------------|--------------------|
//! | none             | -          | no                 | `Idle`             |
//! | present          | valid      | no                 | `CountdownPending` |
//! | present          | not found  | no                 | `Idle` (key wiped) |
//! | any              | any        | yes                | `JustFired`        |
//!
//! A fired alarm is no longer registered, so the "launched by wakeup" column
//! always wins.

use crate::store::{PersistentStore, PERSIST_WAKEUP};
use crate::wakeup::{WakeupEvent, WakeupHandle, WakeupRegistry};
use thiserror::Error;
use tracing::{info, warn};

/// Which screen the app should open on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchState {
    /// Nothing scheduled: prayer/tea menu
    Idle,
    /// A tea countdown is still running on the host
    CountdownPending(WakeupHandle),
    /// The tea with this selection payload has finished steeping
    JustFired(i32),
}

/// The persisted handle is unknown to the registry (fired while the app was
/// closed, cancelled elsewhere, or the registry could not be queried).
#[derive(Error, Debug)]
#[error("wakeup handle {0} is no longer registered")]
pub struct StaleHandleError(pub WakeupHandle);

/// Classify this launch and clean up stale persisted state.
pub fn reconcile<S, W>(store: &mut S, registry: &W) -> LaunchState
where
    S: PersistentStore,
    W: WakeupRegistry,
{
    let mut state = LaunchState::Idle;

    if let Some(raw) = store.read_int(PERSIST_WAKEUP) {
        match WakeupHandle::from_raw(raw) {
            Some(handle) => match check_handle(registry, handle) {
                Ok(()) => state = LaunchState::CountdownPending(handle),
                Err(err) => {
                    info!(%err, "dropping stale wakeup handle");
                    forget_handle(store);
                }
            },
            None => {
                warn!(raw, "persisted wakeup handle is not a valid id");
                forget_handle(store);
            }
        }
    }

    if let Some(event) = registry.launch_event() {
        state = fired(store, event);
    }

    info!(?state, "launch reconciled");
    state
}

/// Transition for a fired alarm, at launch or while running.
pub fn fired<S: PersistentStore>(store: &mut S, event: WakeupEvent) -> LaunchState {
    info!(handle = %event.handle, payload = event.payload, "wakeup fired");
    forget_handle(store);
    LaunchState::JustFired(event.payload)
}

fn check_handle<W: WakeupRegistry>(
    registry: &W,
    handle: WakeupHandle,
) -> Result<(), StaleHandleError> {
    match registry.query(handle) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(StaleHandleError(handle)),
        Err(err) => {
            warn!(%handle, %err, "wakeup query failed, treating as not found");
            Err(StaleHandleError(handle))
        }
    }
}

fn forget_handle<S: PersistentStore>(store: &mut S) {
    if let Err(err) = store.delete(PERSIST_WAKEUP) {
        warn!(%err, "could not delete persisted wakeup handle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::wakeup::SimulatedWakeups;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 24, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_nothing_persisted_is_idle() {
        let mut store = MemoryStore::new();
        let wakeups = SimulatedWakeups::new();
        assert_eq!(reconcile(&mut store, &wakeups), LaunchState::Idle);
    }

    #[test]
    fn test_valid_handle_is_pending() {
        let mut store = MemoryStore::new();
        let mut wakeups = SimulatedWakeups::new();
        let id = wakeups.schedule(t0() + Duration::minutes(4), 3);
        store.write_int(PERSIST_WAKEUP, id).unwrap();

        let state = reconcile(&mut store, &wakeups);
        assert_eq!(
            state,
            LaunchState::CountdownPending(WakeupHandle::from_raw(id).unwrap())
        );
        assert_eq!(store.read_int(PERSIST_WAKEUP), Some(id));
    }

    #[test]
    fn test_stale_handle_is_removed() {
        let mut store = MemoryStore::new();
        let wakeups = SimulatedWakeups::new();
        store.write_int(PERSIST_WAKEUP, 42).unwrap();

        assert_eq!(reconcile(&mut store, &wakeups), LaunchState::Idle);
        assert!(!store.exists(PERSIST_WAKEUP));
    }

    #[test]
    fn test_invalid_persisted_id_is_removed() {
        let mut store = MemoryStore::new();
        let wakeups = SimulatedWakeups::new();
        store.write_int(PERSIST_WAKEUP, -1).unwrap();

        assert_eq!(reconcile(&mut store, &wakeups), LaunchState::Idle);
        assert!(!store.exists(PERSIST_WAKEUP));
    }

    #[test]
    fn test_query_failure_fails_safe_to_idle() {
        let mut store = MemoryStore::new();
        let mut wakeups = SimulatedWakeups::new();
        let id = wakeups.schedule(t0(), 0);
        store.write_int(PERSIST_WAKEUP, id).unwrap();
        wakeups.set_unavailable(true);

        assert_eq!(reconcile(&mut store, &wakeups), LaunchState::Idle);
        assert!(!store.exists(PERSIST_WAKEUP));
    }

    #[test]
    fn test_fire_takes_precedence_over_pending() {
        let mut store = MemoryStore::new();
        let mut wakeups = SimulatedWakeups::new();
        let id = wakeups.schedule(t0() + Duration::minutes(2), 1);
        store.write_int(PERSIST_WAKEUP, id).unwrap();

        let event = wakeups.boot(t0() + Duration::minutes(2)).unwrap();
        assert_eq!(event.handle.raw(), id);

        assert_eq!(reconcile(&mut store, &wakeups), LaunchState::JustFired(1));
        assert!(!store.exists(PERSIST_WAKEUP));
    }

    #[test]
    fn test_fire_precedence_with_registry_still_reporting_handle() {
        // Host reports the launch event but a lagging registry still lists the alarm
        struct Lagging(SimulatedWakeups, WakeupEvent);
        impl WakeupRegistry for Lagging {
            fn schedule(&mut self, fire_at: DateTime<Utc>, payload: i32) -> i32 {
                self.0.schedule(fire_at, payload)
            }
            fn query(
                &self,
                handle: WakeupHandle,
            ) -> Result<Option<DateTime<Utc>>, crate::wakeup::HostError> {
                self.0.query(handle)
            }
            fn cancel(&mut self, handle: WakeupHandle) {
                self.0.cancel(handle)
            }
            fn launch_event(&self) -> Option<WakeupEvent> {
                Some(self.1)
            }
        }

        let mut store = MemoryStore::new();
        let mut inner = SimulatedWakeups::new();
        let id = inner.schedule(t0(), 5);
        let handle = WakeupHandle::from_raw(id).unwrap();
        store.write_int(PERSIST_WAKEUP, id).unwrap();
        let registry = Lagging(inner, WakeupEvent { handle, payload: 5 });

        assert_eq!(reconcile(&mut store, &registry), LaunchState::JustFired(5));
        assert!(!store.exists(PERSIST_WAKEUP));
    }

    #[test]
    fn test_fired_while_running() {
        let mut store = MemoryStore::new();
        store.write_int(PERSIST_WAKEUP, 9).unwrap();
        let event = WakeupEvent {
            handle: WakeupHandle::from_raw(9).unwrap(),
            payload: 6,
        };
        assert_eq!(fired(&mut store, event), LaunchState::JustFired(6));
        assert!(!store.exists(PERSIST_WAKEUP));
    }
}
