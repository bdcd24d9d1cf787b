//! # Tea Scheduling
//!
//! Selecting a tea asks the host for a wakeup `steep_minutes` from now, tagged
//! with the tea's index so the fired event tells which tea is ready. The
//! resulting handle is persisted so a later launch can find the countdown.

use crate::store::{PersistentStore, StoreError, PERSIST_WAKEUP};
use crate::wakeup::{WakeupHandle, WakeupRegistry};
use crate::TeaInfo;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

/// Why a tea could not be scheduled.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// The host refused the alarm (status code `<= 0`)
    #[error("host rejected wakeup (status {code})")]
    HostRejected { code: i32 },

    /// Selection does not name a tea
    #[error("no tea at index {0}")]
    UnknownTea(usize),

    /// Handle could not be persisted; the host alarm was cancelled again
    #[error("could not persist wakeup handle: {0}")]
    Store(#[from] StoreError),
}

/// The teas offered by default, with steeping times in minutes.
pub fn default_teas() -> Vec<TeaInfo> {
    vec![
        TeaInfo::new("Green Tea", 1),
        TeaInfo::new("Black Tea", 2),
        TeaInfo::new("Oolong Tea", 3),
        TeaInfo::new("Darjeeling", 4),
        TeaInfo::new("Herbal Tea", 5),
        TeaInfo::new("Mate Tea", 6),
        TeaInfo::new("Chai Tea", 10),
    ]
}

/// Look up the tea a fired wakeup payload refers to.
pub fn tea_for_payload(teas: &[TeaInfo], payload: i32) -> Option<&TeaInfo> {
    usize::try_from(payload).ok().and_then(|index| teas.get(index))
}

/// Schedule the steeping alarm for `teas[selection]`, starting at `now`.
///
/// On success the new handle replaces any persisted one. It does not cancel a
/// previously scheduled alarm: cancel the running countdown first.
///
/// On failure nothing is persisted and the store is left exactly as it was.
pub fn schedule_tea<S, W>(
    store: &mut S,
    registry: &mut W,
    teas: &[TeaInfo],
    selection: usize,
    now: DateTime<Utc>,
) -> Result<WakeupHandle, ScheduleError>
where
    S: PersistentStore,
    W: WakeupRegistry,
{
    let tea = teas
        .get(selection)
        .ok_or(ScheduleError::UnknownTea(selection))?;
    let payload = i32::try_from(selection).map_err(|_| ScheduleError::UnknownTea(selection))?;
    let fire_at = now + Duration::minutes(i64::from(tea.steep_minutes));

    let code = registry.schedule(fire_at, payload);
    let handle = WakeupHandle::from_raw(code).ok_or_else(|| {
        warn!(tea = %tea.name, code, "wakeup could not be scheduled");
        ScheduleError::HostRejected { code }
    })?;

    if let Err(err) = store.write_int(PERSIST_WAKEUP, handle.raw()) {
        registry.cancel(handle);
        return Err(err.into());
    }

    info!(tea = %tea.name, %handle, %fire_at, "tea scheduled");
    Ok(handle)
}
