//! # Wakeup Alarm Registry
//!
//! The host can schedule "wakeup" alarms that relaunch the app at a given
//! instant even when it is not running. Each alarm carries a small integer
//! payload (here: the tea index) that is handed back when it fires.
//!
//! Host conventions mirrored here:
//! - `schedule` returns a positive id on success and a negative status code on
//!   failure; [`WakeupHandle::from_raw`] turns that into an `Option`
//! - a fired alarm is no longer registered, so querying its handle reports
//!   "not found"
//! - when an alarm relaunches the app, the launch reason exposes the fired
//!   handle and payload
//!
//! [`SimulatedWakeups`] implements the registry for tests and for the desktop
//! binary, which saves it to a JSON file between runs.

use crate::store::{write_atomically, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::{fmt, fs, io};
use thiserror::Error;
use tracing::{debug, info};

/// Too many alarms outstanding for this app.
pub const E_OUT_OF_RESOURCES: i32 = -7;
/// Fire time closer than [`MIN_SPACING_SECS`] to another alarm of this app.
pub const E_RANGE: i32 = -8;

/// Alarms the host keeps per app.
pub const MAX_WAKEUPS: usize = 8;

/// Minimum spacing the host enforces between two alarms of one app.
pub const MIN_SPACING_SECS: i64 = 60;

/// Opaque, strictly positive identifier of a scheduled alarm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WakeupHandle(i32);

impl WakeupHandle {
    /// Interpret a raw host id; non-positive values are failures.
    pub fn from_raw(raw: i32) -> Option<WakeupHandle> {
        (raw > 0).then_some(WakeupHandle(raw))
    }

    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for WakeupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fired alarm as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WakeupEvent {
    pub handle: WakeupHandle,
    /// Payload given to `schedule`
    pub payload: i32,
}

/// Registry query failure. Callers treat it like "not found".
#[derive(Error, Debug)]
pub enum HostError {
    #[error("wakeup registry unavailable")]
    Unavailable,
}

/// Host wakeup alarm service.
pub trait WakeupRegistry {
    /// Schedule an alarm at `fire_at`. Returns the new id, or a value `<= 0` on failure.
    fn schedule(&mut self, fire_at: DateTime<Utc>, payload: i32) -> i32;

    /// Fire time of `handle`, `None` if it is not (or no longer) scheduled.
    fn query(&self, handle: WakeupHandle) -> Result<Option<DateTime<Utc>>, HostError>;

    fn cancel(&mut self, handle: WakeupHandle);

    /// The alarm that caused this process launch, if any.
    fn launch_event(&self) -> Option<WakeupEvent>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Alarm {
    fire_at: DateTime<Utc>,
    payload: i32,
}

fn default_next_id() -> i32 {
    1
}

fn default_capacity() -> usize {
    MAX_WAKEUPS
}

/// In-process registry with the host's limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulatedWakeups {
    alarms: BTreeMap<i32, Alarm>,
    #[serde(default = "default_next_id")]
    next_id: i32,
    #[serde(default = "default_capacity")]
    capacity: usize,
    #[serde(skip)]
    launch: Option<WakeupEvent>,
    #[serde(skip)]
    unavailable: bool,
}

impl Default for SimulatedWakeups {
    fn default() -> Self {
        SimulatedWakeups {
            alarms: BTreeMap::new(),
            next_id: default_next_id(),
            capacity: default_capacity(),
            launch: None,
            unavailable: false,
        }
    }
}

impl SimulatedWakeups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry accepting at most `capacity` outstanding alarms.
    pub fn with_capacity(capacity: usize) -> Self {
        SimulatedWakeups {
            capacity,
            ..Self::default()
        }
    }

    /// Load a saved registry; a missing file yields an empty one.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        match fs::read(&path) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(self)?;
        write_atomically(path.as_ref(), &data)?;
        Ok(())
    }

    /// Simulate a process launch at `now`.
    ///
    /// If an alarm is due, the earliest one is consumed and becomes the launch
    /// event. Any other due alarms stay registered for [`Self::fire_due`].
    pub fn boot(&mut self, now: DateTime<Utc>) -> Option<WakeupEvent> {
        self.launch = self.pop_due(now);
        if let Some(event) = self.launch {
            info!(handle = %event.handle, payload = event.payload, "launched by wakeup");
        }
        self.launch
    }

    /// Remove and return every alarm due at `now`, earliest first.
    pub fn fire_due(&mut self, now: DateTime<Utc>) -> Vec<WakeupEvent> {
        std::iter::from_fn(|| self.pop_due(now)).collect()
    }

    /// Make every subsequent query fail.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Number of outstanding alarms.
    pub fn pending(&self) -> usize {
        self.alarms.len()
    }

    fn pop_due(&mut self, now: DateTime<Utc>) -> Option<WakeupEvent> {
        let (&id, _) = self
            .alarms
            .iter()
            .filter(|(_, alarm)| alarm.fire_at <= now)
            .min_by_key(|(_, alarm)| alarm.fire_at)?;
        let alarm = self.alarms.remove(&id)?;
        let handle = WakeupHandle::from_raw(id)?;
        Some(WakeupEvent {
            handle,
            payload: alarm.payload,
        })
    }
}

impl WakeupRegistry for SimulatedWakeups {
    fn schedule(&mut self, fire_at: DateTime<Utc>, payload: i32) -> i32 {
        if self.alarms.len() >= self.capacity {
            debug!(capacity = self.capacity, "wakeup rejected: out of resources");
            return E_OUT_OF_RESOURCES;
        }
        let too_close = self
            .alarms
            .values()
            .any(|alarm| (alarm.fire_at - fire_at).num_seconds().abs() < MIN_SPACING_SECS);
        if too_close {
            debug!(%fire_at, "wakeup rejected: too close to another alarm");
            return E_RANGE;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.alarms.insert(id, Alarm { fire_at, payload });
        debug!(id, %fire_at, payload, "wakeup scheduled");
        id
    }

    fn query(&self, handle: WakeupHandle) -> Result<Option<DateTime<Utc>>, HostError> {
        if self.unavailable {
            return Err(HostError::Unavailable);
        }
        Ok(self.alarms.get(&handle.raw()).map(|alarm| alarm.fire_at))
    }

    fn cancel(&mut self, handle: WakeupHandle) {
        if self.alarms.remove(&handle.raw()).is_some() {
            debug!(%handle, "wakeup cancelled");
        }
    }

    fn launch_event(&self) -> Option<WakeupEvent> {
        self.launch
    }
}
