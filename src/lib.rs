//! # Salah & Tea Core Library
//!
//! This library holds the schedule-resolution and wakeup-reconciliation core of a
//! wrist-worn companion app that shows the day's prayer times and runs a
//! tea-steeping countdown backed by the host's wakeup alarm service.
//!
//! ## Design Philosophy
//!
//! ### Host Agnostic
//! The watch host provides three things the core consumes but never reimplements:
//! - **A read-only resource blob** holding one [`Day`] record per day of the year
//! - **A persistent key/value store** holding the single outstanding wakeup handle
//! - **A wakeup alarm registry** that can relaunch the app when an alarm fires
//!
//! Each of these sits behind a small trait ([`store::PersistentStore`],
//! [`wakeup::WakeupRegistry`]) or a plain byte container
//! ([`schedule::ScheduleTable`]), so every operation can be exercised in unit tests
//! without a simulated UI.
//!
//! ### Single Threaded
//! Everything is driven by one run loop: UI intents, the one-second countdown tick
//! and wakeup-fired events are dispatched serially. Nothing here locks or spawns.
//!
//! ### Data Flow
//! 1. **Launch**: resolve today's [`Day`] → reconcile the persisted handle → pick a screen
//! 2. **Select**: schedule a wakeup for the chosen tea → persist handle → countdown
//! 3. **Tick**: remaining seconds derived from the alarm's recorded fire time
//! 4. **Fire**: delete handle → "tea is ready" screen + haptic pulse
//!
//! ## Core Types
//!
//! - [`Salah`]: a single prayer time (hour, minute)
//! - [`Day`]: the six prayer times of one calendar day, in fixed [`Prayer`] order
//! - [`TeaInfo`]: a tea variety and its steeping time

use serde::{Deserialize, Serialize};

// Module declarations
pub mod app;
pub mod calendar;
pub mod config;
pub mod countdown;
pub mod reconciler;
pub mod renderer;
pub mod resolver;
pub mod schedule;
pub mod store;
pub mod tea;
pub mod wakeup;

/// Number of prayer times stored per day.
pub const PRAYERS_PER_DAY: usize = 6;

/// A single prayer time in local wall-clock hours and minutes.
///
/// Field order matters: the derived ordering compares `hour` first, then `minute`,
/// which is exactly the "later in the day" relation the resolver needs.
///
/// # Example
/// ```
/// use salah_tea_lib::Salah;
///
/// let zuhr = Salah { hour: 12, minute: 15 };
/// assert!(zuhr.is_after(12, 14));
/// assert!(!zuhr.is_after(12, 15));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Salah {
    /// Hour of day, 0..=23
    pub hour: u8,
    /// Minute of hour, 0..=59
    pub minute: u8,
}

impl Salah {
    /// True if this time is strictly later than `hour:minute`.
    pub fn is_after(&self, hour: u32, minute: u32) -> bool {
        let (h, m) = (u32::from(self.hour), u32::from(self.minute));
        h > hour || (h == hour && m > minute)
    }
}

/// The six prayers of a day, in the order they are stored in a [`Day`] record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prayer {
    Fajr,
    Sunrise,
    Zuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// All prayers in storage order.
    pub const ALL: [Prayer; PRAYERS_PER_DAY] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Zuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    /// Position of this prayer inside a [`Day`] record.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Prayer> {
        Self::ALL.get(index).copied()
    }

    /// Label shown in the menu.
    pub fn name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Sunrise => "Sunrise",
            Prayer::Zuhr => "Zuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Magrib",
            Prayer::Isha => "Isha",
        }
    }
}

/// Prayer times for one calendar day.
///
/// Binary layout inside the schedule resource: 12 bytes, one `(hour, minute)`
/// byte pair per prayer in [`Prayer`] order. Entries are assumed to be
/// non-decreasing; the table is trusted and not validated.
///
/// # Example
/// ```
/// use salah_tea_lib::{Day, Prayer};
///
/// let bytes = [5, 0, 6, 30, 12, 15, 15, 45, 18, 10, 19, 30];
/// let day = Day::from_bytes(&bytes);
/// assert_eq!(day.salah(Prayer::Asr).hour, 15);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub salahs: [Salah; PRAYERS_PER_DAY],
}

impl Day {
    /// Size of one encoded record in bytes.
    pub const SIZE: usize = PRAYERS_PER_DAY * 2;

    pub fn from_bytes(bytes: &[u8; Day::SIZE]) -> Self {
        let mut salahs = [Salah { hour: 0, minute: 0 }; PRAYERS_PER_DAY];
        for (salah, pair) in salahs.iter_mut().zip(bytes.chunks_exact(2)) {
            *salah = Salah {
                hour: pair[0],
                minute: pair[1],
            };
        }
        Day { salahs }
    }

    pub fn to_bytes(&self) -> [u8; Day::SIZE] {
        let mut bytes = [0u8; Day::SIZE];
        for (pair, salah) in bytes.chunks_exact_mut(2).zip(self.salahs.iter()) {
            pair[0] = salah.hour;
            pair[1] = salah.minute;
        }
        bytes
    }

    pub fn salah(&self, prayer: Prayer) -> Salah {
        self.salahs[prayer.index()]
    }

    /// First prayer strictly later than `hour:minute`, or `None` once Isha has passed.
    pub fn next_after(&self, hour: u32, minute: u32) -> Option<Prayer> {
        Prayer::ALL
            .into_iter()
            .find(|prayer| self.salah(*prayer).is_after(hour, minute))
    }
}

/// A tea variety selectable for a countdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeaInfo {
    /// Short display name
    pub name: String,
    /// Minutes to steep this tea
    pub steep_minutes: u32,
}

impl TeaInfo {
    pub fn new(name: &str, steep_minutes: u32) -> Self {
        TeaInfo {
            name: name.to_string(),
            steep_minutes,
        }
    }
}
