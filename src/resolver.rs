//! # Day Resolution
//!
//! Turns the current wall-clock time into the [`Day`] record to display and the
//! prayer that comes next. Once Isha has passed the resolver moves to the next
//! calendar day and points at its Fajr.

use crate::calendar::CalendarDate;
use crate::schedule::{ScheduleTable, TableError};
use crate::{Day, Prayer};
use chrono::{NaiveDateTime, Timelike};
use tracing::debug;

/// Result of resolving the schedule for a moment in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Record of the day being displayed
    pub day: Day,
    /// Calendar date of `day` (the following day after rollover)
    pub date: CalendarDate,
    /// Next upcoming prayer within `day`
    pub next: Prayer,
    /// True when every prayer of the current date had already passed
    pub rolled_over: bool,
}

/// Resolve the day record and next prayer for the local wall-clock time `now`.
///
/// The scan only considers prayers strictly later than `now`; a prayer at
/// exactly the current minute counts as passed. After rollover the next day's
/// record is used as-is with Fajr as the next prayer, without scanning again.
///
/// # Errors
/// [`TableError::ResourceRange`] if the table has no record for the resolved date.
pub fn resolve(table: &ScheduleTable, now: NaiveDateTime) -> Result<Resolution, TableError> {
    let today = CalendarDate::from(now.date());
    let day = table.day(today.day_of_year())?;

    if let Some(next) = day.next_after(now.hour(), now.minute()) {
        return Ok(Resolution {
            day,
            date: today,
            next,
            rolled_over: false,
        });
    }

    let tomorrow = today.next_day();
    debug!(%today, %tomorrow, "past isha, resolving next day");
    Ok(Resolution {
        day: table.day(tomorrow.day_of_year())?,
        date: tomorrow,
        next: Prayer::Fajr,
        rolled_over: true,
    })
}
