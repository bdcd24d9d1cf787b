//! # Fixed Calendar Arithmetic
//!
//! The schedule resource is addressed by day-of-year computed from a fixed
//! month-length table. February always has 28 days: the table carries no leap
//! days, so the arithmetic here deliberately ignores them too. On a leap year,
//! Feb 29 addresses the same record as Mar 1 and every later date is shifted by
//! one record.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days per month, January first. Never mutated.
pub const MONTH_LENGTHS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Number of records a complete schedule table holds.
pub const DAYS_PER_YEAR: usize = 365;

/// Calendar date as displayed on the menu's date row.
///
/// `month` is 1-based (1 = January) and `day` is the day of the month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        CalendarDate { year, month, day }
    }

    /// Zero-based record index of this date (Jan 1 = 0, Dec 31 = 364).
    pub fn day_of_year(&self) -> usize {
        day_of_year(self.month, self.day)
    }

    /// The following calendar day under the fixed month table.
    ///
    /// Day overflows into the month, month overflows into the year.
    pub fn next_day(&self) -> CalendarDate {
        let mut next = *self;
        next.day += 1;
        if next.day > month_length(next.month) {
            next.day = 1;
            next.month += 1;
            if next.month > 12 {
                next.month = 1;
                next.year += 1;
            }
        }
        next
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        CalendarDate::new(date.year(), date.month(), date.day())
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{}", self.day, self.month, self.year)
    }
}

/// Length of a 1-based month in the fixed table.
///
/// Out-of-range months report zero so `next_day` always rolls over.
pub fn month_length(month: u32) -> u32 {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_LENGTHS.get(i as usize))
        .copied()
        .unwrap_or(0)
}

/// Zero-based day-of-year for a 1-based month and day of month.
///
/// Sums the lengths of every month strictly before `month`, subtracts one and
/// adds `day`, so January 1st addresses record 0.
pub fn day_of_year(month: u32, day: u32) -> usize {
    let before: u32 = MONTH_LENGTHS
        .iter()
        .take(month.saturating_sub(1) as usize)
        .sum();
    (before + day).saturating_sub(1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_of_year_bounds() {
        assert_eq!(day_of_year(1, 1), 0);
        assert_eq!(day_of_year(1, 31), 30);
        assert_eq!(day_of_year(2, 1), 31);
        assert_eq!(day_of_year(3, 1), 59);
        assert_eq!(day_of_year(12, 31), 364);
    }

    #[test]
    fn test_day_of_year_matches_cumulative_table() {
        let mut expected = 0;
        for month in 1..=12u32 {
            for day in 1..=month_length(month) {
                assert_eq!(
                    day_of_year(month, day),
                    expected,
                    "day_of_year({month}, {day}) should be {expected}"
                );
                expected += 1;
            }
        }
        assert_eq!(expected, DAYS_PER_YEAR);
    }

    #[test]
    fn test_next_day_within_month() {
        let date = CalendarDate::new(2025, 4, 14);
        assert_eq!(date.next_day(), CalendarDate::new(2025, 4, 15));
    }

    #[test]
    fn test_next_day_month_and_year_rollover() {
        assert_eq!(
            CalendarDate::new(2025, 4, 30).next_day(),
            CalendarDate::new(2025, 5, 1)
        );
        assert_eq!(
            CalendarDate::new(2025, 2, 28).next_day(),
            CalendarDate::new(2025, 3, 1)
        );
        assert_eq!(
            CalendarDate::new(2025, 12, 31).next_day(),
            CalendarDate::new(2026, 1, 1)
        );
    }

    #[test]
    fn test_leap_day_shares_march_first_record() {
        let leap_day = CalendarDate::new(2024, 2, 29);
        assert_eq!(leap_day.day_of_year(), day_of_year(3, 1));
        assert_eq!(leap_day.next_day(), CalendarDate::new(2024, 3, 1));
    }

    #[test]
    fn test_display_format() {
        assert_eq!(CalendarDate::new(2025, 3, 7).to_string(), "07.03.2025");
    }

    #[test]
    fn test_month_table_is_unchanged() {
        let _ = CalendarDate::new(2025, 12, 31).next_day();
        assert_eq!(MONTH_LENGTHS.iter().sum::<u32>(), 365);
        assert_eq!(MONTH_LENGTHS[1], 28);
    }
}
