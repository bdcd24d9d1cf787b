//! # Prayer Schedule Resource
//!
//! The yearly prayer schedule ships as a flat binary blob: [`Day`] records of
//! [`Day::SIZE`] bytes, one per day of the year, starting with January 1st.
//! The core only ever reads fixed-size ranges out of it.
//!
//! ## Error Handling
//!
//! Reads outside the blob fail with [`TableError::ResourceRange`] instead of
//! returning garbage. A truncated table is a packaging defect, so callers treat
//! this error as fatal.

use crate::Day;
use std::{fs, io, path::Path};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or reading the schedule resource.
#[derive(Error, Debug)]
pub enum TableError {
    /// Requested byte range is not inside the resource
    #[error("resource range {offset}+{len} outside table of {size} bytes")]
    ResourceRange {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Resource file could not be read
    #[error("schedule table IO: {0}")]
    Io(#[from] io::Error),
}

/// Read-only, byte-addressable schedule resource.
#[derive(Clone, Debug)]
pub struct ScheduleTable {
    bytes: Vec<u8>,
}

impl ScheduleTable {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        ScheduleTable { bytes }
    }

    /// Build a table from decoded records, mostly useful for tests and tooling.
    pub fn from_days(days: &[Day]) -> Self {
        let bytes = days.iter().flat_map(|day| day.to_bytes()).collect();
        ScheduleTable { bytes }
    }

    /// Load the resource blob from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let bytes = fs::read(&path)?;
        debug!(
            path = %path.as_ref().display(),
            size = bytes.len(),
            "loaded schedule table"
        );
        Ok(ScheduleTable { bytes })
    }

    /// Size of the resource in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of complete day records in the resource.
    pub fn day_count(&self) -> usize {
        self.bytes.len() / Day::SIZE
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn read_range(&self, offset: usize, len: usize) -> Result<&[u8], TableError> {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or(TableError::ResourceRange {
                offset,
                len,
                size: self.bytes.len(),
            })
    }

    /// Decode the record for a zero-based day-of-year.
    pub fn day(&self, day_of_year: usize) -> Result<Day, TableError> {
        let offset = day_of_year.saturating_mul(Day::SIZE);
        let range = self.read_range(offset, Day::SIZE)?;
        let mut record = [0u8; Day::SIZE];
        record.copy_from_slice(range);
        Ok(Day::from_bytes(&record))
    }
}
