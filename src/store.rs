//! # Persistent Key/Value Store
//!
//! The watch host offers a tiny persistent store keyed by integers. The app only
//! ever uses one key, [`PERSIST_WAKEUP`], to remember the outstanding wakeup
//! handle across launches.
//!
//! Two implementations are provided:
//! - [`MemoryStore`]: process-local map, used by tests
//! - [`JsonFileStore`]: JSON file rewritten on every mutation, used by the desktop
//!   binary so a "relaunch" sees what the previous run persisted

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;
use tracing::{debug, warn};

/// Key holding the current wakeup handle.
pub const PERSIST_WAKEUP: u32 = 0;

/// Errors from store backends that can fail.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store IO: {0}")]
    Io(#[from] io::Error),

    #[error("store encoding: {0}")]
    Json(#[from] serde_json::Error),
}

/// Host persistent integer store.
pub trait PersistentStore {
    fn exists(&self, key: u32) -> bool;

    /// Value under `key`, `None` if absent.
    fn read_int(&self, key: u32) -> Option<i32>;

    /// Write `value`, replacing any previous one.
    fn write_int(&mut self, key: u32, value: i32) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: u32) -> Result<(), StoreError>;
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<u32, i32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentStore for MemoryStore {
    fn exists(&self, key: u32) -> bool {
        self.values.contains_key(&key)
    }

    fn read_int(&self, key: u32) -> Option<i32> {
        self.values.get(&key).copied()
    }

    fn write_int(&mut self, key: u32, value: i32) -> Result<(), StoreError> {
        self.values.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: u32) -> Result<(), StoreError> {
        self.values.remove(&key);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    values: BTreeMap<u32, i32>,
}

/// File-backed store.
///
/// The whole map is small, so it is held in memory and the file is rewritten
/// after each mutation.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    contents: StoreFile,
}

impl JsonFileStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty. A corrupt file is logged and also starts
    /// empty; the next write replaces it.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let contents = match fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "corrupt store file, starting empty");
                StoreFile::default()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => StoreFile::default(),
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable store file, starting empty");
                StoreFile::default()
            }
        };
        JsonFileStore { path, contents }
    }

    fn flush(&self) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(&self.contents)?;
        write_atomically(&self.path, &data)?;
        debug!(path = %self.path.display(), "store flushed");
        Ok(())
    }
}

impl PersistentStore for JsonFileStore {
    fn exists(&self, key: u32) -> bool {
        self.contents.values.contains_key(&key)
    }

    fn read_int(&self, key: u32) -> Option<i32> {
        self.contents.values.get(&key).copied()
    }

    fn write_int(&mut self, key: u32, value: i32) -> Result<(), StoreError> {
        let previous = self.contents.values.insert(key, value);
        if let Err(err) = self.flush() {
            self.restore(key, previous);
            return Err(err);
        }
        Ok(())
    }

    fn delete(&mut self, key: u32) -> Result<(), StoreError> {
        if let Some(previous) = self.contents.values.remove(&key) {
            if let Err(err) = self.flush() {
                self.restore(key, Some(previous));
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Replace `path` with `data` through a sibling temporary file, so readers see
/// either the old or the new contents and never a truncated file.
pub(crate) fn write_atomically(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, data)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

impl JsonFileStore {
    /// Undo an in-memory change whose flush failed.
    fn restore(&mut self, key: u32, previous: Option<i32>) {
        match previous {
            Some(value) => self.contents.values.insert(key, value),
            None => self.contents.values.remove(&key),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_basics() {
        let mut store = MemoryStore::new();
        assert!(!store.exists(PERSIST_WAKEUP));
        store.write_int(PERSIST_WAKEUP, 7).unwrap();
        assert_eq!(store.read_int(PERSIST_WAKEUP), Some(7));
        store.write_int(PERSIST_WAKEUP, 9).unwrap();
        assert_eq!(store.read_int(PERSIST_WAKEUP), Some(9));
        store.delete(PERSIST_WAKEUP).unwrap();
        assert!(!store.exists(PERSIST_WAKEUP));
        store.delete(PERSIST_WAKEUP).unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = JsonFileStore::open(&path);
        store.write_int(PERSIST_WAKEUP, 3).unwrap();
        drop(store);

        let mut reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.read_int(PERSIST_WAKEUP), Some(3));
        reopened.delete(PERSIST_WAKEUP).unwrap();

        let emptied = JsonFileStore::open(&path);
        assert!(!emptied.exists(PERSIST_WAKEUP));
    }

    #[test]
    fn test_file_store_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"{not json").unwrap();

        let mut store = JsonFileStore::open(&path);
        assert!(!store.exists(PERSIST_WAKEUP));
        store.write_int(PERSIST_WAKEUP, 1).unwrap();
        assert_eq!(JsonFileStore::open(&path).read_int(PERSIST_WAKEUP), Some(1));
    }

    #[test]
    fn test_file_store_replaces_file_in_one_step() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let tmp = dir.path().join("store.json.tmp");
        // Leftover of a write interrupted before the rename
        fs::write(&tmp, b"{\"values\":{\"0\":").unwrap();

        let mut store = JsonFileStore::open(&path);
        store.write_int(PERSIST_WAKEUP, 4).unwrap();
        assert!(!tmp.exists(), "temporary file is renamed into place");
        assert_eq!(JsonFileStore::open(&path).read_int(PERSIST_WAKEUP), Some(4));

        fs::write(&tmp, b"{\"values\":{\"0\":").unwrap();
        assert_eq!(
            JsonFileStore::open(&path).read_int(PERSIST_WAKEUP),
            Some(4),
            "an interrupted write leaves the previous contents intact"
        );
    }

    #[test]
    fn test_file_store_write_error() {
        let mut store = JsonFileStore::open("/nonexistent/dir/store.json");
        let err = store.write_int(PERSIST_WAKEUP, 1).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(!store.exists(PERSIST_WAKEUP));
    }
}
