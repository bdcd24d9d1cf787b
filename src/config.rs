//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the salah-tea.toml file.
//! It tells the desktop host where the schedule resource and the simulated
//! persistent state live, how fast the countdown ticks, and which teas are offered.

use crate::countdown::TICK_MILLIS;
use crate::tea::default_teas;
use crate::TeaInfo;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "salah-tea.toml";

/// Application configuration loaded from salah-tea.toml
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Prayer schedule resource
    pub schedule: ScheduleConfig,
    /// Where persisted state is kept between runs
    pub storage: StorageConfig,
    /// Countdown screen behaviour
    pub countdown: CountdownConfig,
    /// Teas offered, in menu order
    #[serde(default = "default_teas")]
    pub teas: Vec<TeaInfo>,
}

/// Prayer schedule resource configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Binary table with one 12-byte record per day of the year
    pub table_path: PathBuf,
}

/// Persistent state configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct StorageConfig {
    /// JSON file backing the persistent key/value store
    pub store_path: PathBuf,
    /// JSON file backing the simulated wakeup registry
    pub wakeups_path: PathBuf,
}

/// Countdown configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct CountdownConfig {
    /// Milliseconds between countdown refreshes
    pub tick_millis: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            schedule: ScheduleConfig {
                table_path: PathBuf::from("resources/salah.bin"),
            },
            storage: StorageConfig {
                store_path: PathBuf::from("salah-tea-store.json"),
                wakeups_path: PathBuf::from("salah-tea-wakeups.json"),
            },
            countdown: CountdownConfig {
                tick_millis: TICK_MILLIS,
            },
            teas: default_teas(),
        }
    }
}

impl Config {
    /// Load configuration from salah-tea.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(mut config) => {
                    if config.countdown.tick_millis == 0 {
                        warn!(path = %path.display(), default = TICK_MILLIS, "tick_millis must be non-zero, using default");
                        config.countdown.tick_millis = TICK_MILLIS;
                    }
                    info!(path = %path.display(), teas = config.teas.len(), "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config file format, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save current configuration to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }
}
