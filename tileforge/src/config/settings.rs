//! Settings structs for the configuration file.
//!
//! Network and sample sections map straight onto the component config
//! types; storage and logging only matter to the binary.

use std::path::PathBuf;

use crate::provider::{ApiConfig, OrderConfig, SearchConfig};
use crate::samples::SampleConfig;
use crate::targets::IntervalResolver;

/// Default root of dataset directories.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default directory holding target collections.
pub const DEFAULT_TARGETS_DIR: &str = "targets";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "tileforge.log";

/// Complete configuration loaded from an INI file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// `[api]`
    pub api: ApiConfig,
    /// `[search]`, search filter keys
    pub search: SearchConfig,
    /// `[search]`, interval keys
    pub interval: IntervalResolver,
    /// `[order]`
    pub order: OrderConfig,
    /// `[samples]`
    pub samples: SampleConfig,
    /// `[storage]`
    pub storage: StorageSettings,
    /// `[logging]`
    pub logging: LoggingSettings,
}

/// Where datasets and targets live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub targets_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            targets_dir: PathBuf::from(DEFAULT_TARGETS_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// File name inside the dataset's `logs/` directory.
    pub file: String,
    /// Mirror log output to stdout.
    pub stdout: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: DEFAULT_LOG_FILE.to_string(),
            stdout: true,
        }
    }
}
