//! CLI runner for common setup and operations.
//!
//! Encapsulates configuration loading, dataset directory creation and
//! logging initialization so command handlers only run their phase.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::CliError;
use tileforge::config::ConfigFile;
use tileforge::logging::{init_logging, LoggingGuard};
use tileforge::provider::AsyncReqwestClient;

/// Timestamp format of a run directory.
const RUN_DIR_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Directories of one run: `<data_dir>/<id>/<timestamp>/{data,logs}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDirs {
    pub root: PathBuf,
    pub data: PathBuf,
    pub logs: PathBuf,
}

impl DatasetDirs {
    pub fn new(data_dir: &Path, id: &str, started: DateTime<Local>) -> Self {
        let root = data_dir
            .join(id)
            .join(started.format(RUN_DIR_FORMAT).to_string());
        Self {
            data: root.join("data"),
            logs: root.join("logs"),
            root,
        }
    }

    /// Creates the data and log directories.
    pub fn create(&self) -> Result<(), CliError> {
        for dir in [&self.data, &self.logs] {
            std::fs::create_dir_all(dir).map_err(|error| CliError::Dataset {
                path: dir.clone(),
                error,
            })?;
        }
        Ok(())
    }

    /// Data directory as a store path.
    pub fn data_path(&self) -> String {
        self.data.to_string_lossy().into_owned()
    }
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config: ConfigFile,
    dirs: DatasetDirs,
}

impl CliRunner {
    /// Loads the config, creates this run's dataset directory and starts
    /// logging into it.
    ///
    /// # Arguments
    ///
    /// * `config_path` - INI file; defaults apply when it does not exist
    /// * `data_dir` - Overrides `[storage] data_dir`
    /// * `id` - Dataset identifier, the first level under the data directory
    pub fn new(config_path: &Path, data_dir: Option<PathBuf>, id: &str) -> Result<Self, CliError> {
        let mut config = ConfigFile::load_from(config_path)?;
        if let Some(data_dir) = data_dir {
            config.storage.data_dir = data_dir;
        }

        let dirs = DatasetDirs::new(&config.storage.data_dir, id, Local::now());
        dirs.create()?;

        let logging_guard = init_logging(&dirs.logs, &config.logging.file, config.logging.stdout)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
            dirs,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn dirs(&self) -> &DatasetDirs {
        &self.dirs
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("TileForge v{}", tileforge::VERSION);
        info!(
            dataset = %self.dirs.root.display(),
            "TileForge CLI: {} command", command
        );
        info!(config = ?self.config, "Loaded configuration");
    }

    /// Creates the provider HTTP client from `[api]`.
    pub fn http_client(&self) -> Result<AsyncReqwestClient, CliError> {
        let api = &self.config.api;
        AsyncReqwestClient::with_timeout(api.api_key.clone(), api.timeout_secs)
            .map_err(CliError::Client)
    }

    /// Builds a multi-threaded tokio runtime for the network phases.
    pub fn runtime(&self) -> Result<tokio::runtime::Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)
    }
}
