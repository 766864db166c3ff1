//! Configuration System
//!
//! Layered configuration: built-in defaults, then the global file, then the
//! project file, then `SORDELLO__SECTION__KEY` environment overrides.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::environment::ENV_PREFIX;
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::workspace_config_path;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SordelloConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for SordelloConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            reconcile: ReconcileConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

/// Where the record store lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

/// `$XDG_DATA_HOME/sordello/store` or the platform equivalent
pub fn default_store_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "sordello")
        .map(|dirs| dirs.data_dir().join("store"))
        .unwrap_or_else(|| PathBuf::from(".sordello-store"))
}

/// Scan and parse settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Maximum concurrent parses per wave
    #[serde(default = "default_wave_size")]
    pub wave_size: usize,

    /// Modification times closer than this (seconds) count as unchanged
    #[serde(default = "default_mtime_tolerance")]
    pub mtime_tolerance_secs: f64,

    /// Copy changed main sets into the version history after each parse
    #[serde(default = "default_true")]
    pub auto_version_main: bool,

    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_wave_size() -> usize {
    4
}

fn default_mtime_tolerance() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            wave_size: default_wave_size(),
            mtime_tolerance_secs: default_mtime_tolerance(),
            auto_version_main: true,
            follow_symlinks: false,
        }
    }
}

/// Filesystem watch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiet period before a batch of changes is delivered
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Extra path patterns to ignore
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_debounce_ms() -> u64 {
    1000
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("storage: {0}")]
    Storage(String),

    #[error("reconcile: {0}")]
    Reconcile(String),

    #[error("watch: {0}")]
    Watch(String),
}

impl SordelloConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.storage.store_path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage(
                "store_path cannot be empty".to_string(),
            ));
        }
        if self.reconcile.wave_size == 0 {
            errors.push(ValidationError::Reconcile(
                "wave_size must be at least 1".to_string(),
            ));
        }
        if !(self.reconcile.mtime_tolerance_secs >= 0.0) {
            errors.push(ValidationError::Reconcile(format!(
                "mtime_tolerance_secs must be non-negative, got {}",
                self.reconcile.mtime_tolerance_secs
            )));
        }
        if self.watch.ignore_patterns.iter().any(|p| p.trim().is_empty()) {
            errors.push(ValidationError::Watch(
                "ignore_patterns cannot contain empty entries".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
