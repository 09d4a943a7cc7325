//! Service configuration
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Optional TOML file
//! 3. Environment variables prefixed with `TRUENO_MLOPS_`, nested keys
//!    separated by `__` (e.g. `TRUENO_MLOPS_LOGGING__LEVEL=debug`)

use crate::persistence::Compression;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment prefix for configuration overrides.
pub const ENV_PREFIX: &str = "TRUENO_MLOPS";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Snapshot directory
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    /// Dataset directory for `FileDatasetProvider`
    #[serde(default = "default_datasets_dir")]
    pub datasets_dir: PathBuf,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Snapshot settings
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `trueno_mlops=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

/// Snapshot persistence configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Compression of backend blobs (`none`, `lz4`, `zstd`)
    #[serde(default)]
    pub compression: Compression,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_datasets_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            datasets_dir: default_datasets_dir(),
            logging: LoggingConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from defaults, `path` (if given) and the
    /// `TRUENO_MLOPS_*` environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file is missing or malformed, or a value
    /// has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    /// [`load`](Self::load) with a custom environment prefix.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_with_env_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        tracing::debug!(
            models_dir = %config.models_dir.display(),
            datasets_dir = %config.datasets_dir.display(),
            compression = config.persistence.compression.as_str(),
            "configuration loaded"
        );
        Ok(config)
    }
}
