//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Schemata has two configuration scopes:
//! - **Global**: User-level settings
//! - **Project**: Per-project overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$SCHEMATA_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/schemata/config.toml`
//! 3. `~/.schemata/config.toml`
//!
//! # Project Config Location
//!
//! `<project>/schemata.toml`. A relative store path in it is resolved
//! against the project directory.
//!
//! # Example
//!
//! ```no_run
//! use schemata::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! let config = result.config;
//!
//! println!("Backend: {}", config.store_backend());
//! println!("Flush: {:?}", config.flush_policy());
//! ```

pub mod schema;

pub use schema::{ConfigFile, EngineConfig, FlushPolicy, StoreConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// File name of the project config.
pub const PROJECT_CONFIG_FILE: &str = "schemata.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence: project values override global ones,
/// which override defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: ConfigFile,
    /// Project configuration (if a project directory was given)
    pub project: Option<ConfigFile>,
    /// Directory the project config was read from
    project_dir: Option<PathBuf>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the project config file (if loaded)
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_dir` is provided, also loads `<project_dir>/schemata.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or
    /// hold invalid values. Missing config files are not an error.
    pub fn load(project_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_from(&Self::global_candidates(), project_dir)
    }

    /// Load with an explicit list of global config candidates, first
    /// existing one wins.
    pub fn load_from(
        global_candidates: &[PathBuf],
        project_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = match global_candidates.iter().find(|p| p.exists()) {
            Some(path) => (Self::read_config(path)?, Some(path.clone())),
            None => (ConfigFile::default(), None),
        };

        let (project, project_path) = match project_dir {
            Some(dir) => {
                let path = Self::project_config_path(dir);
                if path.exists() {
                    (Some(Self::read_config(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(p) = &project {
            p.validate()?;
        }

        let config = Config {
            global,
            project,
            project_dir: project_dir.map(Path::to_path_buf),
            global_path,
            project_path,
        };

        if config.store_backend() == "memory" && config.store_path().is_some() {
            warnings.push(ConfigWarning {
                message: "store path is ignored by the memory backend".to_string(),
                path: config
                    .project_path
                    .clone()
                    .or_else(|| config.global_path.clone())
                    .unwrap_or_default(),
            });
        }

        debug!(
            global = ?config.global_path,
            project = ?config.project_path,
            "loaded configuration"
        );
        Ok(ConfigLoadResult { config, warnings })
    }

    /// Global config locations, in search order.
    pub fn global_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Ok(path) = std::env::var("SCHEMATA_CONFIG") {
            candidates.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg_home).join("schemata/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".schemata/config.toml"));
        }
        candidates
    }

    /// Read and parse one config file.
    fn read_config(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the path of the project config in `project_dir`.
    pub fn project_config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(PROJECT_CONFIG_FILE)
    }

    /// Write project config atomically.
    ///
    /// Creates the project directory if needed.
    pub fn write_project(project_dir: &Path, config: &ConfigFile) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = Self::project_config_path(project_dir);
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write a config file atomically.
    fn write_config_atomic<T: serde::Serialize>(
        path: &Path,
        config: &T,
    ) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn project_store(&self) -> Option<&StoreConfig> {
        self.project.as_ref().and_then(|p| p.store.as_ref())
    }

    fn global_store(&self) -> Option<&StoreConfig> {
        self.global.store.as_ref()
    }

    /// Get the store backend name.
    ///
    /// Defaults to "memory" if not configured.
    pub fn store_backend(&self) -> &str {
        self.project_store()
            .and_then(|s| s.backend.as_deref())
            .or_else(|| self.global_store().and_then(|s| s.backend.as_deref()))
            .unwrap_or("memory")
    }

    /// Get the store directory.
    ///
    /// A relative project path is joined onto the project directory.
    pub fn store_path(&self) -> Option<PathBuf> {
        if let Some(path) = self.project_store().and_then(|s| s.path.as_ref()) {
            return Some(match &self.project_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path.clone(),
            });
        }
        self.global_store().and_then(|s| s.path.clone())
    }

    /// The merged store settings, ready for
    /// [`create_adapter`](crate::adapter::create_adapter).
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            backend: Some(self.store_backend().to_string()),
            path: self.store_path(),
        }
    }

    /// Get the flush policy.
    ///
    /// Defaults to [`FlushPolicy::Manual`] if not configured.
    pub fn flush_policy(&self) -> FlushPolicy {
        self.project
            .as_ref()
            .and_then(|p| p.engine.as_ref())
            .and_then(|e| e.flush)
            .or_else(|| self.global.engine.as_ref().and_then(|e| e.flush))
            .unwrap_or_default()
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded project config file.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}
