//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$SCHEMATA_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/schemata/config.toml`
//! 3. `~/.schemata/config.toml` (canonical write location)
//!
//! # Project Config
//!
//! Located at `<project>/schemata.toml`.
//!
//! Both scopes share one schema; project values override global ones
//! field by field.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// One configuration file.
///
/// # Example
///
/// ```toml
/// [store]
/// backend = "file"
/// path = "data/schema"
///
/// [engine]
/// flush = "immediate"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Persistence settings
    pub store: Option<StoreConfig>,

    /// Change tracking settings
    pub engine: Option<EngineConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(store) = &self.store {
            store.validate()?;
        }
        Ok(())
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Backend to use ("memory" or "file")
    pub backend: Option<String>,

    /// Store directory for the file backend
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Valid store backends.
    pub const VALID_BACKENDS: &'static [&'static str] = &["memory", "file"];

    /// The backend name. Defaults to "memory".
    pub fn backend(&self) -> &str {
        self.backend.as_deref().unwrap_or("memory")
    }

    /// Validate the store configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(backend) = &self.backend {
            if !Self::VALID_BACKENDS.contains(&backend.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid store backend '{}', must be one of: {}",
                    backend,
                    Self::VALID_BACKENDS.join(", ")
                )));
            }
        }
        if let Some(path) = &self.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "store path cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Change tracking settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// When changes reach the adapter
    pub flush: Option<FlushPolicy>,
}

/// When a metamodel writes its change log to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Only on an explicit `flush`.
    #[default]
    Manual,
    /// After every successful mutation.
    Immediate,
}
