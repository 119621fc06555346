//! adapter
//!
//! Persistence adapters for metamodel records.
//!
//! # Architecture
//!
//! Records are stored through the [`PersistenceAdapter`] trait, which has
//! two implementations:
//!
//! - [`MemoryAdapter`]: Records live in process memory (default)
//! - [`FileAdapter`]: One JSON document under a locked directory
//!
//! # Backend Selection
//!
//! Use [`create_adapter`] to build an adapter from configuration:
//!
//! ```
//! use schemata::adapter::create_adapter;
//! use schemata::core::config::StoreConfig;
//!
//! let adapter = create_adapter(&StoreConfig::default()).unwrap();
//! assert_eq!(adapter.name(), "memory");
//! ```

mod file_store;
mod lock;
mod memory_store;
mod paths;
mod traits;

pub use file_store::FileAdapter;
pub use lock::{LockError, StoreLock};
pub use memory_store::MemoryAdapter;
pub use paths::StorePaths;
pub use traits::PersistenceAdapter;

pub use crate::core::record::Relation;

use thiserror::Error;
use tracing::info;

use crate::core::config::StoreConfig;
use crate::core::error::MetaError;
use crate::core::record::RecordError;
use crate::core::types::ElementId;

/// Errors from persistence adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("unknown store backend: '{0}' (valid: memory, file)")]
    UnknownBackend(String),

    #[error("the file backend requires a store path")]
    MissingPath,

    /// Stored data failed validation.
    #[error("store is corrupted: {0}")]
    Corrupted(String),

    /// A record with this id is already stored.
    #[error("record {0} already exists")]
    DuplicateId(ElementId),
}

impl From<RecordError> for AdapterError {
    fn from(err: RecordError) -> Self {
        Self::Corrupted(err.to_string())
    }
}

/// Corruption and id clashes have their own reasons; every other storage
/// failure is carried as `AdapterFailure`.
impl From<AdapterError> for MetaError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Corrupted(msg) => Self::CorruptedRecord(msg),
            AdapterError::DuplicateId(id) => Self::ElementConflict(id),
            other => Self::Adapter(Box::new(other)),
        }
    }
}

/// Create an adapter for the configured backend.
///
/// # Backends
///
/// - `"memory"` (default): [`MemoryAdapter`]
/// - `"file"`: [`FileAdapter`] at `config.path`
///
/// # Errors
///
/// - Unknown backend name
/// - File backend without a path
/// - Errors opening the file store
pub fn create_adapter(config: &StoreConfig) -> Result<Box<dyn PersistenceAdapter>, AdapterError> {
    let adapter: Box<dyn PersistenceAdapter> = match config.backend() {
        "memory" => Box::new(MemoryAdapter::new()),
        "file" => {
            let path = config.path.clone().ok_or(AdapterError::MissingPath)?;
            Box::new(FileAdapter::open(StorePaths::new(path))?)
        }
        other => return Err(AdapterError::UnknownBackend(other.to_string())),
    };
    info!(backend = adapter.name(), "persistence adapter ready");
    Ok(adapter)
}

/// The default backend name.
pub const DEFAULT_BACKEND: &str = "memory";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorReason;
    use tempfile::TempDir;

    #[test]
    fn create_memory_adapter() {
        let adapter = create_adapter(&StoreConfig::default()).expect("create");
        assert_eq!(adapter.name(), DEFAULT_BACKEND);
        assert!(adapter.load_record(ElementId::ROOT).unwrap().is_some());
    }

    #[test]
    fn create_file_adapter() {
        let temp = TempDir::new().unwrap();
        let config = StoreConfig {
            backend: Some("file".into()),
            path: Some(temp.path().join("store")),
        };
        let adapter = create_adapter(&config).expect("create");
        assert_eq!(adapter.name(), "file");
    }

    #[test]
    fn file_backend_needs_path() {
        let config = StoreConfig {
            backend: Some("file".into()),
            path: None,
        };
        assert!(matches!(
            create_adapter(&config),
            Err(AdapterError::MissingPath)
        ));
    }

    #[test]
    fn create_unknown_backend() {
        let config = StoreConfig {
            backend: Some("s3".into()),
            path: None,
        };
        match create_adapter(&config) {
            Err(AdapterError::UnknownBackend(name)) => assert_eq!(name, "s3"),
            other => panic!("unexpected result: {:?}", other.map(|a| a.name())),
        }
    }

    #[test]
    fn corrupted_adapter_error_surfaces_as_fatal() {
        let err: MetaError = AdapterError::Corrupted("fingerprint mismatch".into()).into();
        assert_eq!(err.reason(), ErrorReason::CorruptedRecord);
        assert!(err.is_fatal());
    }

    #[test]
    fn duplicate_id_maps_to_element_conflict() {
        let err: MetaError = AdapterError::DuplicateId(ElementId::new(7)).into();
        assert_eq!(err.reason(), ErrorReason::ElementConflict);
        assert!(!err.is_fatal());
    }

    #[test]
    fn other_adapter_errors_are_wrapped() {
        let err: MetaError = AdapterError::UnknownBackend("s3".into()).into();
        assert_eq!(err.reason(), ErrorReason::AdapterFailure);
        match err {
            MetaError::Adapter(inner) => {
                let inner = inner.downcast_ref::<AdapterError>().expect("adapter error");
                assert!(matches!(inner, AdapterError::UnknownBackend(name) if name == "s3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn record_errors_become_corruption() {
        let err: AdapterError = RecordError::UnsupportedVersion(7).into();
        assert!(matches!(err, AdapterError::Corrupted(msg) if msg.contains('7')));
    }
}
