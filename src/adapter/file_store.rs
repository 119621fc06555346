//! adapter::file_store
//!
//! JSON file storage.
//!
//! # Durability
//!
//! - Records live in memory between flushes; `flush` writes the whole
//!   document
//! - All writes are atomic (write to temp file, sync, then rename)
//! - The store directory is locked for the adapter's lifetime
//! - A document whose fingerprint does not match its records is refused
//!
//! # Example
//!
//! ```no_run
//! use schemata::adapter::{FileAdapter, PersistenceAdapter, StorePaths};
//! use std::path::PathBuf;
//!
//! let mut store = FileAdapter::open(StorePaths::new(PathBuf::from("data/schema"))).unwrap();
//! // ... create and save records ...
//! store.flush().unwrap();
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;

use tracing::{debug, info};

use super::lock::StoreLock;
use super::memory_store::RecordTable;
use super::paths::StorePaths;
use super::traits::PersistenceAdapter;
use super::AdapterError;
use crate::core::record::{parse_document, ElementRecord, Relation, StoreDocumentV1};
use crate::core::types::{ElementId, SchemaFingerprint};

/// Storage in a single JSON document under a locked directory.
#[derive(Debug)]
pub struct FileAdapter {
    paths: StorePaths,
    table: RecordTable,
    dirty: bool,
    _lock: StoreLock,
}

impl FileAdapter {
    /// Open the store at `paths`, creating an empty one if no document
    /// exists yet.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::Lock`] if another process has the store open
    /// - [`AdapterError::Io`] if the document cannot be read
    /// - [`AdapterError::Corrupted`] if the document fails validation
    pub fn open(paths: StorePaths) -> Result<Self, AdapterError> {
        let lock = StoreLock::acquire(&paths)?;
        let document_path = paths.document_path();

        let (table, dirty) = if document_path.exists() {
            let content = fs::read_to_string(&document_path)?;
            let doc = parse_document(&content)?;
            info!(
                path = %document_path.display(),
                records = doc.records.len(),
                "opened file store"
            );
            (RecordTable::from_records(doc.next_id, doc.records)?, false)
        } else {
            info!(path = %document_path.display(), "creating file store");
            (RecordTable::seeded(), true)
        };

        Ok(Self {
            paths,
            table,
            dirty,
            _lock: lock,
        })
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Whether there are changes not yet written.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Fingerprint over the current records.
    pub fn fingerprint(&self) -> Result<SchemaFingerprint, AdapterError> {
        Ok(self.document()?.fingerprint)
    }

    fn document(&self) -> Result<StoreDocumentV1, AdapterError> {
        let records = self.table.records().cloned().collect();
        Ok(StoreDocumentV1::new(self.table.next_id(), records)?)
    }

    fn write_document(&self) -> Result<(), AdapterError> {
        let doc = self.document()?;
        let content = serde_json::to_string_pretty(&doc)
            .map_err(|e| AdapterError::Corrupted(format!("cannot serialize store: {e}")))?;

        self.paths.ensure_dirs()?;
        let temp_path = self.paths.temp_document_path();
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, self.paths.document_path())?;

        debug!(
            records = doc.records.len(),
            fingerprint = %doc.fingerprint,
            "wrote store document"
        );
        Ok(())
    }
}

impl PersistenceAdapter for FileAdapter {
    fn name(&self) -> &'static str {
        "file"
    }

    fn create_element(&mut self, record: ElementRecord) -> Result<ElementId, AdapterError> {
        let id = self.table.create(record)?;
        self.dirty = true;
        Ok(id)
    }

    fn load_record(&self, id: ElementId) -> Result<Option<ElementRecord>, AdapterError> {
        Ok(self.table.load(id))
    }

    fn save_record(&mut self, record: &ElementRecord) -> Result<(), AdapterError> {
        self.table.save(record)?;
        self.dirty = true;
        Ok(())
    }

    fn delete_record(&mut self, id: ElementId) -> Result<(), AdapterError> {
        if self.table.delete(id) {
            self.dirty = true;
        }
        Ok(())
    }

    fn related(&self, id: ElementId, relation: Relation) -> Result<Vec<ElementId>, AdapterError> {
        Ok(self.table.related(id, relation))
    }

    fn flush(&mut self) -> Result<(), AdapterError> {
        if !self.dirty {
            return Ok(());
        }
        self.write_document()?;
        self.dirty = false;
        Ok(())
    }
}
