//! adapter::traits
//!
//! The persistence seam.
//!
//! # Design
//!
//! A metamodel talks to storage only through [`PersistenceAdapter`]. The
//! adapter owns id assignment and answers back-reference queries
//! ([`Relation`]) so that elements can be loaded lazily without reading
//! the whole store.
//!
//! # Contract
//!
//! - `create_element` assigns a fresh id when the record carries `0` and
//!   persists the record under it; a record that already carries an id
//!   keeps it, and an id already in use is [`AdapterError::DuplicateId`]
//! - `load_record` returns `None` for ids the store does not hold
//! - `save_record` overwrites the record with the same id
//! - `delete_record` is idempotent
//! - `related` only reports ids of records currently in the store
//!
//! # Example
//!
//! ```
//! use schemata::adapter::{MemoryAdapter, PersistenceAdapter, Relation};
//! use schemata::core::record::{ClassRecord, ElementRecord};
//! use schemata::core::types::ElementId;
//!
//! let mut store = MemoryAdapter::new();
//! let id = store
//!     .create_element(ElementRecord::Class(ClassRecord {
//!         id: ElementId::NONE,
//!         name: "Animal".into(),
//!         superclass_id: ElementId::NONE,
//!         package_id: ElementId::ROOT,
//!     }))
//!     .unwrap();
//!
//! assert_eq!(store.related(ElementId::ROOT, Relation::Children).unwrap(), vec![id]);
//! ```

use crate::core::record::{ElementRecord, Relation};
use crate::core::types::{ElementId, ElementKind};

use super::AdapterError;

/// Storage behind a metamodel.
pub trait PersistenceAdapter: std::fmt::Debug {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Persist a new record, assigning an id if it carries `0`.
    fn create_element(&mut self, record: ElementRecord) -> Result<ElementId, AdapterError>;

    /// Load the record stored under `id`.
    fn load_record(&self, id: ElementId) -> Result<Option<ElementRecord>, AdapterError>;

    /// Overwrite the stored record with the same id.
    fn save_record(&mut self, record: &ElementRecord) -> Result<(), AdapterError>;

    /// Remove the record stored under `id`.
    fn delete_record(&mut self, id: ElementId) -> Result<(), AdapterError>;

    /// Ids of the records pointing at `id` through `relation`, ascending.
    fn related(&self, id: ElementId, relation: Relation) -> Result<Vec<ElementId>, AdapterError>;

    /// Change notification sink. Called once per logical change of an
    /// element, before the change is saved.
    fn mark_changed(&mut self, _id: ElementId, _kind: ElementKind) {}

    /// Make saved records durable.
    fn flush(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }
}
