//! adapter::memory_store
//!
//! In-memory storage.
//!
//! The record table here also backs [`FileAdapter`](super::FileAdapter),
//! which adds loading, locking and atomic writes around it.

use std::collections::BTreeMap;

use tracing::debug;

use super::traits::PersistenceAdapter;
use super::AdapterError;
use crate::core::record::{ElementRecord, Relation};
use crate::core::types::{ElementId, ElementKind};

/// Records keyed by id plus the id counter.
#[derive(Debug, Clone)]
pub(crate) struct RecordTable {
    records: BTreeMap<ElementId, ElementRecord>,
    next_id: u64,
}

impl RecordTable {
    /// A table holding only the root package.
    pub(crate) fn seeded() -> Self {
        let root = ElementRecord::root_package();
        Self {
            records: BTreeMap::from([(root.id(), root)]),
            next_id: ElementId::FIRST_ASSIGNABLE,
        }
    }

    /// A table over stored `records`, numbering new ids from `next_id` or
    /// past the highest stored id, whichever is larger.
    ///
    /// # Errors
    ///
    /// `Corrupted` if a stored id leaves no id to assign after it.
    pub(crate) fn from_records(
        next_id: u64,
        records: Vec<ElementRecord>,
    ) -> Result<Self, AdapterError> {
        let records: BTreeMap<_, _> = records.into_iter().map(|r| (r.id(), r)).collect();
        let floor = match records.keys().next_back() {
            Some(&id) => successor(id)?,
            None => 0,
        };
        Ok(Self {
            records,
            next_id: next_id.max(floor).max(ElementId::FIRST_ASSIGNABLE),
        })
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    pub(crate) fn records(&self) -> impl Iterator<Item = &ElementRecord> {
        self.records.values()
    }

    pub(crate) fn create(&mut self, record: ElementRecord) -> Result<ElementId, AdapterError> {
        let id = match record.id() {
            id if id.is_none() => ElementId::new(self.next_id),
            id if self.records.contains_key(&id) => return Err(AdapterError::DuplicateId(id)),
            id => id,
        };
        self.next_id = self.next_id.max(successor(id)?);
        self.records.insert(id, record.with_id(id));
        Ok(id)
    }

    pub(crate) fn load(&self, id: ElementId) -> Option<ElementRecord> {
        self.records.get(&id).cloned()
    }

    pub(crate) fn save(&mut self, record: &ElementRecord) -> Result<(), AdapterError> {
        let id = record.id();
        if id.is_none() {
            return Err(AdapterError::Corrupted(format!(
                "cannot save {} '{}' without an id",
                record.kind(),
                record.name()
            )));
        }
        self.next_id = self.next_id.max(successor(id)?);
        self.records.insert(id, record.clone());
        Ok(())
    }

    pub(crate) fn delete(&mut self, id: ElementId) -> bool {
        self.records.remove(&id).is_some()
    }

    pub(crate) fn related(&self, id: ElementId, relation: Relation) -> Vec<ElementId> {
        self.records
            .values()
            .filter(|r| r.points_to(relation, id))
            .map(ElementRecord::id)
            .collect()
    }
}

/// The id after `id`. The last representable id cannot be stored because
/// nothing could be numbered after it.
fn successor(id: ElementId) -> Result<u64, AdapterError> {
    id.raw()
        .checked_add(1)
        .ok_or_else(|| AdapterError::Corrupted(format!("record id {id} exhausts the id space")))
}

/// Storage that lives as long as the adapter.
///
/// Useful for tests and for schemas built at runtime that need no
/// durability. Change notifications are kept for inspection.
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    table: RecordTable,
    changes: Vec<(ElementId, ElementKind)>,
}

impl MemoryAdapter {
    /// An empty store holding only the root package.
    pub fn new() -> Self {
        Self {
            table: RecordTable::seeded(),
            changes: Vec::new(),
        }
    }

    /// A store pre-populated with `records`.
    ///
    /// The root package is added unless `records` already has a record
    /// with the root id.
    ///
    /// # Errors
    ///
    /// `Corrupted` if a record carries the largest possible id.
    pub fn with_records(records: Vec<ElementRecord>) -> Result<Self, AdapterError> {
        let mut all = records;
        if !all.iter().any(|r| r.id() == ElementId::ROOT) {
            all.push(ElementRecord::root_package());
        }
        Ok(Self {
            table: RecordTable::from_records(ElementId::FIRST_ASSIGNABLE, all)?,
            changes: Vec::new(),
        })
    }

    /// All stored records, in id order.
    pub fn records(&self) -> Vec<ElementRecord> {
        self.table.records().cloned().collect()
    }

    /// Change notifications received so far, in order.
    pub fn changes(&self) -> &[(ElementId, ElementKind)] {
        &self.changes
    }

    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn create_element(&mut self, record: ElementRecord) -> Result<ElementId, AdapterError> {
        let kind = record.kind();
        let id = self.table.create(record)?;
        debug!(%id, %kind, "memory store created record");
        Ok(id)
    }

    fn load_record(&self, id: ElementId) -> Result<Option<ElementRecord>, AdapterError> {
        Ok(self.table.load(id))
    }

    fn save_record(&mut self, record: &ElementRecord) -> Result<(), AdapterError> {
        self.table.save(record)
    }

    fn delete_record(&mut self, id: ElementId) -> Result<(), AdapterError> {
        self.table.delete(id);
        Ok(())
    }

    fn related(&self, id: ElementId, relation: Relation) -> Result<Vec<ElementId>, AdapterError> {
        Ok(self.table.related(id, relation))
    }

    fn mark_changed(&mut self, id: ElementId, kind: ElementKind) {
        self.changes.push((id, kind));
    }
}
