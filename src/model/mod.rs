//! model
//!
//! The live metamodel graph.
//!
//! # Architecture
//!
//! A [`Metamodel`] is an arena of element slots keyed by [`ElementId`],
//! backed by a [`PersistenceAdapter`]. Callers hold `Copy` handles
//! ([`PackageId`], [`ClassId`], [`AttributeId`], [`ReferenceId`]) and pass
//! them back to the metamodel for every read and write. The arena is the
//! identity map: one id, one slot.
//!
//! Operations are split by element kind:
//!
//! - `package`: namespaces and nesting
//! - `class`: classes, inheritance and cascading deletion
//! - `member`: attributes and references
//! - `object`: instances validated against a class
//!
//! # Change Tracking
//!
//! Every successful mutation marks each touched element changed once. The
//! change log is written to the adapter by [`Metamodel::flush`], either on
//! demand ([`FlushPolicy::Manual`]) or after each mutation
//! ([`FlushPolicy::Immediate`]).
//!
//! A flush that fails keeps whatever it did not write in the change log.
//! Under the immediate policy the mutation itself still succeeds; the
//! failure is logged and kept for [`Metamodel::take_flush_error`], and the
//! next flush retries the remaining changes.
//!
//! # Example
//!
//! ```
//! use schemata::adapter::MemoryAdapter;
//! use schemata::core::primitive::{DataType, PrimitiveType};
//! use schemata::model::Metamodel;
//!
//! let mut model = Metamodel::new(Box::new(MemoryAdapter::new()));
//! let animal = model.create_class("Animal", None, None).unwrap();
//! let dog = model.create_class("Dog", Some(animal), None).unwrap();
//! model
//!     .create_attribute(animal, "name", DataType::of(PrimitiveType::String))
//!     .unwrap();
//!
//! assert!(model.is_subclass_of(dog, animal).unwrap());
//! assert!(model.attribute(dog, "name").unwrap().is_some());
//!
//! let report = model.flush().unwrap();
//! assert_eq!(report.saved, 3);
//! ```

mod class;
mod element;
mod hydrate;
mod member;
mod object;
mod package;

pub use crate::core::config::FlushPolicy;
pub use element::ElementState;
pub use object::Object;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::adapter::{create_adapter, PersistenceAdapter};
use crate::core::config::Config;
use crate::core::error::{MetaError, MetaResult};
use crate::core::graph::HierarchyGraph;
use crate::core::record::ElementRecord;
use crate::core::types::{ClassId, ElementId, ElementKind, PackageId};
use crate::core::verify::{verify_records, VerifyError, VerifyResult};

use element::{Element, Slot};

/// What a flush wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records saved
    pub saved: usize,
    /// Records deleted
    pub deleted: usize,
}

/// Elements changed or deleted since the last flush.
#[derive(Debug, Default)]
struct ChangeLog {
    changed: BTreeSet<ElementId>,
    deleted: BTreeSet<ElementId>,
}

/// The metamodel graph.
#[derive(Debug)]
pub struct Metamodel {
    adapter: Option<Box<dyn PersistenceAdapter>>,
    slots: BTreeMap<ElementId, Slot>,
    changes: ChangeLog,
    policy: FlushPolicy,
    flush_error: Option<MetaError>,
}

impl Metamodel {
    /// A metamodel over `adapter` with manual flushing.
    pub fn new(adapter: Box<dyn PersistenceAdapter>) -> Self {
        Self::with_policy(adapter, FlushPolicy::default())
    }

    pub fn with_policy(adapter: Box<dyn PersistenceAdapter>, policy: FlushPolicy) -> Self {
        Self {
            adapter: Some(adapter),
            slots: BTreeMap::new(),
            changes: ChangeLog::default(),
            policy,
            flush_error: None,
        }
    }

    /// A metamodel with no adapter. Every operation that needs storage
    /// fails with `AdapterNotAttached` until [`attach`](Self::attach).
    pub fn detached() -> Self {
        Self {
            adapter: None,
            slots: BTreeMap::new(),
            changes: ChangeLog::default(),
            policy: FlushPolicy::default(),
            flush_error: None,
        }
    }

    /// Build the configured adapter and flush policy.
    ///
    /// # Errors
    ///
    /// `Adapter` if the adapter cannot be created (unknown backend, missing
    /// path, locked or corrupted store).
    pub fn from_config(config: &Config) -> MetaResult<Self> {
        let adapter = create_adapter(&config.store_config())?;
        Ok(Self::with_policy(adapter, config.flush_policy()))
    }

    /// Attach `adapter`, returning the previous one.
    ///
    /// The arena is cleared: elements are reloaded from the new adapter.
    /// Unflushed changes are dropped.
    pub fn attach(
        &mut self,
        adapter: Box<dyn PersistenceAdapter>,
    ) -> Option<Box<dyn PersistenceAdapter>> {
        self.reset();
        self.adapter.replace(adapter)
    }

    /// Take the adapter out, leaving the metamodel detached and empty.
    ///
    /// Unflushed changes are dropped; call [`flush`](Self::flush) first.
    pub fn detach(&mut self) -> Option<Box<dyn PersistenceAdapter>> {
        self.reset();
        self.adapter.take()
    }

    pub fn is_attached(&self) -> bool {
        self.adapter.is_some()
    }

    pub fn adapter(&self) -> Option<&dyn PersistenceAdapter> {
        self.adapter.as_deref()
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        self.policy
    }

    pub fn set_flush_policy(&mut self, policy: FlushPolicy) {
        self.policy = policy;
    }

    /// Lifecycle state of `id`, or `None` if this metamodel has never
    /// seen it.
    pub fn state(&self, id: impl Into<ElementId>) -> Option<ElementState> {
        self.slots.get(&id.into()).map(Slot::state)
    }

    /// Whether there are changes the adapter has not seen yet.
    pub fn is_dirty(&self) -> bool {
        !self.changes.changed.is_empty() || !self.changes.deleted.is_empty()
    }

    /// Ids marked changed since the last flush, ascending.
    pub fn pending_changes(&self) -> Vec<ElementId> {
        self.changes.changed.iter().copied().collect()
    }

    /// The failure of the last automatic flush, if it has not succeeded
    /// since. Only set under [`FlushPolicy::Immediate`].
    pub fn take_flush_error(&mut self) -> Option<MetaError> {
        self.flush_error.take()
    }

    fn pending_count(&self) -> usize {
        self.changes.changed.len() + self.changes.deleted.len()
    }

    /// Write the current state of one loaded element to the adapter.
    ///
    /// # Errors
    ///
    /// - `SaveBeforeLoad` if the element was never hydrated
    /// - `ElementMissing` if it is deleted
    pub fn save_record(&mut self, id: impl Into<ElementId>) -> MetaResult<()> {
        let id = id.into();
        let record = match self.slots.get(&id) {
            Some(Slot::Loaded(element)) => element.to_record(id),
            Some(Slot::Deleted(_)) => return Err(MetaError::ElementMissing(id)),
            Some(Slot::Lazy(_)) | None => return Err(MetaError::SaveBeforeLoad(id)),
        };
        self.store()?.save_record(&record)?;
        self.changes.changed.remove(&id);
        debug!(id = %id, "saved record");
        Ok(())
    }

    /// Write the change log to the adapter.
    ///
    /// Changed elements are saved parents first: packages by nesting depth,
    /// classes by inheritance depth, then attributes and references.
    /// Deleted elements are removed afterwards.
    ///
    /// # Errors
    ///
    /// - `AdapterNotAttached` without an adapter
    /// - `FlushFailed` if the adapter rejects a write. Records written
    ///   before the failure leave the change log; the rest stay pending
    ///   for the next flush.
    pub fn flush(&mut self) -> MetaResult<FlushReport> {
        self.store()?;
        match self.write_changes() {
            Ok(report) => {
                self.flush_error = None;
                Ok(report)
            }
            Err(err) => Err(MetaError::flush_failed(err, self.pending_count())),
        }
    }

    fn write_changes(&mut self) -> MetaResult<FlushReport> {
        let mut report = FlushReport::default();

        for id in self.flush_order() {
            self.save_record(id)?;
            report.saved += 1;
        }

        let deleted: Vec<ElementId> = self.changes.deleted.iter().copied().collect();
        for id in deleted {
            self.store()?.delete_record(id)?;
            self.changes.deleted.remove(&id);
            report.deleted += 1;
        }

        let store = self.store()?;
        store.flush()?;
        info!(
            adapter = store.name(),
            saved = report.saved,
            deleted = report.deleted,
            "flushed changes"
        );
        Ok(report)
    }

    fn flush_order(&self) -> Vec<ElementId> {
        let mut nesting = HierarchyGraph::new();
        let mut inheritance = HierarchyGraph::new();
        let mut members = Vec::new();

        for (&id, slot) in &self.slots {
            let Slot::Loaded(element) = slot else {
                continue;
            };
            match element {
                Element::Package(p) => nesting.add_node(id, p.parent.map(PackageId::id)),
                Element::Class(c) => inheritance.add_node(id, c.superclass.map(ClassId::id)),
                Element::Attribute(_) | Element::Reference(_) => members.push(id),
            }
        }

        nesting
            .topological_order()
            .into_iter()
            .chain(inheritance.topological_order())
            .chain(members)
            .filter(|id| self.changes.changed.contains(id))
            .collect()
    }

    /// Load the whole graph and check every structural invariant.
    ///
    /// Checks the stored forms of all elements (links, cycles, unique
    /// names, opposites) and that every resolved back-reference set agrees
    /// with the forward links.
    pub fn verify(&mut self) -> MetaResult<VerifyResult> {
        self.load_all()?;

        let records: Vec<ElementRecord> = self
            .slots
            .iter()
            .filter_map(|(&id, slot)| match slot {
                Slot::Loaded(element) => Some(element.to_record(id)),
                _ => None,
            })
            .collect();

        let mut errors = verify_records(&records).errors;
        errors.extend(self.stale_back_references());
        Ok(VerifyResult::from_errors(errors))
    }

    fn load_all(&mut self) -> MetaResult<()> {
        let mut pending = vec![PackageId::ROOT];
        while let Some(pkg) = pending.pop() {
            pending.extend(self.package_subpackages(pkg)?);
            for cls in self.package_classes(pkg)? {
                self.resolve_members(cls)?;
                self.resolve_subclasses(cls)?;
                self.resolve_utilizers(cls)?;
            }
        }
        Ok(())
    }

    fn stale_back_references(&self) -> Vec<VerifyError> {
        let mut errors = Vec::new();
        let mut stale = |id: ElementId, detail: String| {
            errors.push(VerifyError::StaleBackReference(id, detail));
        };

        for (&id, slot) in &self.slots {
            let Slot::Loaded(element) = slot else {
                continue;
            };
            match element {
                Element::Package(p) => {
                    for (name, &cls) in &p.classes {
                        if !matches!(self.loaded(cls.id()), Some(Element::Class(c)) if c.package.id() == id && &c.name == name)
                        {
                            stale(id, format!("class index entry '{name}' -> {cls}"));
                        }
                    }
                    for (name, &child) in &p.subpackages {
                        if !matches!(self.loaded(child.id()), Some(Element::Package(c)) if c.parent.map(PackageId::id) == Some(id) && &c.name == name)
                        {
                            stale(id, format!("subpackage index entry '{name}' -> {child}"));
                        }
                    }
                    if let Some(Element::Package(parent)) =
                        p.parent.and_then(|parent| self.loaded(parent.id()))
                    {
                        if parent.children_resolved
                            && parent.subpackages.get(&p.name).map(|c| c.id()) != Some(id)
                        {
                            stale(id, "missing from parent package index".to_string());
                        }
                    }
                }
                Element::Class(c) => {
                    for (name, &attr) in &c.attributes {
                        if !matches!(self.loaded(attr.id()), Some(Element::Attribute(a)) if a.owner.id() == id && &a.name == name)
                        {
                            stale(id, format!("attribute index entry '{name}' -> {attr}"));
                        }
                    }
                    for (name, &r) in &c.references {
                        if !matches!(self.loaded(r.id()), Some(Element::Reference(d)) if d.owner.id() == id && &d.name == name)
                        {
                            stale(id, format!("reference index entry '{name}' -> {r}"));
                        }
                    }
                    for &sub in &c.subclasses {
                        if !matches!(self.loaded(sub.id()), Some(Element::Class(s)) if s.superclass.map(ClassId::id) == Some(id))
                        {
                            stale(id, format!("subclass entry {sub}"));
                        }
                    }
                    for &r in &c.utilizers {
                        if !matches!(self.loaded(r.id()), Some(Element::Reference(d)) if d.target.id() == id)
                        {
                            stale(id, format!("utilizer entry {r}"));
                        }
                    }
                    if let Some(Element::Package(p)) = self.loaded(c.package.id()) {
                        if p.children_resolved && p.classes.get(&c.name).map(|x| x.id()) != Some(id)
                        {
                            stale(id, "missing from package index".to_string());
                        }
                    }
                    if let Some(Element::Class(s)) = c.superclass.and_then(|s| self.loaded(s.id())) {
                        if s.subclasses_resolved && !s.subclasses.contains(&ClassId::from(id)) {
                            stale(id, "missing from superclass subclass set".to_string());
                        }
                    }
                }
                Element::Attribute(a) => {
                    if let Some(Element::Class(owner)) = self.loaded(a.owner.id()) {
                        if owner.members_resolved
                            && owner.attributes.get(&a.name).map(|x| x.id()) != Some(id)
                        {
                            stale(id, "missing from owner attribute index".to_string());
                        }
                    }
                }
                Element::Reference(r) => {
                    if let Some(Element::Class(owner)) = self.loaded(r.owner.id()) {
                        if owner.members_resolved
                            && owner.references.get(&r.name).map(|x| x.id()) != Some(id)
                        {
                            stale(id, "missing from owner reference index".to_string());
                        }
                    }
                    if let Some(Element::Class(target)) = self.loaded(r.target.id()) {
                        if target.utilizers_resolved
                            && !target.utilizers.iter().any(|u| u.id() == id)
                        {
                            stale(id, "missing from target utilizer set".to_string());
                        }
                    }
                }
            }
        }

        errors
    }

    fn loaded(&self, id: ElementId) -> Option<&Element> {
        match self.slots.get(&id) {
            Some(Slot::Loaded(element)) => Some(element),
            _ => None,
        }
    }

    fn store(&mut self) -> MetaResult<&mut Box<dyn PersistenceAdapter>> {
        self.adapter.as_mut().ok_or(MetaError::AdapterNotAttached)
    }

    fn store_ref(&self) -> MetaResult<&dyn PersistenceAdapter> {
        self.adapter.as_deref().ok_or(MetaError::AdapterNotAttached)
    }

    /// Allocate an id for a new element and cache it as loaded.
    fn create_element(&mut self, element: Element) -> MetaResult<ElementId> {
        let record = element.to_record(ElementId::NONE);
        let id = self.store()?.create_element(record)?;
        debug!(id = %id, kind = %element.kind(), name = element.name(), "created element");
        self.slots.insert(id, Slot::Loaded(element));
        self.mark_changed(id);
        Ok(id)
    }

    fn mark_changed(&mut self, id: ElementId) {
        let Some(kind) = self.slots.get(&id).map(Slot::kind) else {
            return;
        };
        self.changes.changed.insert(id);
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.mark_changed(id, kind);
        }
    }

    fn mark_deleted(&mut self, id: ElementId, kind: ElementKind) {
        self.slots.insert(id, Slot::Deleted(kind));
        self.changes.changed.remove(&id);
        self.changes.deleted.insert(id);
        debug!(id = %id, kind = %kind, "deleted element");
    }

    /// Finish a successful mutation.
    ///
    /// The mutation stands even if the immediate flush fails.
    fn committed(&mut self) {
        if self.policy != FlushPolicy::Immediate {
            return;
        }
        if let Err(err) = self.flush() {
            warn!(error = %err, pending = self.pending_count(), "immediate flush failed");
            self.flush_error = Some(err);
        }
    }

    fn reset(&mut self) {
        self.slots.clear();
        self.changes = ChangeLog::default();
        self.flush_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::core::error::ErrorReason;
    use crate::core::primitive::{DataType, PrimitiveType};
    use crate::core::types::Cardinality;

    fn model() -> Metamodel {
        Metamodel::new(Box::new(MemoryAdapter::new()))
    }

    #[test]
    fn detached_model_needs_an_adapter() {
        let mut model = Metamodel::detached();
        assert!(!model.is_attached());
        let err = model.create_class("A", None, None).unwrap_err();
        assert_eq!(err.reason(), ErrorReason::AdapterNotAttached);

        model.attach(Box::new(MemoryAdapter::new()));
        assert!(model.create_class("A", None, None).is_ok());
    }

    #[test]
    fn creation_marks_only_the_new_element() {
        let mut model = model();
        let animal = model.create_class("Animal", None, None).unwrap();
        let dog = model.create_class("Dog", Some(animal), None).unwrap();
        assert_eq!(model.pending_changes(), vec![animal.id(), dog.id()]);
    }

    #[test]
    fn flush_saves_and_deletes() {
        let mut model = model();
        let a = model.create_class("A", None, None).unwrap();
        let attr = model
            .create_attribute(a, "x", DataType::of(PrimitiveType::Integer))
            .unwrap();
        assert_eq!(model.flush().unwrap(), FlushReport { saved: 2, deleted: 0 });
        assert!(!model.is_dirty());

        model.delete_attribute(attr).unwrap();
        assert!(model.is_dirty());
        assert_eq!(model.flush().unwrap(), FlushReport { saved: 0, deleted: 1 });
        assert!(model.adapter().unwrap().load_record(attr.id()).unwrap().is_none());
    }

    #[test]
    fn flush_order_puts_parents_first() {
        let mut model = model();
        let a = model.create_class("A", None, None).unwrap();
        let b = model.create_class("B", Some(a), None).unwrap();
        let outer = model.create_package("outer", None).unwrap();
        let inner = model.create_package("inner", Some(outer)).unwrap();
        model.set_superclass(a, None).unwrap();
        model.set_class_package(b, Some(inner)).unwrap();

        assert_eq!(
            model.flush_order(),
            vec![outer.id(), inner.id(), a.id(), b.id()]
        );
    }

    #[test]
    fn immediate_policy_flushes_after_each_mutation() {
        let mut model = Metamodel::with_policy(
            Box::new(MemoryAdapter::new()),
            FlushPolicy::Immediate,
        );
        let a = model.create_class("A", None, None).unwrap();
        assert!(!model.is_dirty());
        model.set_class_name(a, "Renamed").unwrap();
        assert!(!model.is_dirty());

        let stored = model.adapter().unwrap().load_record(a.id()).unwrap().unwrap();
        assert_eq!(stored.name(), "Renamed");
    }

    #[test]
    fn save_requires_a_loaded_element() {
        let mut model = model();
        let stored = model.create_class("Stored", None, None).unwrap();
        model.flush().unwrap();
        let mut model = Metamodel::new(model.detach().unwrap());
        let lazy = model.class(stored.id()).unwrap();
        assert_eq!(
            model.save_record(lazy).unwrap_err().reason(),
            ErrorReason::SaveBeforeLoad
        );

        let a = model.create_class("A", None, None).unwrap();
        model.delete_class(a).unwrap();
        assert_eq!(
            model.save_record(a).unwrap_err().reason(),
            ErrorReason::ElementMissing
        );
    }

    #[test]
    fn detach_returns_the_adapter_and_clears_the_arena() {
        let mut model = model();
        let a = model.create_class("A", None, None).unwrap();
        model.flush().unwrap();

        let adapter = model.detach().unwrap();
        assert_eq!(model.state(a), None);

        let mut reopened = Metamodel::new(adapter);
        let a = reopened.class(a.id()).unwrap();
        assert_eq!(reopened.state(a), Some(ElementState::Lazy));
        assert_eq!(reopened.class_name(a).unwrap(), "A");
        assert_eq!(reopened.state(a), Some(ElementState::Loaded));
    }

    #[test]
    fn verify_passes_on_a_populated_model() {
        let mut model = model();
        let person = model.create_class("Person", None, None).unwrap();
        let pet = model.create_class("Pet", None, None).unwrap();
        let owner = model
            .create_reference(pet, "owner", person, Cardinality::Single)
            .unwrap();
        let pets = model
            .create_reference(person, "pets", pet, Cardinality::Multi)
            .unwrap();
        model.set_reference_opposite(pets, Some(owner)).unwrap();

        let result = model.verify().unwrap();
        assert!(result.ok, "{:?}", result.errors);
    }

    #[test]
    fn verify_reports_stale_back_references() {
        let mut model = model();
        let a = model.create_class("A", None, None).unwrap();
        let b = model.create_class("B", Some(a), None).unwrap();
        if let Some(Slot::Loaded(Element::Class(data))) = model.slots.get_mut(&a.id()) {
            data.subclasses.remove(&b);
        }

        let result = model.verify().unwrap();
        assert!(!result.ok);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::StaleBackReference(id, _) if *id == b.id())));
    }
}
