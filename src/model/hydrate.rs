//! model::hydrate
//!
//! Identity lookup, one-time hydration and link resolution.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use super::element::{AttributeData, ClassData, Element, PackageData, ReferenceData, Slot};
use super::Metamodel;
use crate::core::error::{MetaError, MetaResult};
use crate::core::record::Relation;
use crate::core::types::{
    AttributeId, ClassId, ElementId, ElementKind, PackageId, ReferenceId,
};

fn check_kind(id: ElementId, expected: ElementKind, found: ElementKind) -> MetaResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(MetaError::MismatchedElementType {
            id,
            expected,
            found,
        })
    }
}

macro_rules! data_accessors {
    ($get:ident, $get_mut:ident, $handle:ty, $variant:ident, $data:ty) => {
        pub(crate) fn $get(&mut self, handle: $handle) -> MetaResult<&$data> {
            let id = handle.id();
            self.load(id, Some(<$handle>::KIND))?;
            match self.slots.get(&id) {
                Some(Slot::Loaded(Element::$variant(data))) => Ok(data),
                _ => Err(MetaError::ElementMissing(id)),
            }
        }

        pub(crate) fn $get_mut(&mut self, handle: $handle) -> MetaResult<&mut $data> {
            let id = handle.id();
            self.load(id, Some(<$handle>::KIND))?;
            match self.slots.get_mut(&id) {
                Some(Slot::Loaded(Element::$variant(data))) => Ok(data),
                _ => Err(MetaError::ElementMissing(id)),
            }
        }
    };
}

impl Metamodel {
    /// The root package. Always present.
    pub fn root_package(&self) -> PackageId {
        PackageId::ROOT
    }

    /// The package with `id`. Does not hydrate it.
    ///
    /// The first lookup of an id asks the adapter whether a record exists;
    /// only then is the id cached as lazy.
    ///
    /// # Errors
    ///
    /// - `NullElement` for the `0` sentinel
    /// - `MismatchedElementType` if `id` is known or stored as another kind
    /// - `ElementMissing` if it is deleted or the adapter has no record
    pub fn package(&mut self, id: ElementId) -> MetaResult<PackageId> {
        self.lookup(id, ElementKind::Package).map(PackageId::from)
    }

    /// The class with `id`. Does not load it.
    pub fn class(&mut self, id: ElementId) -> MetaResult<ClassId> {
        self.lookup(id, ElementKind::Class).map(ClassId::from)
    }

    pub fn attribute_by_id(&mut self, id: ElementId) -> MetaResult<AttributeId> {
        self.lookup(id, ElementKind::Attribute).map(AttributeId::from)
    }

    pub fn reference_by_id(&mut self, id: ElementId) -> MetaResult<ReferenceId> {
        self.lookup(id, ElementKind::Reference).map(ReferenceId::from)
    }

    fn lookup(&mut self, id: ElementId, kind: ElementKind) -> MetaResult<ElementId> {
        if id.is_none() {
            return Err(MetaError::NullElement);
        }
        match self.slots.get(&id) {
            Some(Slot::Deleted(_)) => return Err(MetaError::ElementMissing(id)),
            Some(slot) => check_kind(id, kind, slot.kind())?,
            None => {
                let stored = self
                    .store_ref()?
                    .load_record(id)?
                    .ok_or(MetaError::ElementMissing(id))?;
                check_kind(id, kind, stored.kind())?;
                self.slots.insert(id, Slot::Lazy(kind));
            }
        }
        Ok(id)
    }

    pub(crate) fn is_deleted(&self, id: ElementId) -> bool {
        matches!(self.slots.get(&id), Some(Slot::Deleted(_)))
    }

    /// Make sure `id` is loaded and return its kind.
    ///
    /// A lazy slot pulls its record from the adapter once. With `expected`
    /// set, a record of another kind is rejected and the slot stays lazy.
    pub(crate) fn load(
        &mut self,
        id: ElementId,
        expected: Option<ElementKind>,
    ) -> MetaResult<ElementKind> {
        if id.is_none() {
            return Err(MetaError::NullElement);
        }
        match self.slots.get(&id) {
            Some(Slot::Loaded(element)) => {
                let found = element.kind();
                if let Some(expected) = expected {
                    check_kind(id, expected, found)?;
                }
                return Ok(found);
            }
            Some(Slot::Deleted(_)) => return Err(MetaError::ElementMissing(id)),
            Some(Slot::Lazy(_)) | None => {}
        }

        let record = self
            .store_ref()?
            .load_record(id)?
            .ok_or(MetaError::ElementMissing(id))?;
        let found = record.kind();
        if let Some(expected) = expected {
            check_kind(id, expected, found)?;
        }

        let element = Element::from_record(record)?;
        debug!(id = %id, kind = %found, name = element.name(), "hydrated element");
        self.slots.insert(id, Slot::Loaded(element));
        Ok(found)
    }

    data_accessors!(package_data, package_data_mut, PackageId, Package, PackageData);
    data_accessors!(class_data, class_data_mut, ClassId, Class, ClassData);
    data_accessors!(attribute_data, attribute_data_mut, AttributeId, Attribute, AttributeData);
    data_accessors!(reference_data, reference_data_mut, ReferenceId, Reference, ReferenceData);

    /// Ids related to `id` in the store, minus those deleted in memory.
    fn related_live(&self, id: ElementId, relation: Relation) -> MetaResult<Vec<ElementId>> {
        let related = self.store_ref()?.related(id, relation)?;
        Ok(related.into_iter().filter(|r| !self.is_deleted(*r)).collect())
    }

    /// Complete the class and subpackage indexes of `pkg`.
    pub(crate) fn resolve_children(&mut self, pkg: PackageId) -> MetaResult<()> {
        if self.package_data(pkg)?.children_resolved {
            return Ok(());
        }

        let mut classes = BTreeMap::new();
        let mut subpackages = BTreeMap::new();
        for id in self.related_live(pkg.id(), Relation::Children)? {
            match self.load(id, None)? {
                ElementKind::Package => {
                    let child = PackageId::from(id);
                    let data = self.package_data(child)?;
                    if data.parent == Some(pkg) {
                        subpackages.insert(data.name.clone(), child);
                    }
                }
                ElementKind::Class => {
                    let child = ClassId::from(id);
                    let data = self.class_data(child)?;
                    if data.package == pkg {
                        classes.insert(data.name.clone(), child);
                    }
                }
                kind => warn!(package = %pkg, id = %id, kind = %kind, "ignoring child of unexpected kind"),
            }
        }

        debug!(package = %pkg, classes = classes.len(), subpackages = subpackages.len(), "resolved children");
        let data = self.package_data_mut(pkg)?;
        data.classes.extend(classes);
        data.subpackages.extend(subpackages);
        data.children_resolved = true;
        Ok(())
    }

    /// Complete the attribute and reference maps of `cls`.
    pub(crate) fn resolve_members(&mut self, cls: ClassId) -> MetaResult<()> {
        if self.class_data(cls)?.members_resolved {
            return Ok(());
        }

        let mut attributes = BTreeMap::new();
        let mut references = BTreeMap::new();
        for id in self.related_live(cls.id(), Relation::Members)? {
            match self.load(id, None)? {
                ElementKind::Attribute => {
                    let member = AttributeId::from(id);
                    let data = self.attribute_data(member)?;
                    if data.owner == cls {
                        attributes.insert(data.name.clone(), member);
                    }
                }
                ElementKind::Reference => {
                    let member = ReferenceId::from(id);
                    let data = self.reference_data(member)?;
                    if data.owner == cls {
                        references.insert(data.name.clone(), member);
                    }
                }
                kind => warn!(class = %cls, id = %id, kind = %kind, "ignoring member of unexpected kind"),
            }
        }

        debug!(class = %cls, attributes = attributes.len(), references = references.len(), "resolved members");
        let data = self.class_data_mut(cls)?;
        data.attributes.extend(attributes);
        data.references.extend(references);
        data.members_resolved = true;
        Ok(())
    }

    /// Complete the subclass set of `cls`.
    pub(crate) fn resolve_subclasses(&mut self, cls: ClassId) -> MetaResult<()> {
        if self.class_data(cls)?.subclasses_resolved {
            return Ok(());
        }

        let mut subclasses = BTreeSet::new();
        for id in self.related_live(cls.id(), Relation::Subclasses)? {
            if self.load(id, None)? != ElementKind::Class {
                warn!(class = %cls, id = %id, "ignoring subclass of unexpected kind");
                continue;
            }
            let sub = ClassId::from(id);
            if self.class_data(sub)?.superclass == Some(cls) {
                subclasses.insert(sub);
            }
        }

        let data = self.class_data_mut(cls)?;
        data.subclasses.extend(subclasses);
        data.subclasses_resolved = true;
        Ok(())
    }

    /// Complete the utilizer set of `cls`.
    pub(crate) fn resolve_utilizers(&mut self, cls: ClassId) -> MetaResult<()> {
        if self.class_data(cls)?.utilizers_resolved {
            return Ok(());
        }

        let mut utilizers = BTreeSet::new();
        for id in self.related_live(cls.id(), Relation::Utilizers)? {
            if self.load(id, None)? != ElementKind::Reference {
                warn!(class = %cls, id = %id, "ignoring utilizer of unexpected kind");
                continue;
            }
            let r = ReferenceId::from(id);
            if self.reference_data(r)?.target == cls {
                utilizers.insert(r);
            }
        }

        let data = self.class_data_mut(cls)?;
        data.utilizers.extend(utilizers);
        data.utilizers_resolved = true;
        Ok(())
    }
}
