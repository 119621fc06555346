//! model::element
//!
//! Arena slots and the loaded form of each element kind.
//!
//! # Lifecycle
//!
//! ```text
//! Lazy(kind) --hydrate--> Loaded(element) --delete--> Deleted(kind)
//! ```
//!
//! A slot never goes back. Hydration happens at most once per id.
//!
//! # Resolution
//!
//! Back-reference sets and name indexes (package children, class members,
//! subclasses, utilizers) are not part of a record. They start out
//! unresolved and are completed from the adapter's relation queries the
//! first time they are needed; the `*_resolved` flags track this.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::error::{MetaError, MetaResult};
use crate::core::primitive::DataType;
use crate::core::record::{
    AttributeRecord, ClassRecord, ElementRecord, PackageRecord, ReferenceRecord,
};
use crate::core::types::{
    AttributeId, Cardinality, ClassId, ElementId, ElementKind, PackageId, ReferenceId,
};

/// Observable lifecycle state of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementState {
    /// Known by id only.
    Lazy,
    /// Fields are in memory.
    Loaded,
    /// Deleted; every operation on it fails with `ElementMissing`.
    Deleted,
}

#[derive(Debug)]
pub(crate) enum Slot {
    Lazy(ElementKind),
    Loaded(Element),
    Deleted(ElementKind),
}

impl Slot {
    pub(crate) fn state(&self) -> ElementState {
        match self {
            Self::Lazy(_) => ElementState::Lazy,
            Self::Loaded(_) => ElementState::Loaded,
            Self::Deleted(_) => ElementState::Deleted,
        }
    }

    pub(crate) fn kind(&self) -> ElementKind {
        match self {
            Self::Lazy(kind) | Self::Deleted(kind) => *kind,
            Self::Loaded(element) => element.kind(),
        }
    }
}

#[derive(Debug)]
pub(crate) enum Element {
    Package(PackageData),
    Class(ClassData),
    Attribute(AttributeData),
    Reference(ReferenceData),
}

#[derive(Debug)]
pub(crate) struct PackageData {
    pub(crate) name: String,
    pub(crate) parent: Option<PackageId>,
    pub(crate) classes: BTreeMap<String, ClassId>,
    pub(crate) subpackages: BTreeMap<String, PackageId>,
    pub(crate) children_resolved: bool,
}

impl PackageData {
    pub(crate) fn has_child(&self, name: &str) -> bool {
        self.classes.contains_key(name) || self.subpackages.contains_key(name)
    }
}

#[derive(Debug)]
pub(crate) struct ClassData {
    pub(crate) name: String,
    pub(crate) package: PackageId,
    pub(crate) superclass: Option<ClassId>,
    pub(crate) attributes: BTreeMap<String, AttributeId>,
    pub(crate) references: BTreeMap<String, ReferenceId>,
    pub(crate) members_resolved: bool,
    pub(crate) subclasses: BTreeSet<ClassId>,
    pub(crate) subclasses_resolved: bool,
    pub(crate) utilizers: BTreeSet<ReferenceId>,
    pub(crate) utilizers_resolved: bool,
}

impl ClassData {
    pub(crate) fn has_member(&self, name: &str) -> bool {
        self.attributes.contains_key(name) || self.references.contains_key(name)
    }
}

#[derive(Debug)]
pub(crate) struct AttributeData {
    pub(crate) name: String,
    pub(crate) owner: ClassId,
    pub(crate) data_type: DataType,
}

#[derive(Debug)]
pub(crate) struct ReferenceData {
    pub(crate) name: String,
    pub(crate) owner: ClassId,
    pub(crate) target: ClassId,
    pub(crate) opposite: Option<ReferenceId>,
    pub(crate) cardinality: Cardinality,
}

impl Element {
    pub(crate) fn kind(&self) -> ElementKind {
        match self {
            Self::Package(_) => ElementKind::Package,
            Self::Class(_) => ElementKind::Class,
            Self::Attribute(_) => ElementKind::Attribute,
            Self::Reference(_) => ElementKind::Reference,
        }
    }

    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Package(p) => &p.name,
            Self::Class(c) => &c.name,
            Self::Attribute(a) => &a.name,
            Self::Reference(r) => &r.name,
        }
    }

    /// A fresh package with no children yet. Nothing to resolve.
    pub(crate) fn new_package(name: String, parent: PackageId) -> Self {
        Self::Package(PackageData {
            name,
            parent: Some(parent),
            classes: BTreeMap::new(),
            subpackages: BTreeMap::new(),
            children_resolved: true,
        })
    }

    /// A fresh class with no members, subclasses or utilizers yet.
    pub(crate) fn new_class(name: String, package: PackageId, superclass: Option<ClassId>) -> Self {
        Self::Class(ClassData {
            name,
            package,
            superclass,
            attributes: BTreeMap::new(),
            references: BTreeMap::new(),
            members_resolved: true,
            subclasses: BTreeSet::new(),
            subclasses_resolved: true,
            utilizers: BTreeSet::new(),
            utilizers_resolved: true,
        })
    }

    /// Build the loaded form of a stored record. Back-references start
    /// unresolved.
    ///
    /// # Errors
    ///
    /// `CorruptedRecord` if the record fails validation.
    pub(crate) fn from_record(record: ElementRecord) -> MetaResult<Self> {
        record
            .validate()
            .map_err(|e| MetaError::CorruptedRecord(e.to_string()))?;

        Ok(match record {
            ElementRecord::Package(r) => Self::Package(PackageData {
                name: r.name,
                parent: r.parent_id.to_option().map(PackageId::from),
                classes: BTreeMap::new(),
                subpackages: BTreeMap::new(),
                children_resolved: false,
            }),
            ElementRecord::Class(r) => Self::Class(ClassData {
                name: r.name,
                package: PackageId::from(r.package_id),
                superclass: r.superclass_id.to_option().map(ClassId::from),
                attributes: BTreeMap::new(),
                references: BTreeMap::new(),
                members_resolved: false,
                subclasses: BTreeSet::new(),
                subclasses_resolved: false,
                utilizers: BTreeSet::new(),
                utilizers_resolved: false,
            }),
            ElementRecord::Attribute(r) => Self::Attribute(AttributeData {
                name: r.name,
                owner: ClassId::from(r.class_id),
                data_type: r.data_type,
            }),
            ElementRecord::Reference(r) => Self::Reference(ReferenceData {
                name: r.name,
                owner: ClassId::from(r.class_id),
                target: ClassId::from(r.target_id),
                opposite: r.opposite_id.to_option().map(ReferenceId::from),
                cardinality: r.cardinality,
            }),
        })
    }

    /// The stored form. Absent links become `0`.
    pub(crate) fn to_record(&self, id: ElementId) -> ElementRecord {
        match self {
            Self::Package(p) => ElementRecord::Package(PackageRecord {
                id,
                name: p.name.clone(),
                parent_id: ElementId::from_option(p.parent.map(PackageId::id)),
            }),
            Self::Class(c) => ElementRecord::Class(ClassRecord {
                id,
                name: c.name.clone(),
                superclass_id: ElementId::from_option(c.superclass.map(ClassId::id)),
                package_id: c.package.id(),
            }),
            Self::Attribute(a) => ElementRecord::Attribute(AttributeRecord {
                id,
                name: a.name.clone(),
                class_id: a.owner.id(),
                data_type: a.data_type,
            }),
            Self::Reference(r) => ElementRecord::Reference(ReferenceRecord {
                id,
                name: r.name.clone(),
                class_id: r.owner.id(),
                target_id: r.target.id(),
                opposite_id: ElementId::from_option(r.opposite.map(ReferenceId::id)),
                cardinality: r.cardinality,
            }),
        }
    }
}
