//! core::verify
//!
//! Structural verification of a set of element records.
//!
//! # Checks
//!
//! - Every link points at a record of the right kind
//! - Superclass chains and package nesting are acyclic
//! - Names are unique among the children of a package
//! - Member names are unique among the direct members of a class
//! - Opposite references point back at each other
//!
//! # Invariants
//!
//! - Never mutates the records
//! - Must be deterministic: errors are reported in ascending id order per
//!   check

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::graph::HierarchyGraph;
use super::record::ElementRecord;
use super::types::{ElementId, ElementKind};

/// Errors from verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("cycle detected in superclass chain at {0}")]
    InheritanceCycle(ElementId),

    #[error("cycle detected in package nesting at {0}")]
    PackageCycle(ElementId),

    #[error("{element} links {field} to {target}, which is not a stored {expected}")]
    DanglingLink {
        element: ElementId,
        field: &'static str,
        target: ElementId,
        expected: ElementKind,
    },

    #[error("name '{name}' is used more than once in {scope}")]
    DuplicateName { scope: ElementId, name: String },

    #[error("reference {reference} has opposite {opposite}, which does not point back")]
    AsymmetricOpposite {
        reference: ElementId,
        opposite: ElementId,
    },

    /// An in-memory back-reference set disagrees with the forward links.
    #[error("stale back-reference on {0}: {1}")]
    StaleBackReference(ElementId, String),
}

/// Result of verification.
#[derive(Debug)]
pub struct VerifyResult {
    /// Whether verification passed
    pub ok: bool,
    /// Errors found during verification
    pub errors: Vec<VerifyError>,
}

impl VerifyResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: vec![],
        }
    }

    /// Create a failed result with errors.
    pub fn failure(errors: Vec<VerifyError>) -> Self {
        Self { ok: false, errors }
    }

    /// Build a result from collected errors.
    pub fn from_errors(errors: Vec<VerifyError>) -> Self {
        if errors.is_empty() {
            Self::success()
        } else {
            Self::failure(errors)
        }
    }
}

/// Verify a complete set of records.
pub fn verify_records(records: &[ElementRecord]) -> VerifyResult {
    let by_id: BTreeMap<ElementId, &ElementRecord> =
        records.iter().map(|r| (r.id(), r)).collect();
    let mut errors = Vec::new();

    check_links(&by_id, &mut errors);

    let (inheritance, nesting) = hierarchies(&by_id);
    if let Some(id) = inheritance.find_cycle() {
        errors.push(VerifyError::InheritanceCycle(id));
    }
    if let Some(id) = nesting.find_cycle() {
        errors.push(VerifyError::PackageCycle(id));
    }

    check_names(&by_id, &mut errors);
    check_opposites(&by_id, &mut errors);

    VerifyResult::from_errors(errors)
}

/// The inheritance and package-nesting hierarchies of `records`.
pub fn hierarchies(
    by_id: &BTreeMap<ElementId, &ElementRecord>,
) -> (HierarchyGraph, HierarchyGraph) {
    let mut inheritance = HierarchyGraph::new();
    let mut nesting = HierarchyGraph::new();
    for record in by_id.values() {
        match record {
            ElementRecord::Class(c) => inheritance.add_node(c.id, Some(c.superclass_id)),
            ElementRecord::Package(p) => nesting.add_node(p.id, Some(p.parent_id)),
            _ => {}
        }
    }
    (inheritance, nesting)
}

fn check_links(by_id: &BTreeMap<ElementId, &ElementRecord>, errors: &mut Vec<VerifyError>) {
    let mut expect = |element: ElementId, field: &'static str, target: ElementId, expected: ElementKind| {
        if target.is_none() {
            return;
        }
        if by_id.get(&target).map(|r| r.kind()) != Some(expected) {
            errors.push(VerifyError::DanglingLink {
                element,
                field,
                target,
                expected,
            });
        }
    };

    for record in by_id.values() {
        match record {
            ElementRecord::Package(p) => {
                expect(p.id, "parent_id", p.parent_id, ElementKind::Package)
            }
            ElementRecord::Class(c) => {
                expect(c.id, "superclass_id", c.superclass_id, ElementKind::Class);
                expect(c.id, "package_id", c.package_id, ElementKind::Package);
            }
            ElementRecord::Attribute(a) => {
                expect(a.id, "class_id", a.class_id, ElementKind::Class)
            }
            ElementRecord::Reference(r) => {
                expect(r.id, "class_id", r.class_id, ElementKind::Class);
                expect(r.id, "target_id", r.target_id, ElementKind::Class);
                expect(r.id, "opposite_id", r.opposite_id, ElementKind::Reference);
            }
        }
    }
}

fn check_names(by_id: &BTreeMap<ElementId, &ElementRecord>, errors: &mut Vec<VerifyError>) {
    let mut seen: BTreeSet<(ElementId, &str)> = BTreeSet::new();
    let mut reported: BTreeSet<(ElementId, &str)> = BTreeSet::new();

    for record in by_id.values() {
        let scope = match record {
            ElementRecord::Package(p) => p.parent_id,
            ElementRecord::Class(c) => c.package_id,
            ElementRecord::Attribute(a) => a.class_id,
            ElementRecord::Reference(r) => r.class_id,
        };
        if scope.is_none() {
            continue;
        }
        let key = (scope, record.name());
        if !seen.insert(key) && reported.insert(key) {
            errors.push(VerifyError::DuplicateName {
                scope,
                name: record.name().to_string(),
            });
        }
    }
}

fn check_opposites(by_id: &BTreeMap<ElementId, &ElementRecord>, errors: &mut Vec<VerifyError>) {
    for record in by_id.values() {
        let ElementRecord::Reference(r) = record else {
            continue;
        };
        if r.opposite_id.is_none() {
            continue;
        }
        if let Some(ElementRecord::Reference(opposite)) = by_id.get(&r.opposite_id) {
            if opposite.opposite_id != r.id {
                errors.push(VerifyError::AsymmetricOpposite {
                    reference: r.id,
                    opposite: r.opposite_id,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::primitive::{DataType, PrimitiveType};
    use crate::core::record::{AttributeRecord, ClassRecord, PackageRecord, ReferenceRecord};
    use crate::core::types::Cardinality;

    fn id(raw: u64) -> ElementId {
        ElementId::new(raw)
    }

    fn class(raw: u64, name: &str, superclass: u64) -> ElementRecord {
        ElementRecord::Class(ClassRecord {
            id: id(raw),
            name: name.into(),
            superclass_id: id(superclass),
            package_id: ElementId::ROOT,
        })
    }

    fn reference(raw: u64, owner: u64, target: u64, opposite: u64) -> ElementRecord {
        ElementRecord::Reference(ReferenceRecord {
            id: id(raw),
            name: format!("r{raw}"),
            class_id: id(owner),
            target_id: id(target),
            opposite_id: id(opposite),
            cardinality: Cardinality::Multi,
        })
    }

    fn healthy() -> Vec<ElementRecord> {
        vec![
            ElementRecord::root_package(),
            class(2, "Animal", 0),
            class(3, "Dog", 2),
            ElementRecord::Attribute(AttributeRecord {
                id: id(4),
                name: "name".into(),
                class_id: id(2),
                data_type: DataType::of(PrimitiveType::String),
            }),
            reference(5, 3, 2, 6),
            reference(6, 2, 3, 5),
        ]
    }

    #[test]
    fn healthy_records_pass() {
        let result = verify_records(&healthy());
        assert!(result.ok, "{:?}", result.errors);
    }

    #[test]
    fn inheritance_cycle_detected() {
        let mut records = healthy();
        records[1] = class(2, "Animal", 3);
        let result = verify_records(&records);
        assert!(!result.ok);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::InheritanceCycle(_))));
    }

    #[test]
    fn package_cycle_detected() {
        let mut records = healthy();
        records.push(ElementRecord::Package(PackageRecord {
            id: id(10),
            name: "a".into(),
            parent_id: id(11),
        }));
        records.push(ElementRecord::Package(PackageRecord {
            id: id(11),
            name: "b".into(),
            parent_id: id(10),
        }));
        let result = verify_records(&records);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::PackageCycle(_))));
    }

    #[test]
    fn dangling_superclass_detected() {
        let mut records = healthy();
        records.push(class(7, "Ghost", 99));
        let result = verify_records(&records);
        assert_eq!(
            result.errors,
            vec![VerifyError::DanglingLink {
                element: id(7),
                field: "superclass_id",
                target: id(99),
                expected: ElementKind::Class,
            }]
        );
    }

    #[test]
    fn wrong_kind_link_detected() {
        let mut records = healthy();
        records.push(reference(8, 3, 4, 0));
        let result = verify_records(&records);
        assert!(matches!(
            result.errors.as_slice(),
            [VerifyError::DanglingLink { field: "target_id", .. }]
        ));
    }

    #[test]
    fn duplicate_names_reported_once() {
        let mut records = healthy();
        records.push(class(7, "Dog", 0));
        records.push(class(8, "Dog", 0));
        let result = verify_records(&records);
        assert_eq!(
            result.errors,
            vec![VerifyError::DuplicateName {
                scope: ElementId::ROOT,
                name: "Dog".into(),
            }]
        );
    }

    #[test]
    fn attribute_and_reference_share_a_namespace() {
        let mut records = healthy();
        records.push(ElementRecord::Attribute(AttributeRecord {
            id: id(9),
            name: "r5".into(),
            class_id: id(3),
            data_type: DataType::of(PrimitiveType::Any),
        }));
        assert!(!verify_records(&records).ok);
    }

    #[test]
    fn asymmetric_opposite_detected() {
        let mut records = healthy();
        records[5] = reference(6, 2, 3, 0);
        let result = verify_records(&records);
        assert_eq!(
            result.errors,
            vec![VerifyError::AsymmetricOpposite {
                reference: id(5),
                opposite: id(6),
            }]
        );
    }
}
