//! core::record
//!
//! Stored element records and the store document (v1).
//!
//! # Schema Design
//!
//! - One record shape per element kind, tagged by `kind`
//! - Links are plain ids; an absent link is stored as `0`
//! - Strictly parsed (unknown fields rejected)
//! - The store document is self-describing with `kind` and
//!   `schema_version` and carries a fingerprint over its records
//!
//! # Example
//!
//! ```
//! use schemata::core::record::{parse_document, ElementRecord, StoreDocumentV1};
//! use schemata::core::types::ElementId;
//!
//! let records = vec![ElementRecord::root_package()];
//! let doc = StoreDocumentV1::new(ElementId::FIRST_ASSIGNABLE, records).unwrap();
//!
//! let json = serde_json::to_string(&doc).unwrap();
//! let parsed = parse_document(&json).unwrap();
//! assert_eq!(parsed.records.len(), 1);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::naming::validate_name;
use crate::core::primitive::DataType;
use crate::core::types::{
    Cardinality, ElementId, ElementKind, SchemaFingerprint, UtcTimestamp,
};

/// The kind identifier for store documents.
pub const STORE_KIND: &str = "schemata.store";

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Name of the root package.
pub const ROOT_PACKAGE_NAME: &str = "default";

/// Errors from record parsing and validation.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to parse store document: {0}")]
    ParseError(String),

    #[error("invalid kind '{found}', expected '{}'", STORE_KIND)]
    InvalidKind { found: String },

    #[error("unsupported schema version {0}, supported: {SCHEMA_VERSION}")]
    UnsupportedVersion(u32),

    #[error("fingerprint mismatch: stored {stored}, computed {computed}")]
    FingerprintMismatch { stored: String, computed: String },

    #[error("duplicate record id {0}")]
    DuplicateId(ElementId),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// A stored package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageRecord {
    pub id: ElementId,
    pub name: String,
    pub parent_id: ElementId,
}

/// A stored class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassRecord {
    pub id: ElementId,
    pub name: String,
    pub superclass_id: ElementId,
    pub package_id: ElementId,
}

/// A stored attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeRecord {
    pub id: ElementId,
    pub name: String,
    pub class_id: ElementId,
    pub data_type: DataType,
}

/// A stored reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceRecord {
    pub id: ElementId,
    pub name: String,
    pub class_id: ElementId,
    pub target_id: ElementId,
    pub opposite_id: ElementId,
    pub cardinality: Cardinality,
}

/// Any stored element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementRecord {
    Package(PackageRecord),
    Class(ClassRecord),
    Attribute(AttributeRecord),
    Reference(ReferenceRecord),
}

/// Back-reference queries an adapter answers.
///
/// Each relation names the records that point at a given id through one
/// link field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Packages whose `parent_id` and classes whose `package_id` is the id.
    Children,
    /// Attributes and references whose `class_id` is the id.
    Members,
    /// Classes whose `superclass_id` is the id.
    Subclasses,
    /// References whose `target_id` is the id.
    Utilizers,
}

impl ElementRecord {
    /// The record every store starts with.
    pub fn root_package() -> Self {
        Self::Package(PackageRecord {
            id: ElementId::ROOT,
            name: ROOT_PACKAGE_NAME.to_string(),
            parent_id: ElementId::NONE,
        })
    }

    pub fn id(&self) -> ElementId {
        match self {
            Self::Package(r) => r.id,
            Self::Class(r) => r.id,
            Self::Attribute(r) => r.id,
            Self::Reference(r) => r.id,
        }
    }

    /// Replace the id. Adapters call this when they assign one.
    pub fn with_id(mut self, id: ElementId) -> Self {
        match &mut self {
            Self::Package(r) => r.id = id,
            Self::Class(r) => r.id = id,
            Self::Attribute(r) => r.id = id,
            Self::Reference(r) => r.id = id,
        }
        self
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Package(_) => ElementKind::Package,
            Self::Class(_) => ElementKind::Class,
            Self::Attribute(_) => ElementKind::Attribute,
            Self::Reference(_) => ElementKind::Reference,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Package(r) => &r.name,
            Self::Class(r) => &r.name,
            Self::Attribute(r) => &r.name,
            Self::Reference(r) => &r.name,
        }
    }

    /// Whether this record points at `id` through `relation`.
    pub fn points_to(&self, relation: Relation, id: ElementId) -> bool {
        if id.is_none() {
            return false;
        }
        match (relation, self) {
            (Relation::Children, Self::Package(r)) => r.parent_id == id,
            (Relation::Children, Self::Class(r)) => r.package_id == id,
            (Relation::Members, Self::Attribute(r)) => r.class_id == id,
            (Relation::Members, Self::Reference(r)) => r.class_id == id,
            (Relation::Subclasses, Self::Class(r)) => r.superclass_id == id,
            (Relation::Utilizers, Self::Reference(r)) => r.target_id == id,
            _ => false,
        }
    }

    /// Check the fields a store may not contain.
    ///
    /// # Errors
    ///
    /// [`RecordError::InvalidRecord`] for a zero id, an invalid name, a
    /// member without an owner, or a non-root package without a parent.
    pub fn validate(&self) -> Result<(), RecordError> {
        let id = self.id();
        if id.is_none() {
            return Err(RecordError::InvalidRecord(format!(
                "{} '{}' has id 0",
                self.kind(),
                self.name()
            )));
        }
        validate_name(self.name())
            .map_err(|e| RecordError::InvalidRecord(format!("{} {id}: {e}", self.kind())))?;

        let missing = match self {
            Self::Package(r) => (id != ElementId::ROOT && r.parent_id.is_none()).then_some("parent_id"),
            Self::Class(r) => r.package_id.is_none().then_some("package_id"),
            Self::Attribute(r) => r.class_id.is_none().then_some("class_id"),
            Self::Reference(r) => {
                if r.class_id.is_none() {
                    Some("class_id")
                } else if r.target_id.is_none() {
                    Some("target_id")
                } else {
                    None
                }
            }
        };
        match missing {
            Some(field) => Err(RecordError::InvalidRecord(format!(
                "{} {id} has no {field}",
                self.kind()
            ))),
            None => Ok(()),
        }
    }

    /// Serialize to canonical JSON (compact, deterministic).
    pub fn to_canonical_json(&self) -> Result<String, RecordError> {
        serde_json::to_string(self).map_err(|e| RecordError::ParseError(e.to_string()))
    }
}

/// Parse a single record.
///
/// # Errors
///
/// [`RecordError::ParseError`] for malformed JSON or unknown fields,
/// [`RecordError::InvalidRecord`] if [`ElementRecord::validate`] fails.
pub fn parse_record(json: &str) -> Result<ElementRecord, RecordError> {
    let record: ElementRecord =
        serde_json::from_str(json).map_err(|e| RecordError::ParseError(e.to_string()))?;
    record.validate()?;
    Ok(record)
}

/// Envelope for version dispatch before full parsing.
#[derive(Debug, Deserialize)]
struct DocumentEnvelope {
    kind: String,
    schema_version: u32,
}

/// Parse a store document with version dispatch.
///
/// # Errors
///
/// Returns an error if:
/// - The JSON is malformed
/// - The `kind` field doesn't match [`STORE_KIND`]
/// - The `schema_version` is not supported
/// - The fingerprint does not match the records
/// - Any record is invalid or two records share an id
pub fn parse_document(json: &str) -> Result<StoreDocumentV1, RecordError> {
    let envelope: DocumentEnvelope =
        serde_json::from_str(json).map_err(|e| RecordError::ParseError(e.to_string()))?;

    if envelope.kind != STORE_KIND {
        return Err(RecordError::InvalidKind {
            found: envelope.kind,
        });
    }

    match envelope.schema_version {
        1 => {
            let doc: StoreDocumentV1 =
                serde_json::from_str(json).map_err(|e| RecordError::ParseError(e.to_string()))?;
            doc.validate()?;
            Ok(doc)
        }
        v => Err(RecordError::UnsupportedVersion(v)),
    }
}

/// The on-disk form of a file store (v1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StoreDocumentV1 {
    /// Kind identifier (always "schemata.store")
    pub kind: String,

    /// Schema version (always 1 for this struct)
    pub schema_version: u32,

    /// Next id the store will assign
    pub next_id: u64,

    /// Hash over the canonical records
    pub fingerprint: SchemaFingerprint,

    /// When the document was written
    pub saved_at: UtcTimestamp,

    /// Records, sorted by id
    pub records: Vec<ElementRecord>,
}

impl StoreDocumentV1 {
    /// Build a document over `records`, sorting them and computing the
    /// fingerprint.
    pub fn new(next_id: u64, mut records: Vec<ElementRecord>) -> Result<Self, RecordError> {
        records.sort_by_key(ElementRecord::id);
        let fingerprint = fingerprint(&records)?;
        Ok(Self {
            kind: STORE_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            next_id,
            fingerprint,
            saved_at: UtcTimestamp::now(),
            records,
        })
    }

    /// Validate the document.
    ///
    /// This checks that:
    /// - `kind` matches [`STORE_KIND`]
    /// - `schema_version` equals [`SCHEMA_VERSION`]
    /// - every record is valid and ids are unique
    /// - `next_id` is above every stored id
    /// - the stored fingerprint matches the records
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.kind != STORE_KIND {
            return Err(RecordError::InvalidKind {
                found: self.kind.clone(),
            });
        }
        if self.schema_version != SCHEMA_VERSION {
            return Err(RecordError::UnsupportedVersion(self.schema_version));
        }

        let mut seen = BTreeSet::new();
        for record in &self.records {
            record.validate()?;
            if !seen.insert(record.id()) {
                return Err(RecordError::DuplicateId(record.id()));
            }
        }
        if let Some(max) = seen.last() {
            if self.next_id <= max.raw() {
                return Err(RecordError::InvalidRecord(format!(
                    "next_id {} is not above stored id {max}",
                    self.next_id
                )));
            }
        }

        let computed = fingerprint(&self.records)?;
        if computed != self.fingerprint {
            return Err(RecordError::FingerprintMismatch {
                stored: self.fingerprint.to_string(),
                computed: computed.to_string(),
            });
        }
        Ok(())
    }
}

fn fingerprint(records: &[ElementRecord]) -> Result<SchemaFingerprint, RecordError> {
    let entries = records
        .iter()
        .map(|r| Ok((r.id(), r.to_canonical_json()?)))
        .collect::<Result<Vec<_>, RecordError>>()?;
    Ok(SchemaFingerprint::compute(&entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::primitive::PrimitiveType;

    fn class(id: u64, name: &str, superclass: u64) -> ElementRecord {
        ElementRecord::Class(ClassRecord {
            id: ElementId::new(id),
            name: name.to_string(),
            superclass_id: ElementId::new(superclass),
            package_id: ElementId::ROOT,
        })
    }

    mod records {
        use super::*;

        #[test]
        fn serialized_shapes() {
            let attribute = ElementRecord::Attribute(AttributeRecord {
                id: ElementId::new(4),
                name: "tags".into(),
                class_id: ElementId::new(3),
                data_type: DataType::container_of(PrimitiveType::List, PrimitiveType::String)
                    .unwrap(),
            });
            let reference = ElementRecord::Reference(ReferenceRecord {
                id: ElementId::new(5),
                name: "owner".into(),
                class_id: ElementId::new(3),
                target_id: ElementId::new(2),
                opposite_id: ElementId::NONE,
                cardinality: Cardinality::Single,
            });
            insta::assert_json_snapshot!(
                vec![ElementRecord::root_package(), class(3, "Dog", 2), attribute, reference],
                @r###"
            [
              {
                "kind": "package",
                "id": 1,
                "name": "default",
                "parent_id": 0
              },
              {
                "kind": "class",
                "id": 3,
                "name": "Dog",
                "superclass_id": 2,
                "package_id": 1
              },
              {
                "kind": "attribute",
                "id": 4,
                "name": "tags",
                "class_id": 3,
                "data_type": "list<string>"
              },
              {
                "kind": "reference",
                "id": 5,
                "name": "owner",
                "class_id": 3,
                "target_id": 2,
                "opposite_id": 0,
                "cardinality": "single"
              }
            ]
            "###
            );
        }

        #[test]
        fn unknown_fields_rejected() {
            let json = r#"{"kind":"package","id":2,"name":"zoo","parent_id":1,"extra":true}"#;
            assert!(matches!(parse_record(json), Err(RecordError::ParseError(_))));
        }

        #[test]
        fn unknown_data_type_rejected() {
            let json = r#"{"kind":"attribute","id":4,"name":"a","class_id":3,"data_type":"float"}"#;
            assert!(matches!(parse_record(json), Err(RecordError::ParseError(_))));
        }

        #[test]
        fn zero_id_rejected() {
            let json = r#"{"kind":"class","id":0,"name":"A","superclass_id":0,"package_id":1}"#;
            assert!(matches!(parse_record(json), Err(RecordError::InvalidRecord(_))));
        }

        #[test]
        fn orphan_package_rejected() {
            let json = r#"{"kind":"package","id":7,"name":"zoo","parent_id":0}"#;
            assert!(matches!(parse_record(json), Err(RecordError::InvalidRecord(_))));
            assert!(ElementRecord::root_package().validate().is_ok());
        }

        #[test]
        fn with_id_replaces_id() {
            let record = class(0, "A", 0).with_id(ElementId::new(9));
            assert_eq!(record.id(), ElementId::new(9));
            assert_eq!(record.kind(), ElementKind::Class);
            assert_eq!(record.name(), "A");
        }

        #[test]
        fn points_to_follows_link_fields() {
            let sub = class(3, "B", 2);
            assert!(sub.points_to(Relation::Subclasses, ElementId::new(2)));
            assert!(sub.points_to(Relation::Children, ElementId::ROOT));
            assert!(!sub.points_to(Relation::Members, ElementId::new(2)));
            assert!(!class(4, "C", 0).points_to(Relation::Subclasses, ElementId::NONE));
        }
    }

    mod document {
        use super::*;

        fn sample() -> StoreDocumentV1 {
            StoreDocumentV1::new(
                4,
                vec![class(3, "B", 2), ElementRecord::root_package(), class(2, "A", 0)],
            )
            .unwrap()
        }

        #[test]
        fn new_sorts_records() {
            let ids: Vec<_> = sample().records.iter().map(|r| r.id().raw()).collect();
            assert_eq!(ids, vec![1, 2, 3]);
        }

        #[test]
        fn parse_roundtrip() {
            let doc = sample();
            let json = serde_json::to_string_pretty(&doc).unwrap();
            assert_eq!(parse_document(&json).unwrap(), doc);
        }

        #[test]
        fn invalid_kind() {
            let json = r#"{"kind": "wrong-kind", "schema_version": 1}"#;
            assert!(matches!(
                parse_document(json),
                Err(RecordError::InvalidKind { .. })
            ));
        }

        #[test]
        fn unsupported_version() {
            let json = r#"{"kind": "schemata.store", "schema_version": 99}"#;
            assert!(matches!(
                parse_document(json),
                Err(RecordError::UnsupportedVersion(99))
            ));
        }

        #[test]
        fn tampered_record_detected() {
            let mut doc = sample();
            doc.records[1] = class(2, "Renamed", 0);
            let json = serde_json::to_string(&doc).unwrap();
            assert!(matches!(
                parse_document(&json),
                Err(RecordError::FingerprintMismatch { .. })
            ));
        }

        #[test]
        fn duplicate_ids_rejected() {
            let doc = StoreDocumentV1::new(5, vec![class(2, "A", 0), class(2, "B", 0)]).unwrap();
            assert!(matches!(doc.validate(), Err(RecordError::DuplicateId(_))));
        }

        #[test]
        fn stale_next_id_rejected() {
            let doc = StoreDocumentV1::new(3, vec![class(3, "A", 0)]).unwrap();
            assert!(matches!(doc.validate(), Err(RecordError::InvalidRecord(_))));
        }
    }
}
