//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`ElementId`] - Adapter-assigned identity of a schema element
//! - [`ElementKind`] - Which kind of element an id designates
//! - [`PackageId`], [`ClassId`], [`AttributeId`], [`ReferenceId`] - Typed handles
//! - [`Cardinality`] - Single or multi-valued reference
//! - [`ObjectId`] - Identity of a schema-validated object (instance)
//! - [`UtcTimestamp`] - RFC3339 timestamp
//! - [`SchemaFingerprint`] - Hash over a set of stored records
//!
//! # Identity
//!
//! Element ids are plain `u64`s. `0` is the "no id" sentinel used when a
//! record has no superclass, parent or opposite; it is never assigned. `1`
//! is the root package. Adapters hand out ids starting at
//! [`ElementId::FIRST_ASSIGNABLE`].
//!
//! # Examples
//!
//! ```
//! use schemata::core::types::{ClassId, ElementId};
//!
//! let id = ElementId::new(42);
//! let class = ClassId::from(id);
//! assert_eq!(class.id(), id);
//! assert!(ElementId::NONE.is_none());
//! assert_eq!(ElementId::from_option(None), ElementId::NONE);
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity of a schema element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u64);

impl ElementId {
    /// The "no id" sentinel.
    pub const NONE: Self = Self(0);

    /// The well-known id of the root package.
    pub const ROOT: Self = Self(1);

    /// First id an adapter may assign to a new element.
    pub const FIRST_ASSIGNABLE: u64 = 2;

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Map the sentinel to `None`.
    pub fn to_option(self) -> Option<Self> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }

    /// Map `None` to the sentinel.
    pub fn from_option(id: Option<Self>) -> Self {
        id.unwrap_or(Self::NONE)
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a schema element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Package,
    Class,
    Attribute,
    Reference,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Class => "class",
            Self::Attribute => "attribute",
            Self::Reference => "reference",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! element_handle {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(ElementId);

        impl $name {
            /// The kind of element this handle designates.
            pub const KIND: ElementKind = $kind;

            /// The underlying element id.
            pub const fn id(self) -> ElementId {
                self.0
            }
        }

        impl From<ElementId> for $name {
            fn from(id: ElementId) -> Self {
                Self(id)
            }
        }

        impl From<$name> for ElementId {
            fn from(handle: $name) -> Self {
                handle.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} {}", Self::KIND, self.0)
            }
        }
    };
}

element_handle!(
    /// Handle to a package in a [`Metamodel`](crate::model::Metamodel).
    PackageId,
    ElementKind::Package
);
element_handle!(
    /// Handle to a class.
    ClassId,
    ElementKind::Class
);
element_handle!(
    /// Handle to an attribute.
    AttributeId,
    ElementKind::Attribute
);
element_handle!(
    /// Handle to a reference.
    ReferenceId,
    ElementKind::Reference
);

impl PackageId {
    /// The root package.
    pub const ROOT: Self = Self(ElementId::ROOT);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

/// How many objects a reference may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Single,
    Multi,
}

impl Cardinality {
    pub fn is_multi(self) -> bool {
        self == Self::Multi
    }
}

/// Identity of an object (instance of a class).
///
/// Objects are not schema elements and are not numbered by the adapter;
/// they carry a random v4 uuid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(uuid::Uuid);

impl ObjectId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp in RFC3339 format.
///
/// # Example
///
/// ```
/// use schemata::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A stable hash over stored element records.
///
/// The file adapter stores the fingerprint next to its records and
/// recomputes it on load to detect a damaged document.
///
/// # Example
///
/// ```
/// use schemata::core::types::{ElementId, SchemaFingerprint};
///
/// let entries = vec![
///     (ElementId::new(3), r#"{"kind":"class"}"#.to_string()),
///     (ElementId::new(2), r#"{"kind":"package"}"#.to_string()),
/// ];
///
/// let fp = SchemaFingerprint::compute(&entries);
///
/// // Same records produce the same fingerprint
/// let fp2 = SchemaFingerprint::compute(&entries);
/// assert_eq!(fp, fp2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaFingerprint(String);

impl SchemaFingerprint {
    /// Compute a fingerprint from `(id, canonical record text)` pairs.
    ///
    /// Entries are sorted by id before hashing, so input order does not
    /// matter.
    pub fn compute(entries: &[(ElementId, String)]) -> Self {
        let mut sorted: Vec<_> = entries.iter().collect();
        sorted.sort_by_key(|(id, _)| *id);

        let mut hasher = Sha256::new();
        for (id, text) in sorted {
            hasher.update(id.raw().to_be_bytes());
            hasher.update(b"\0");
            hasher.update(text.as_bytes());
            hasher.update(b"\n");
        }

        let result = hasher.finalize();
        Self(hex::encode(result))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod element_id {
        use super::*;

        #[test]
        fn sentinel_round_trips_through_option() {
            assert_eq!(ElementId::NONE.to_option(), None);
            assert_eq!(ElementId::new(9).to_option(), Some(ElementId::new(9)));
            assert_eq!(ElementId::from_option(None), ElementId::NONE);
        }

        #[test]
        fn root_is_not_assignable() {
            assert!(ElementId::ROOT.raw() < ElementId::FIRST_ASSIGNABLE);
            assert!(!ElementId::ROOT.is_none());
        }

        #[test]
        fn serializes_as_plain_number() {
            let json = serde_json::to_string(&ElementId::new(17)).unwrap();
            assert_eq!(json, "17");
            let handle: ClassId = serde_json::from_str("17").unwrap();
            assert_eq!(handle.id(), ElementId::new(17));
        }

        #[test]
        fn display_includes_kind() {
            let class = ClassId::from(ElementId::new(5));
            assert_eq!(class.to_string(), "class #5");
            assert!(PackageId::ROOT.is_root());
        }
    }

    mod fingerprint {
        use super::*;

        #[test]
        fn order_independent() {
            let a = (ElementId::new(2), "a".to_string());
            let b = (ElementId::new(3), "b".to_string());
            let fp1 = SchemaFingerprint::compute(&[a.clone(), b.clone()]);
            let fp2 = SchemaFingerprint::compute(&[b, a]);
            assert_eq!(fp1, fp2);
        }

        #[test]
        fn sensitive_to_content() {
            let fp1 = SchemaFingerprint::compute(&[(ElementId::new(2), "a".into())]);
            let fp2 = SchemaFingerprint::compute(&[(ElementId::new(2), "b".into())]);
            assert_ne!(fp1, fp2);
            assert_eq!(fp1.as_str().len(), 64);
        }
    }

    #[test]
    fn object_ids_are_unique() {
        assert_ne!(ObjectId::generate(), ObjectId::generate());
    }
}
