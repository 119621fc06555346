//! core::primitive
//!
//! The closed set of primitive type tags and their identifier registry.
//!
//! # Identifiers
//!
//! Every tag has a canonical lowercase identifier (`"string"`, `"int64"`,
//! `"list"`, ...). The registry mapping identifiers to tags is built once,
//! on first use, and never changes afterwards.
//!
//! # Data types
//!
//! Attributes are typed with a [`DataType`]: either a scalar tag or a
//! container tag qualified with the scalar element type it holds. The
//! textual form is `string`, `list<string>`, `dictionary<any>`; a bare
//! container identifier means a container of `any`.
//!
//! # Example
//!
//! ```
//! use schemata::core::primitive::{get_primitive_type, DataType, PrimitiveType};
//!
//! assert_eq!(get_primitive_type("int64"), Some(PrimitiveType::Int64));
//! assert_eq!(get_primitive_type("decimal"), None);
//!
//! let tags = DataType::parse("set<string>").unwrap();
//! assert_eq!(tags.container(), Some(PrimitiveType::Set));
//! assert_eq!(tags.element(), PrimitiveType::String);
//! assert_eq!(tags.identifier(), "set<string>");
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::core::error::{MetaError, MetaResult};

/// A primitive type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveType {
    Any,
    Number,
    Boolean,
    String,
    DateTime,
    Binary,
    Regex,
    Code,
    Ref,
    Integer,
    Int64,
    List,
    Set,
    Dictionary,
}

impl PrimitiveType {
    /// Every tag, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::Any,
        Self::Number,
        Self::Boolean,
        Self::String,
        Self::DateTime,
        Self::Binary,
        Self::Regex,
        Self::Code,
        Self::Ref,
        Self::Integer,
        Self::Int64,
        Self::List,
        Self::Set,
        Self::Dictionary,
    ];

    /// The canonical identifier.
    pub fn identifier(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::DateTime => "datetime",
            Self::Binary => "binary",
            Self::Regex => "regex",
            Self::Code => "code",
            Self::Ref => "ref",
            Self::Integer => "integer",
            Self::Int64 => "int64",
            Self::List => "list",
            Self::Set => "set",
            Self::Dictionary => "dictionary",
        }
    }

    /// Whether this is one of the container tags.
    pub fn is_container(self) -> bool {
        matches!(self, Self::List | Self::Set | Self::Dictionary)
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}

static REGISTRY: LazyLock<HashMap<&'static str, PrimitiveType>> = LazyLock::new(|| {
    PrimitiveType::ALL
        .iter()
        .map(|t| (t.identifier(), *t))
        .collect()
});

/// Look up a tag by identifier.
pub fn get_primitive_type(identifier: &str) -> Option<PrimitiveType> {
    REGISTRY.get(identifier).copied()
}

/// Whether `identifier` names a primitive type.
pub fn is_primitive_type_identifier(identifier: &str) -> bool {
    REGISTRY.contains_key(identifier)
}

/// The declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Scalar(PrimitiveType),
    Container {
        container: PrimitiveType,
        element: PrimitiveType,
    },
}

impl DataType {
    /// Build a data type from a single tag. Container tags hold `any`.
    pub fn of(tag: PrimitiveType) -> Self {
        if tag.is_container() {
            Self::Container {
                container: tag,
                element: PrimitiveType::Any,
            }
        } else {
            Self::Scalar(tag)
        }
    }

    /// A container of `element`.
    ///
    /// # Errors
    ///
    /// `InvalidValueType` if `container` is not a container tag or
    /// `element` is one.
    pub fn container_of(container: PrimitiveType, element: PrimitiveType) -> MetaResult<Self> {
        if !container.is_container() {
            return Err(MetaError::InvalidValueType(format!(
                "'{container}' is not a container type"
            )));
        }
        if element.is_container() {
            return Err(MetaError::InvalidValueType(format!(
                "containers cannot hold '{element}'"
            )));
        }
        Ok(Self::Container { container, element })
    }

    /// Parse the textual form.
    ///
    /// # Errors
    ///
    /// `UnknownValueType` for unknown identifiers or malformed text,
    /// `InvalidValueType` for nested containers.
    pub fn parse(text: &str) -> MetaResult<Self> {
        let lookup = |id: &str| {
            get_primitive_type(id).ok_or_else(|| MetaError::UnknownValueType(id.to_string()))
        };

        match text.split_once('<') {
            None => Ok(Self::of(lookup(text)?)),
            Some((container, rest)) => {
                let element = rest
                    .strip_suffix('>')
                    .ok_or_else(|| MetaError::UnknownValueType(text.to_string()))?;
                Self::container_of(lookup(container)?, lookup(element)?)
            }
        }
    }

    /// The tag values are checked against: the scalar tag, or the element
    /// tag of a container.
    pub fn element(self) -> PrimitiveType {
        match self {
            Self::Scalar(tag) => tag,
            Self::Container { element, .. } => element,
        }
    }

    /// The container tag, if this is a container type.
    pub fn container(self) -> Option<PrimitiveType> {
        match self {
            Self::Scalar(_) => None,
            Self::Container { container, .. } => Some(container),
        }
    }

    pub fn is_container(self) -> bool {
        self.container().is_some()
    }

    /// The canonical textual form.
    pub fn identifier(self) -> String {
        match self {
            Self::Scalar(tag) => tag.identifier().to_string(),
            Self::Container { container, element } => format!("{container}<{element}>"),
        }
    }
}

impl From<PrimitiveType> for DataType {
    fn from(tag: PrimitiveType) -> Self {
        Self::of(tag)
    }
}

impl TryFrom<String> for DataType {
    type Error = MetaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<DataType> for String {
    fn from(data_type: DataType) -> Self {
        data_type.identifier()
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorReason;

    #[test]
    fn registry_is_total_over_tags() {
        for tag in PrimitiveType::ALL {
            assert!(is_primitive_type_identifier(tag.identifier()));
            assert_eq!(get_primitive_type(tag.identifier()), Some(tag));
        }
    }

    #[test]
    fn unknown_identifier_is_not_found() {
        assert!(!is_primitive_type_identifier("String"));
        assert_eq!(get_primitive_type(""), None);
    }

    #[test]
    fn identifiers_are_lowercase_and_distinct() {
        let mut seen = std::collections::HashSet::new();
        for tag in PrimitiveType::ALL {
            let id = tag.identifier();
            assert_eq!(id, id.to_lowercase());
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn bare_container_holds_any() {
        let list = DataType::parse("list").unwrap();
        assert_eq!(list.element(), PrimitiveType::Any);
        assert_eq!(list.identifier(), "list<any>");
    }

    #[test]
    fn nested_containers_rejected() {
        let err = DataType::parse("list<set>").unwrap_err();
        assert_eq!(err.reason(), ErrorReason::InvalidValueType);
    }

    #[test]
    fn scalar_cannot_be_container() {
        let err = DataType::container_of(PrimitiveType::String, PrimitiveType::Any).unwrap_err();
        assert_eq!(err.reason(), ErrorReason::InvalidValueType);
    }

    #[test]
    fn malformed_text_is_unknown() {
        assert_eq!(
            DataType::parse("list<string").unwrap_err().reason(),
            ErrorReason::UnknownValueType
        );
        assert_eq!(
            DataType::parse("text").unwrap_err().reason(),
            ErrorReason::UnknownValueType
        );
    }

    #[test]
    fn serde_uses_identifier() {
        let data_type = DataType::container_of(PrimitiveType::Dictionary, PrimitiveType::Int64).unwrap();
        let json = serde_json::to_string(&data_type).unwrap();
        assert_eq!(json, "\"dictionary<int64>\"");
        let parsed: DataType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, data_type);
    }
}
