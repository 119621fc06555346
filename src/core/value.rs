//! core::value
//!
//! Scalar values and their validation against primitive types.
//!
//! # Acceptance
//!
//! - A scalar tag accepts values of exactly that tag
//! - `any` accepts every scalar
//! - `number` also accepts `integer` and `int64` values
//! - Container tags accept no scalar (containers hold scalars, not the
//!   other way around)
//!
//! # Ordering
//!
//! Scalars are totally ordered so sets of them are well defined: first by
//! tag, then by value (numbers via [`f64::total_cmp`]).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::core::collection::{TypedDictionary, TypedList, TypedSet};
use crate::core::error::{MetaError, MetaResult};
use crate::core::primitive::PrimitiveType;
use crate::core::types::{ClassId, ObjectId};

/// A compiled regular expression that remembers its source.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: regex::Regex,
}

impl Pattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// `InvalidValueType` if the pattern does not compile.
    pub fn new(source: impl Into<String>) -> MetaResult<Self> {
        let source = source.into();
        let compiled = regex::Regex::new(&source)
            .map_err(|e| MetaError::InvalidValueType(format!("invalid regex: {e}")))?;
        Ok(Self { source, compiled })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.compiled.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl PartialOrd for Pattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source.cmp(&other.source)
    }
}

/// A typed pointer to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef {
    pub object: ObjectId,
    pub class: ClassId,
}

/// A single scalar value.
#[derive(Debug, Clone)]
pub enum Scalar {
    Number(f64),
    Boolean(bool),
    String(String),
    DateTime(DateTime<Utc>),
    Binary(Vec<u8>),
    Regex(Pattern),
    Code(String),
    Ref(ObjectRef),
    Integer(i32),
    Int64(i64),
}

impl Scalar {
    /// The tag this value carries.
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Self::Number(_) => PrimitiveType::Number,
            Self::Boolean(_) => PrimitiveType::Boolean,
            Self::String(_) => PrimitiveType::String,
            Self::DateTime(_) => PrimitiveType::DateTime,
            Self::Binary(_) => PrimitiveType::Binary,
            Self::Regex(_) => PrimitiveType::Regex,
            Self::Code(_) => PrimitiveType::Code,
            Self::Ref(_) => PrimitiveType::Ref,
            Self::Integer(_) => PrimitiveType::Integer,
            Self::Int64(_) => PrimitiveType::Int64,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Code(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object_ref(&self) -> Option<&ObjectRef> {
        match self {
            Self::Ref(r) => Some(r),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Boolean(_) => 1,
            Self::String(_) => 2,
            Self::DateTime(_) => 3,
            Self::Binary(_) => 4,
            Self::Regex(_) => 5,
            Self::Code(_) => 6,
            Self::Ref(_) => 7,
            Self::Integer(_) => 8,
            Self::Int64(_) => 9,
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scalar {}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) | (Self::Code(a), Self::Code(b)) => a.cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (Self::Binary(a), Self::Binary(b)) => a.cmp(b),
            (Self::Regex(a), Self::Regex(b)) => a.cmp(b),
            (Self::Ref(a), Self::Ref(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Self::Integer(n)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Self::Int64(n)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<ObjectRef> for Scalar {
    fn from(r: ObjectRef) -> Self {
        Self::Ref(r)
    }
}

impl PrimitiveType {
    /// Whether a value of this type may hold `value`.
    pub fn accepts(self, value: &Scalar) -> bool {
        match self {
            Self::Any => true,
            Self::List | Self::Set | Self::Dictionary => false,
            Self::Number => matches!(
                value,
                Scalar::Number(_) | Scalar::Integer(_) | Scalar::Int64(_)
            ),
            tag => value.primitive_type() == tag,
        }
    }

    /// Check `value` against this type.
    ///
    /// # Errors
    ///
    /// `InvalidValueType` when the value is not accepted.
    pub fn check(self, value: &Scalar) -> MetaResult<()> {
        if self.accepts(value) {
            Ok(())
        } else {
            Err(MetaError::InvalidValueType(format!(
                "expected {self}, got {}",
                value.primitive_type()
            )))
        }
    }
}

/// A value held by an object for one attribute.
#[derive(Debug)]
pub enum Value {
    Scalar(Scalar),
    List(TypedList),
    Set(TypedSet),
    Dictionary(TypedDictionary),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TypedList> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&TypedSet> {
        match self {
            Self::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&TypedDictionary> {
        match self {
            Self::Dictionary(d) => Some(d),
            _ => None,
        }
    }
}
