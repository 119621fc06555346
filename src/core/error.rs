//! core::error
//!
//! The single error type raised by every metamodel operation.
//!
//! # Design
//!
//! Failures are not split into per-component hierarchies. Every operation
//! returns [`MetaError`], whose variant names the reason. Callers that only
//! care about the category match on [`MetaError::reason`], which returns the
//! fieldless [`ErrorReason`].
//!
//! # Guarantees
//!
//! - Errors are raised synchronously at the offending call
//! - A failed call leaves the graph exactly as it was before the call
//! - Nothing is retried; every reason except [`ErrorReason::CorruptedRecord`]
//!   and [`ErrorReason::FlushFailed`] is a caller-correctable precondition
//!   violation
//! - A flush failure never undoes the mutation that triggered it: the
//!   changes stay applied and pending, and [`MetaError::FlushFailed`] says so
//!
//! Storage errors arrive through `From` impls kept next to the adapter
//! types, so this module does not know about any backend.
//!
//! # Example
//!
//! ```
//! use schemata::core::error::{ErrorReason, MetaError};
//! use schemata::core::types::ElementId;
//!
//! let err = MetaError::ElementMissing(ElementId::new(42));
//! assert_eq!(err.reason(), ErrorReason::ElementMissing);
//! assert!(err.to_string().contains("42"));
//! ```

use thiserror::Error;

use crate::core::types::{ElementId, ElementKind};

/// A storage error carried opaquely through [`MetaError::Adapter`].
pub type BoxedAdapterError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type MetaResult<T> = Result<T, MetaError>;

/// Closed set of failure reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorReason {
    ElementMissing,
    ElementConflict,
    NameConflict,
    InvalidName,
    InvalidSuperclass,
    InvalidValueType,
    InvalidValueClass,
    UnknownValueType,
    AttributeNotFound,
    ReferenceNotFound,
    MismatchedElementType,
    InvalidOpposite,
    PackageLoop,
    RootPackage,
    AdapterNotAttached,
    NullElement,
    NullNotificationTarget,
    SaveBeforeLoad,
    CorruptedRecord,
    AdapterFailure,
    FlushFailed,
}

/// Errors from metamodel operations.
#[derive(Debug, Error)]
pub enum MetaError {
    /// The element is deleted, was never persisted, or the adapter has no
    /// record for its id.
    #[error("element missing: {0}")]
    ElementMissing(ElementId),

    /// The adapter already holds a record with this id.
    #[error("element already exists: {0}")]
    ElementConflict(ElementId),

    /// A sibling already uses the name.
    #[error("name '{name}' is already used in {scope}")]
    NameConflict { name: String, scope: String },

    #[error("invalid element name: {0}")]
    InvalidName(String),

    /// The proposed superclass is the class itself or one of its descendants.
    #[error("class {class} cannot take {proposed} as superclass")]
    InvalidSuperclass { class: String, proposed: String },

    #[error("invalid value type: {0}")]
    InvalidValueType(String),

    /// A referenced object is not an instance of the reference's target class.
    #[error("object of class '{found}' is not a '{expected}'")]
    InvalidValueClass { expected: String, found: String },

    #[error("unknown value type: {0}")]
    UnknownValueType(String),

    #[error("class '{class}' has no attribute '{name}'")]
    AttributeNotFound { class: String, name: String },

    #[error("class '{class}' has no reference '{name}'")]
    ReferenceNotFound { class: String, name: String },

    /// The stored or cached element has another kind than the caller asked for.
    #[error("element {id} is a {found}, expected a {expected}")]
    MismatchedElementType {
        id: ElementId,
        expected: ElementKind,
        found: ElementKind,
    },

    #[error("invalid opposite: {0}")]
    InvalidOpposite(String),

    /// The package would become its own ancestor.
    #[error("package {package} cannot be nested under {parent}")]
    PackageLoop { package: String, parent: String },

    #[error("the root package cannot be renamed, moved or deleted")]
    RootPackage,

    #[error("no persistence adapter attached")]
    AdapterNotAttached,

    #[error("operation requires an element")]
    NullElement,

    /// The owner of a collection has been dropped.
    #[error("collection owner is gone")]
    NullNotificationTarget,

    /// Attempt to save an element that was never hydrated.
    #[error("element {0} cannot be saved before it is loaded")]
    SaveBeforeLoad(ElementId),

    #[error("corrupted record: {0}")]
    CorruptedRecord(String),

    #[error("adapter error: {0}")]
    Adapter(#[source] BoxedAdapterError),

    /// Writing the change log failed. The changes are still applied in
    /// memory and `pending` of them have not reached the adapter.
    #[error("flush failed with {pending} change(s) pending: {source}")]
    FlushFailed {
        pending: usize,
        source: Box<MetaError>,
    },
}

impl MetaError {
    /// The category of this error.
    pub fn reason(&self) -> ErrorReason {
        match self {
            Self::ElementMissing(_) => ErrorReason::ElementMissing,
            Self::ElementConflict(_) => ErrorReason::ElementConflict,
            Self::NameConflict { .. } => ErrorReason::NameConflict,
            Self::InvalidName(_) => ErrorReason::InvalidName,
            Self::InvalidSuperclass { .. } => ErrorReason::InvalidSuperclass,
            Self::InvalidValueType(_) => ErrorReason::InvalidValueType,
            Self::InvalidValueClass { .. } => ErrorReason::InvalidValueClass,
            Self::UnknownValueType(_) => ErrorReason::UnknownValueType,
            Self::AttributeNotFound { .. } => ErrorReason::AttributeNotFound,
            Self::ReferenceNotFound { .. } => ErrorReason::ReferenceNotFound,
            Self::MismatchedElementType { .. } => ErrorReason::MismatchedElementType,
            Self::InvalidOpposite(_) => ErrorReason::InvalidOpposite,
            Self::PackageLoop { .. } => ErrorReason::PackageLoop,
            Self::RootPackage => ErrorReason::RootPackage,
            Self::AdapterNotAttached => ErrorReason::AdapterNotAttached,
            Self::NullElement => ErrorReason::NullElement,
            Self::NullNotificationTarget => ErrorReason::NullNotificationTarget,
            Self::SaveBeforeLoad(_) => ErrorReason::SaveBeforeLoad,
            Self::CorruptedRecord(_) => ErrorReason::CorruptedRecord,
            Self::Adapter(_) => ErrorReason::AdapterFailure,
            Self::FlushFailed { .. } => ErrorReason::FlushFailed,
        }
    }

    /// Whether the error signals unrecoverable stored state.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::CorruptedRecord(_) => true,
            Self::FlushFailed { source, .. } => source.is_fatal(),
            _ => false,
        }
    }

    /// Wrap an error raised while writing the change log.
    pub(crate) fn flush_failed(source: MetaError, pending: usize) -> Self {
        match source {
            already @ Self::FlushFailed { .. } => already,
            source => Self::FlushFailed {
                pending,
                source: Box::new(source),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_matches_variant() {
        let err = MetaError::NameConflict {
            name: "Dog".into(),
            scope: "package default".into(),
        };
        assert_eq!(err.reason(), ErrorReason::NameConflict);
        assert!(err.to_string().contains("Dog"));
    }

    #[test]
    fn flush_failure_keeps_its_cause() {
        let err = MetaError::flush_failed(MetaError::Adapter("disk full".into()), 3);
        assert_eq!(err.reason(), ErrorReason::FlushFailed);
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("3 change(s) pending"));
        assert!(err.to_string().contains("disk full"));

        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("disk full"));
    }

    #[test]
    fn corrupted_flush_failure_is_fatal() {
        let err = MetaError::flush_failed(MetaError::CorruptedRecord("bad id".into()), 1);
        assert_eq!(err.reason(), ErrorReason::FlushFailed);
        assert!(err.is_fatal());
    }

    #[test]
    fn flush_failures_are_not_nested() {
        let inner = MetaError::flush_failed(MetaError::AdapterNotAttached, 2);
        let outer = MetaError::flush_failed(inner, 5);
        assert!(matches!(
            outer,
            MetaError::FlushFailed { pending: 2, ref source } if source.reason() == ErrorReason::AdapterNotAttached
        ));
    }
}
