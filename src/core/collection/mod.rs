//! core::collection
//!
//! Typed collections that report every mutation to an owner.
//!
//! # Modules
//!
//! - [`list`] - [`TypedList`], insertion ordered
//! - [`set`] - [`TypedSet`], sorted and unique
//! - [`dictionary`] - [`TypedDictionary`], string keys in sorted order
//!
//! # Contract
//!
//! - Every inserted value is checked against the declared element type; a
//!   rejected value fails with `InvalidValueType` and changes nothing
//! - Every call that changes the contents notifies the owner exactly once
//! - Calls that change nothing do not notify
//! - The owner is held weakly; once it is dropped, mutations fail with
//!   `NullNotificationTarget`
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use schemata::core::collection::{ChangeCounter, Notifier, TypedList};
//! use schemata::core::primitive::PrimitiveType;
//!
//! let owner = Rc::new(ChangeCounter::default());
//! let mut names = TypedList::new(PrimitiveType::String, Notifier::new(&owner));
//!
//! names.push("Rex").unwrap();
//! assert!(names.push(42).is_err());
//! assert_eq!(owner.count(), 1);
//! ```

pub mod dictionary;
pub mod list;
pub mod set;

pub use dictionary::TypedDictionary;
pub use list::TypedList;
pub use set::TypedSet;

use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::core::error::{MetaError, MetaResult};

/// Receiver of change notifications.
pub trait Notifiable {
    /// Called once per successful mutation of an owned collection.
    fn notify_changed(&self);
}

/// Weak handle from a collection to its owner.
#[derive(Clone, Default)]
pub struct Notifier {
    owner: Option<Weak<dyn Notifiable>>,
}

impl Notifier {
    /// A notifier reporting to `owner`.
    pub fn new<N: Notifiable + 'static>(owner: &Rc<N>) -> Self {
        let weak: Weak<dyn Notifiable> = Rc::downgrade(owner) as Weak<N>;
        Self { owner: Some(weak) }
    }

    /// A notifier with no owner. Mutations through it always fail.
    pub fn detached() -> Self {
        Self { owner: None }
    }

    /// Whether the owner is still alive.
    pub fn is_attached(&self) -> bool {
        self.owner.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    /// Resolve the owner before a mutation.
    pub(crate) fn owner(&self) -> MetaResult<Rc<dyn Notifiable>> {
        self.owner
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(MetaError::NullNotificationTarget)
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// A [`Notifiable`] that counts notifications.
#[derive(Debug, Default)]
pub struct ChangeCounter {
    count: Cell<u64>,
}

impl ChangeCounter {
    pub fn count(&self) -> u64 {
        self.count.get()
    }

    pub fn reset(&self) {
        self.count.set(0);
    }
}

impl Notifiable for ChangeCounter {
    fn notify_changed(&self) {
        self.count.set(self.count.get() + 1);
    }
}
