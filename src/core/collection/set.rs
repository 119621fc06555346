//! core::collection::set
//!
//! Sorted typed set.

use std::collections::BTreeSet;

use super::Notifier;
use crate::core::error::MetaResult;
use crate::core::primitive::PrimitiveType;
use crate::core::value::Scalar;

/// A sorted set of unique scalars of one declared type.
#[derive(Debug)]
pub struct TypedSet {
    element_type: PrimitiveType,
    owner: Notifier,
    items: BTreeSet<Scalar>,
}

impl TypedSet {
    pub fn new(element_type: PrimitiveType, owner: Notifier) -> Self {
        Self {
            element_type,
            owner,
            items: BTreeSet::new(),
        }
    }

    pub fn element_type(&self) -> PrimitiveType {
        self.element_type
    }

    /// Add a value. Returns `false` (and does not notify) if it was already
    /// present.
    ///
    /// # Errors
    ///
    /// - `InvalidValueType` if the value does not match the element type
    /// - `NullNotificationTarget` if the owner is gone
    pub fn insert(&mut self, value: impl Into<Scalar>) -> MetaResult<bool> {
        let value = value.into();
        self.element_type.check(&value)?;
        if self.items.contains(&value) {
            return Ok(false);
        }
        let owner = self.owner.owner()?;
        self.items.insert(value);
        owner.notify_changed();
        Ok(true)
    }

    pub fn remove(&mut self, value: &Scalar) -> MetaResult<bool> {
        if !self.items.contains(value) {
            return Ok(false);
        }
        let owner = self.owner.owner()?;
        self.items.remove(value);
        owner.notify_changed();
        Ok(true)
    }

    /// Keep only the values matching `keep`. Notifies once if anything was
    /// removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&Scalar) -> bool) -> MetaResult<usize> {
        if self.items.iter().all(&mut keep) {
            return Ok(0);
        }
        let owner = self.owner.owner()?;
        let before = self.items.len();
        self.items.retain(|v| keep(v));
        owner.notify_changed();
        Ok(before - self.items.len())
    }

    pub fn clear(&mut self) -> MetaResult<()> {
        if self.items.is_empty() {
            return Ok(());
        }
        let owner = self.owner.owner()?;
        self.items.clear();
        owner.notify_changed();
        Ok(())
    }

    pub fn contains_value(&self, value: &Scalar) -> bool {
        self.items.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in sorted order.
    pub fn iter(&self) -> std::collections::btree_set::Iter<'_, Scalar> {
        self.items.iter()
    }

    pub fn for_each(&self, f: impl FnMut(&Scalar)) {
        self.items.iter().for_each(f);
    }
}

impl<'a> IntoIterator for &'a TypedSet {
    type Item = &'a Scalar;
    type IntoIter = std::collections::btree_set::Iter<'a, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
