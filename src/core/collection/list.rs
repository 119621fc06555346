//! core::collection::list
//!
//! Insertion-ordered typed list.

use super::Notifier;
use crate::core::error::MetaResult;
use crate::core::primitive::PrimitiveType;
use crate::core::value::Scalar;

/// An ordered sequence of scalars of one declared type.
#[derive(Debug)]
pub struct TypedList {
    element_type: PrimitiveType,
    owner: Notifier,
    items: Vec<Scalar>,
}

impl TypedList {
    pub fn new(element_type: PrimitiveType, owner: Notifier) -> Self {
        Self {
            element_type,
            owner,
            items: Vec::new(),
        }
    }

    pub fn element_type(&self) -> PrimitiveType {
        self.element_type
    }

    /// Append a value.
    ///
    /// # Errors
    ///
    /// - `InvalidValueType` if the value does not match the element type
    /// - `NullNotificationTarget` if the owner is gone
    pub fn push(&mut self, value: impl Into<Scalar>) -> MetaResult<()> {
        let value = value.into();
        self.element_type.check(&value)?;
        let owner = self.owner.owner()?;
        self.items.push(value);
        owner.notify_changed();
        Ok(())
    }

    /// Remove the value at `index`. Out-of-range indexes change nothing.
    pub fn remove(&mut self, index: usize) -> MetaResult<Option<Scalar>> {
        if index >= self.items.len() {
            return Ok(None);
        }
        let owner = self.owner.owner()?;
        let removed = self.items.remove(index);
        owner.notify_changed();
        Ok(Some(removed))
    }

    /// Remove the first occurrence of `value`.
    pub fn remove_value(&mut self, value: &Scalar) -> MetaResult<bool> {
        match self.items.iter().position(|v| v == value) {
            Some(index) => self.remove(index).map(|_| true),
            None => Ok(false),
        }
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

    pub fn get(&self, index: usize) -> Option<&Scalar> {
        self.items.get(index)
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

    /// Iterate in insertion order. Each call starts from the beginning.
    pub fn iter(&self) -> std::slice::Iter<'_, Scalar> {
        self.items.iter()
    }

    pub fn for_each(&self, f: impl FnMut(&Scalar)) {
        self.items.iter().for_each(f);
    }
}

impl<'a> IntoIterator for &'a TypedList {
    type Item = &'a Scalar;
    type IntoIter = std::slice::Iter<'a, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
