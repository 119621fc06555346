//! core::collection::dictionary
//!
//! String-keyed typed dictionary.
//!
//! Keys are ordered identifiers; iteration is always key-sorted.

use std::collections::BTreeMap;

use super::Notifier;
use crate::core::error::MetaResult;
use crate::core::primitive::PrimitiveType;
use crate::core::value::Scalar;

/// A key-sorted mapping from string keys to scalars of one declared type.
#[derive(Debug)]
pub struct TypedDictionary {
    element_type: PrimitiveType,
    owner: Notifier,
    entries: BTreeMap<String, Scalar>,
}

impl TypedDictionary {
    pub fn new(element_type: PrimitiveType, owner: Notifier) -> Self {
        Self {
            element_type,
            owner,
            entries: BTreeMap::new(),
        }
    }

    pub fn element_type(&self) -> PrimitiveType {
        self.element_type
    }

    /// Insert or replace the value under `key`, returning the previous one.
    ///
    /// Replacing a value with an equal one changes nothing and does not
    /// notify.
    ///
    /// # Errors
    ///
    /// - `InvalidValueType` if the value does not match the element type
    /// - `NullNotificationTarget` if the owner is gone
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> MetaResult<Option<Scalar>> {
        let key = key.into();
        let value = value.into();
        self.element_type.check(&value)?;
        if self.entries.get(&key) == Some(&value) {
            return Ok(Some(value));
        }
        let owner = self.owner.owner()?;
        let previous = self.entries.insert(key, value);
        owner.notify_changed();
        Ok(previous)
    }

    pub fn remove(&mut self, key: &str) -> MetaResult<Option<Scalar>> {
        if !self.entries.contains_key(key) {
            return Ok(None);
        }
        let owner = self.owner.owner()?;
        let removed = self.entries.remove(key);
        owner.notify_changed();
        Ok(removed)
    }

    /// Keep only the entries matching `keep`. Notifies once if anything was
    /// removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Scalar) -> bool) -> MetaResult<usize> {
        if self.entries.iter().all(|(k, v)| keep(k, v)) {
            return Ok(0);
        }
        let owner = self.owner.owner()?;
        let before = self.entries.len();
        self.entries.retain(|k, v| keep(k, v));
        owner.notify_changed();
        Ok(before - self.entries.len())
    }

    pub fn clear(&mut self) -> MetaResult<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let owner = self.owner.owner()?;
        self.entries.clear();
        owner.notify_changed();
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn contains_value(&self, value: &Scalar) -> bool {
        self.entries.values().any(|v| v == value)
    }

    /// The keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn for_each(&self, mut f: impl FnMut(&str, &Scalar)) {
        for (k, v) in &self.entries {
            f(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::core::collection::ChangeCounter;
    use crate::core::error::ErrorReason;

    fn dictionary(element_type: PrimitiveType) -> (TypedDictionary, Rc<ChangeCounter>) {
        let owner = Rc::new(ChangeCounter::default());
        (TypedDictionary::new(element_type, Notifier::new(&owner)), owner)
    }

    #[test]
    fn iterates_in_key_order() {
        let (mut d, owner) = dictionary(PrimitiveType::Integer);
        d.insert("zeta", 1).unwrap();
        d.insert("alpha", 2).unwrap();
        d.insert("mid", 3).unwrap();
        let keys: Vec<_> = d.keys().collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
        assert_eq!(owner.count(), 3);
    }

    #[test]
    fn replacing_returns_previous() {
        let (mut d, owner) = dictionary(PrimitiveType::String);
        assert_eq!(d.insert("k", "a").unwrap(), None);
        assert_eq!(d.insert("k", "b").unwrap(), Some("a".into()));
        assert_eq!(d.len(), 1);
        assert_eq!(owner.count(), 2);
    }

    #[test]
    fn equal_replacement_is_silent() {
        let (mut d, owner) = dictionary(PrimitiveType::String);
        d.insert("k", "a").unwrap();
        d.insert("k", "a").unwrap();
        assert_eq!(owner.count(), 1);
    }

    #[test]
    fn type_mismatch_leaves_entry_alone() {
        let (mut d, owner) = dictionary(PrimitiveType::Int64);
        d.insert("n", 1i64).unwrap();
        let err = d.insert("n", "one").unwrap_err();
        assert_eq!(err.reason(), ErrorReason::InvalidValueType);
        assert_eq!(d.get("n"), Some(&Scalar::Int64(1)));
        assert_eq!(owner.count(), 1);
    }

    #[test]
    fn contains_key_and_value() {
        let (mut d, _owner) = dictionary(PrimitiveType::Any);
        d.insert("flag", true).unwrap();
        assert!(d.contains_key("flag"));
        assert!(!d.contains_key("other"));
        assert!(d.contains_value(&Scalar::Boolean(true)));
        assert!(!d.contains_value(&Scalar::Boolean(false)));
    }

    #[test]
    fn remove_and_retain() {
        let (mut d, owner) = dictionary(PrimitiveType::Integer);
        for (k, v) in [("a", 1), ("b", 2), ("c", 3)] {
            d.insert(k, v).unwrap();
        }
        owner.reset();
        assert_eq!(d.remove("missing").unwrap(), None);
        assert_eq!(d.remove("a").unwrap(), Some(Scalar::Integer(1)));
        assert_eq!(d.retain(|k, _| k != "b").unwrap(), 1);
        assert_eq!(owner.count(), 2);
        let mut seen = Vec::new();
        d.for_each(|k, _| seen.push(k.to_string()));
        assert_eq!(seen, vec!["c"]);
    }
}
