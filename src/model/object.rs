//! model::object
//!
//! Instances of metamodel classes.
//!
//! An [`Object`] refers to its class by id and checks every value against
//! the class's attributes and references at the time it is set, so the
//! schema may change underneath it (a renamed class keeps its objects).
//!
//! Container attributes hold typed collections owned by the object: every
//! change to them, like every change to a scalar or a reference, bumps the
//! object's revision once.
//!
//! # Example
//!
//! ```
//! use schemata::adapter::MemoryAdapter;
//! use schemata::core::primitive::{DataType, PrimitiveType};
//! use schemata::model::{Metamodel, Object};
//!
//! let mut model = Metamodel::new(Box::new(MemoryAdapter::new()));
//! let dog = model.create_class("Dog", None, None).unwrap();
//! model
//!     .create_attribute(dog, "tricks", DataType::parse("list<string>").unwrap())
//!     .unwrap();
//!
//! let mut rex = Object::new(&mut model, dog).unwrap();
//! rex.list_mut(&mut model, "tricks").unwrap().push("sit").unwrap();
//! assert_eq!(rex.revision(), 1);
//! ```

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use super::Metamodel;
use crate::core::collection::{
    ChangeCounter, Notifiable, Notifier, TypedDictionary, TypedList, TypedSet,
};
use crate::core::error::{MetaError, MetaResult};
use crate::core::primitive::{DataType, PrimitiveType};
use crate::core::types::{ClassId, ObjectId, ReferenceId};
use crate::core::value::{ObjectRef, Scalar, Value};

#[derive(Debug)]
enum ReferenceValue {
    Single(ObjectRef),
    Multi(TypedList),
}

/// An instance of a class.
#[derive(Debug)]
pub struct Object {
    id: ObjectId,
    class: ClassId,
    values: BTreeMap<String, Value>,
    references: BTreeMap<String, ReferenceValue>,
    tracker: Rc<ChangeCounter>,
}

impl Object {
    /// A new, empty instance of `cls`.
    ///
    /// # Errors
    ///
    /// `ElementMissing` if the class is deleted or unknown.
    pub fn new(model: &mut Metamodel, cls: ClassId) -> MetaResult<Self> {
        model.class_name(cls)?;
        let id = ObjectId::generate();
        debug!(object = %id, class = %cls, "created object");
        Ok(Self {
            id,
            class: cls,
            values: BTreeMap::new(),
            references: BTreeMap::new(),
            tracker: Rc::new(ChangeCounter::default()),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    /// The current name of the object's class.
    pub fn class_name(&self, model: &mut Metamodel) -> MetaResult<String> {
        model.class_name(self.class)
    }

    /// Whether this object is an instance of `cls` or one of its
    /// subclasses.
    pub fn is_instance_of(&self, model: &mut Metamodel, cls: ClassId) -> MetaResult<bool> {
        model.is_kind_of(self.class, cls)
    }

    /// A typed pointer to this object, for use as a `ref` value.
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            object: self.id,
            class: self.class,
        }
    }

    /// Number of changes since creation or the last [`clear_dirty`](Self::clear_dirty).
    pub fn revision(&self) -> u64 {
        self.tracker.count()
    }

    pub fn is_dirty(&self) -> bool {
        self.revision() > 0
    }

    pub fn clear_dirty(&self) {
        self.tracker.reset();
    }

    fn attribute_type(&self, model: &mut Metamodel, name: &str) -> MetaResult<DataType> {
        match model.attribute(self.class, name)? {
            Some(attr) => model.attribute_type(attr),
            None => Err(MetaError::AttributeNotFound {
                class: model.qualified_class_name(self.class)?,
                name: name.to_string(),
            }),
        }
    }

    /// Set a scalar attribute.
    ///
    /// # Errors
    ///
    /// - `AttributeNotFound` if the class has no such attribute, inherited
    ///   ones included
    /// - `InvalidValueType` if the attribute holds a container or its type
    ///   does not accept `value`
    pub fn set(&mut self, model: &mut Metamodel, name: &str, value: impl Into<Scalar>) -> MetaResult<()> {
        let value = value.into();
        let data_type = self.attribute_type(model, name)?;
        if data_type.is_container() {
            return Err(MetaError::InvalidValueType(format!(
                "attribute '{name}' holds a {data_type}, not a single value"
            )));
        }
        data_type.element().check(&value)?;

        self.values.insert(name.to_string(), Value::Scalar(value));
        self.tracker.notify_changed();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The scalar stored under `name`, if any.
    pub fn get_scalar(&self, name: &str) -> Option<&Scalar> {
        self.get(name).and_then(Value::as_scalar)
    }

    /// Remove the value stored under `name`.
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        let removed = self.values.remove(name);
        if removed.is_some() {
            self.tracker.notify_changed();
        }
        removed
    }

    /// The element type of a container attribute of kind `container`.
    fn container_element(
        &self,
        model: &mut Metamodel,
        name: &str,
        container: PrimitiveType,
    ) -> MetaResult<PrimitiveType> {
        match self.attribute_type(model, name)? {
            DataType::Container {
                container: declared,
                element,
            } if declared == container => Ok(element),
            other => Err(MetaError::InvalidValueType(format!(
                "attribute '{name}' holds a {other}, not a {container}"
            ))),
        }
    }

    fn stale_value(name: &str, container: PrimitiveType) -> MetaError {
        MetaError::InvalidValueType(format!(
            "stored value of '{name}' is not a {container}; unset it first"
        ))
    }

    /// The list held by a `list<...>` attribute, created empty on first
    /// access.
    pub fn list_mut(&mut self, model: &mut Metamodel, name: &str) -> MetaResult<&mut TypedList> {
        let element = self.container_element(model, name, PrimitiveType::List)?;
        let notifier = Notifier::new(&self.tracker);
        let value = self
            .values
            .entry(name.to_string())
            .or_insert_with(|| Value::List(TypedList::new(element, notifier)));
        match value {
            Value::List(list) => Ok(list),
            _ => Err(Self::stale_value(name, PrimitiveType::List)),
        }
    }

    /// The set held by a `set<...>` attribute, created empty on first
    /// access.
    pub fn set_mut(&mut self, model: &mut Metamodel, name: &str) -> MetaResult<&mut TypedSet> {
        let element = self.container_element(model, name, PrimitiveType::Set)?;
        let notifier = Notifier::new(&self.tracker);
        let value = self
            .values
            .entry(name.to_string())
            .or_insert_with(|| Value::Set(TypedSet::new(element, notifier)));
        match value {
            Value::Set(set) => Ok(set),
            _ => Err(Self::stale_value(name, PrimitiveType::Set)),
        }
    }

    /// The dictionary held by a `dictionary<...>` attribute, created empty
    /// on first access.
    pub fn dictionary_mut(
        &mut self,
        model: &mut Metamodel,
        name: &str,
    ) -> MetaResult<&mut TypedDictionary> {
        let element = self.container_element(model, name, PrimitiveType::Dictionary)?;
        let notifier = Notifier::new(&self.tracker);
        let value = self
            .values
            .entry(name.to_string())
            .or_insert_with(|| Value::Dictionary(TypedDictionary::new(element, notifier)));
        match value {
            Value::Dictionary(dictionary) => Ok(dictionary),
            _ => Err(Self::stale_value(name, PrimitiveType::Dictionary)),
        }
    }

    fn reference_handle(&self, model: &mut Metamodel, name: &str) -> MetaResult<ReferenceId> {
        match model.reference(self.class, name)? {
            Some(r) => Ok(r),
            None => Err(MetaError::ReferenceNotFound {
                class: model.qualified_class_name(self.class)?,
                name: name.to_string(),
            }),
        }
    }

    /// Fail with `InvalidValueClass` unless `target` may be held by `r`.
    fn check_target(model: &mut Metamodel, r: ReferenceId, target: &Object) -> MetaResult<()> {
        let expected = model.reference_target(r)?;
        if model.is_kind_of(target.class, expected)? {
            return Ok(());
        }
        Err(MetaError::InvalidValueClass {
            expected: model.qualified_class_name(expected)?,
            found: model.qualified_class_name(target.class)?,
        })
    }

    /// Set or clear a single-valued reference.
    ///
    /// # Errors
    ///
    /// - `ReferenceNotFound` if the class has no such reference
    /// - `InvalidValueType` if the reference is multi-valued
    /// - `InvalidValueClass` if `target` is not an instance of the
    ///   reference's target class
    pub fn set_reference(
        &mut self,
        model: &mut Metamodel,
        name: &str,
        target: Option<&Object>,
    ) -> MetaResult<()> {
        let r = self.reference_handle(model, name)?;
        if model.reference_cardinality(r)?.is_multi() {
            return Err(MetaError::InvalidValueType(format!(
                "reference '{name}' holds many objects; use add_reference"
            )));
        }

        match target {
            Some(target) => {
                Self::check_target(model, r, target)?;
                let new = target.object_ref();
                if matches!(self.references.get(name), Some(ReferenceValue::Single(current)) if *current == new)
                {
                    return Ok(());
                }
                self.references
                    .insert(name.to_string(), ReferenceValue::Single(new));
                self.tracker.notify_changed();
            }
            None => {
                if self.references.remove(name).is_some() {
                    self.tracker.notify_changed();
                }
            }
        }
        Ok(())
    }

    /// Add `target` to a multi-valued reference. Returns `false` if it was
    /// already there.
    pub fn add_reference(&mut self, model: &mut Metamodel, name: &str, target: &Object) -> MetaResult<bool> {
        let r = self.reference_handle(model, name)?;
        if !model.reference_cardinality(r)?.is_multi() {
            return Err(MetaError::InvalidValueType(format!(
                "reference '{name}' holds one object; use set_reference"
            )));
        }
        Self::check_target(model, r, target)?;

        let notifier = Notifier::new(&self.tracker);
        let entry = self
            .references
            .entry(name.to_string())
            .or_insert_with(|| ReferenceValue::Multi(TypedList::new(PrimitiveType::Ref, notifier)));
        let ReferenceValue::Multi(list) = entry else {
            return Err(Self::stale_value(name, PrimitiveType::List));
        };

        let value = Scalar::Ref(target.object_ref());
        if list.contains_value(&value) {
            return Ok(false);
        }
        list.push(value)?;
        Ok(true)
    }

    /// Remove `target` from a reference. Returns whether it was held.
    pub fn remove_reference(&mut self, name: &str, target: &Object) -> MetaResult<bool> {
        let held = target.object_ref();
        if matches!(self.references.get(name), Some(ReferenceValue::Single(current)) if *current == held)
        {
            self.references.remove(name);
            self.tracker.notify_changed();
            return Ok(true);
        }
        match self.references.get_mut(name) {
            Some(ReferenceValue::Multi(list)) => list.remove_value(&Scalar::Ref(held)),
            _ => Ok(false),
        }
    }

    /// The objects held by a reference, in insertion order.
    pub fn references(&self, name: &str) -> Vec<ObjectRef> {
        match self.references.get(name) {
            Some(ReferenceValue::Single(current)) => vec![*current],
            Some(ReferenceValue::Multi(list)) => {
                list.iter().filter_map(Scalar::as_object_ref).copied().collect()
            }
            None => Vec::new(),
        }
    }
}
