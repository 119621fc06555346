//! model::member
//!
//! Attributes and references: the members of a class.
//!
//! A reference registers itself as a utilizer of its target class and may
//! be paired with an opposite reference on the target. Both links are kept
//! pairwise: changing one side updates the other.

use std::collections::BTreeSet;

use tracing::debug;

use super::element::{AttributeData, Element, ReferenceData};
use super::Metamodel;
use crate::core::error::{MetaError, MetaResult};
use crate::core::naming::validate_name;
use crate::core::primitive::DataType;
use crate::core::types::{AttributeId, Cardinality, ClassId, ReferenceId};

impl Metamodel {
    /// Fail with `NameConflict` if `cls` already has a direct member named
    /// `name`.
    fn ensure_free_member_name(&mut self, cls: ClassId, name: &str) -> MetaResult<()> {
        self.resolve_members(cls)?;
        if self.class_data(cls)?.has_member(name) {
            return Err(MetaError::NameConflict {
                name: name.to_string(),
                scope: format!("class '{}'", self.qualified_class_name(cls)?),
            });
        }
        Ok(())
    }

    /// Add an attribute to `cls`.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if `name` is not a valid element name
    /// - `NameConflict` if `cls` already has a direct attribute or reference
    ///   named `name`
    pub fn create_attribute(
        &mut self,
        cls: ClassId,
        name: &str,
        data_type: DataType,
    ) -> MetaResult<AttributeId> {
        validate_name(name)?;
        self.ensure_free_member_name(cls, name)?;

        let id = self.create_element(Element::Attribute(AttributeData {
            name: name.to_string(),
            owner: cls,
            data_type,
        }))?;
        let attr = AttributeId::from(id);
        self.class_data_mut(cls)?.attributes.insert(name.to_string(), attr);
        self.committed();
        Ok(attr)
    }

    pub fn attribute_name(&mut self, attr: AttributeId) -> MetaResult<String> {
        Ok(self.attribute_data(attr)?.name.clone())
    }

    pub fn set_attribute_name(&mut self, attr: AttributeId, name: &str) -> MetaResult<()> {
        validate_name(name)?;
        let data = self.attribute_data(attr)?;
        if data.name == name {
            return Ok(());
        }
        let (old, owner) = (data.name.clone(), data.owner);
        self.ensure_free_member_name(owner, name)?;

        let members = &mut self.class_data_mut(owner)?.attributes;
        members.remove(&old);
        members.insert(name.to_string(), attr);
        self.attribute_data_mut(attr)?.name = name.to_string();
        self.mark_changed(attr.id());
        debug!(attribute = %attr, from = %old, to = name, "renamed attribute");
        self.committed();
        Ok(())
    }

    pub fn attribute_type(&mut self, attr: AttributeId) -> MetaResult<DataType> {
        Ok(self.attribute_data(attr)?.data_type)
    }

    pub fn set_attribute_type(&mut self, attr: AttributeId, data_type: DataType) -> MetaResult<()> {
        let data = self.attribute_data_mut(attr)?;
        if data.data_type == data_type {
            return Ok(());
        }
        data.data_type = data_type;
        self.mark_changed(attr.id());
        self.committed();
        Ok(())
    }

    pub fn attribute_owner(&mut self, attr: AttributeId) -> MetaResult<ClassId> {
        Ok(self.attribute_data(attr)?.owner)
    }

    pub fn delete_attribute(&mut self, attr: AttributeId) -> MetaResult<()> {
        let owner = self.attribute_owner(attr)?;
        self.resolve_members(owner)?;
        self.delete_attribute_inner(attr)?;
        self.committed();
        Ok(())
    }

    pub(crate) fn delete_attribute_inner(&mut self, attr: AttributeId) -> MetaResult<()> {
        let data = self.attribute_data(attr)?;
        let (name, owner) = (data.name.clone(), data.owner);
        self.class_data_mut(owner)?.attributes.remove(&name);
        self.mark_deleted(attr.id(), AttributeId::KIND);
        Ok(())
    }

    /// Add a reference from `cls` to `target`.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if `name` is not a valid element name
    /// - `ElementMissing` if `target` is deleted
    /// - `NameConflict` if `cls` already has a direct member named `name`
    pub fn create_reference(
        &mut self,
        cls: ClassId,
        name: &str,
        target: ClassId,
        cardinality: Cardinality,
    ) -> MetaResult<ReferenceId> {
        validate_name(name)?;
        self.resolve_utilizers(target)?;
        self.ensure_free_member_name(cls, name)?;

        let id = self.create_element(Element::Reference(ReferenceData {
            name: name.to_string(),
            owner: cls,
            target,
            opposite: None,
            cardinality,
        }))?;
        let r = ReferenceId::from(id);
        self.class_data_mut(cls)?.references.insert(name.to_string(), r);
        self.class_data_mut(target)?.utilizers.insert(r);
        self.committed();
        Ok(r)
    }

    pub fn reference_name(&mut self, r: ReferenceId) -> MetaResult<String> {
        Ok(self.reference_data(r)?.name.clone())
    }

    pub fn set_reference_name(&mut self, r: ReferenceId, name: &str) -> MetaResult<()> {
        validate_name(name)?;
        let data = self.reference_data(r)?;
        if data.name == name {
            return Ok(());
        }
        let (old, owner) = (data.name.clone(), data.owner);
        self.ensure_free_member_name(owner, name)?;

        let members = &mut self.class_data_mut(owner)?.references;
        members.remove(&old);
        members.insert(name.to_string(), r);
        self.reference_data_mut(r)?.name = name.to_string();
        self.mark_changed(r.id());
        debug!(reference = %r, from = %old, to = name, "renamed reference");
        self.committed();
        Ok(())
    }

    pub fn reference_owner(&mut self, r: ReferenceId) -> MetaResult<ClassId> {
        Ok(self.reference_data(r)?.owner)
    }

    pub fn reference_target(&mut self, r: ReferenceId) -> MetaResult<ClassId> {
        Ok(self.reference_data(r)?.target)
    }

    pub fn reference_cardinality(&mut self, r: ReferenceId) -> MetaResult<Cardinality> {
        Ok(self.reference_data(r)?.cardinality)
    }

    pub fn set_reference_cardinality(&mut self, r: ReferenceId, cardinality: Cardinality) -> MetaResult<()> {
        let data = self.reference_data_mut(r)?;
        if data.cardinality == cardinality {
            return Ok(());
        }
        data.cardinality = cardinality;
        self.mark_changed(r.id());
        self.committed();
        Ok(())
    }

    /// Point `r` at another class.
    ///
    /// Moves the utilizer link. An opposite that no longer fits the new
    /// target is unlinked on both sides.
    pub fn set_reference_target(&mut self, r: ReferenceId, target: ClassId) -> MetaResult<()> {
        let data = self.reference_data(r)?;
        let (old, owner, opposite) = (data.target, data.owner, data.opposite);
        if old == target {
            return Ok(());
        }
        self.resolve_utilizers(target)?;
        self.resolve_utilizers(old)?;
        let keep_opposite = match opposite {
            Some(o) => self.opposite_fits(owner, target, o)?,
            None => true,
        };

        self.class_data_mut(old)?.utilizers.remove(&r);
        self.class_data_mut(target)?.utilizers.insert(r);
        self.reference_data_mut(r)?.target = target;
        if let (Some(o), false) = (opposite, keep_opposite) {
            self.reference_data_mut(r)?.opposite = None;
            self.reference_data_mut(o)?.opposite = None;
            self.mark_changed(o.id());
            debug!(reference = %r, opposite = %o, "cleared opposite after retarget");
        }
        self.mark_changed(r.id());
        self.committed();
        Ok(())
    }

    pub fn reference_opposite(&mut self, r: ReferenceId) -> MetaResult<Option<ReferenceId>> {
        Ok(self.reference_data(r)?.opposite)
    }

    /// Pair `r` with `opposite`, or unpair it with `None`.
    ///
    /// Previous partners of either side are unlinked.
    ///
    /// # Errors
    ///
    /// `InvalidOpposite` unless `opposite` is owned by `r`'s target (or an
    /// ancestor of it) and targets `r`'s owner (or an ancestor of it).
    pub fn set_reference_opposite(&mut self, r: ReferenceId, opposite: Option<ReferenceId>) -> MetaResult<()> {
        let data = self.reference_data(r)?;
        let (owner, target, current) = (data.owner, data.target, data.opposite);
        if current == opposite {
            return Ok(());
        }

        let mut touched = BTreeSet::from([r]);
        let mut unlink = Vec::new();
        if let Some(previous) = current {
            self.reference_data(previous)?;
            unlink.push(previous);
        }
        if let Some(o) = opposite {
            if o == r {
                return Err(MetaError::InvalidOpposite(format!(
                    "{r} cannot be its own opposite"
                )));
            }
            if !self.opposite_fits(owner, target, o)? {
                return Err(MetaError::InvalidOpposite(format!(
                    "{o} must belong to {target} and point at {owner}"
                )));
            }
            if let Some(theirs) = self.reference_data(o)?.opposite {
                self.reference_data(theirs)?;
                unlink.push(theirs);
            }
            touched.insert(o);
        }

        for stale in unlink {
            self.reference_data_mut(stale)?.opposite = None;
            touched.insert(stale);
        }
        self.reference_data_mut(r)?.opposite = opposite;
        if let Some(o) = opposite {
            self.reference_data_mut(o)?.opposite = Some(r);
        }
        for id in touched {
            self.mark_changed(id.id());
        }
        self.committed();
        Ok(())
    }

    /// Whether `opposite` can pair with a reference from `owner` to
    /// `target`.
    fn opposite_fits(&mut self, owner: ClassId, target: ClassId, opposite: ReferenceId) -> MetaResult<bool> {
        let data = self.reference_data(opposite)?;
        let (their_owner, their_target) = (data.owner, data.target);
        Ok(self.is_kind_of(target, their_owner)? && self.is_kind_of(owner, their_target)?)
    }

    pub fn delete_reference(&mut self, r: ReferenceId) -> MetaResult<()> {
        self.prepare_reference_removal(r)?;
        self.delete_reference_inner(r)?;
        self.committed();
        Ok(())
    }

    /// Load and resolve everything removing `r` touches.
    pub(crate) fn prepare_reference_removal(&mut self, r: ReferenceId) -> MetaResult<()> {
        let data = self.reference_data(r)?;
        let (owner, target, opposite) = (data.owner, data.target, data.opposite);
        self.resolve_members(owner)?;
        self.resolve_utilizers(target)?;
        if let Some(o) = opposite {
            self.reference_data(o)?;
        }
        Ok(())
    }

    pub(crate) fn delete_reference_inner(&mut self, r: ReferenceId) -> MetaResult<()> {
        let data = self.reference_data(r)?;
        let (name, owner, target, opposite) =
            (data.name.clone(), data.owner, data.target, data.opposite);

        if let Some(o) = opposite {
            if !self.is_deleted(o.id()) {
                self.reference_data_mut(o)?.opposite = None;
                self.mark_changed(o.id());
            }
        }
        self.class_data_mut(target)?.utilizers.remove(&r);
        self.class_data_mut(owner)?.references.remove(&name);
        self.mark_deleted(r.id(), ReferenceId::KIND);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::core::error::ErrorReason;
    use crate::core::primitive::PrimitiveType;

    fn model() -> Metamodel {
        Metamodel::new(Box::new(MemoryAdapter::new()))
    }

    /// Person <-> Pet with `pets` (multi) and `owner` (single).
    fn people_and_pets(model: &mut Metamodel) -> (ClassId, ClassId, ReferenceId, ReferenceId) {
        let person = model.create_class("Person", None, None).unwrap();
        let pet = model.create_class("Pet", None, None).unwrap();
        let pets = model
            .create_reference(person, "pets", pet, Cardinality::Multi)
            .unwrap();
        let owner = model
            .create_reference(pet, "owner", person, Cardinality::Single)
            .unwrap();
        (person, pet, pets, owner)
    }

    #[test]
    fn attribute_and_reference_share_names() {
        let mut model = model();
        let a = model.create_class("A", None, None).unwrap();
        model
            .create_attribute(a, "x", DataType::of(PrimitiveType::Any))
            .unwrap();
        let err = model
            .create_reference(a, "x", a, Cardinality::Single)
            .unwrap_err();
        assert_eq!(err.reason(), ErrorReason::NameConflict);
        assert!(model.utilizers(a).unwrap().is_empty());
    }

    #[test]
    fn attribute_rename_and_retype() {
        let mut model = model();
        let a = model.create_class("A", None, None).unwrap();
        let x = model
            .create_attribute(a, "x", DataType::of(PrimitiveType::Integer))
            .unwrap();
        model.create_attribute(a, "y", DataType::of(PrimitiveType::Any)).unwrap();

        assert_eq!(
            model.set_attribute_name(x, "y").unwrap_err().reason(),
            ErrorReason::NameConflict
        );
        model.set_attribute_name(x, "z").unwrap();
        assert_eq!(model.attribute(a, "z").unwrap(), Some(x));
        assert_eq!(model.attribute(a, "x").unwrap(), None);

        let list = DataType::parse("list<string>").unwrap();
        model.set_attribute_type(x, list).unwrap();
        assert_eq!(model.attribute_type(x).unwrap(), list);
    }

    #[test]
    fn reference_registers_as_utilizer() {
        let mut model = model();
        let (person, pet, pets, owner) = people_and_pets(&mut model);
        assert_eq!(model.utilizers(pet).unwrap(), vec![pets]);
        assert_eq!(model.utilizers(person).unwrap(), vec![owner]);
        assert_eq!(model.reference_owner(pets).unwrap(), person);
        assert_eq!(model.reference_cardinality(pets).unwrap(), Cardinality::Multi);
    }

    #[test]
    fn retarget_moves_utilizer_link() {
        let mut model = model();
        let (person, pet, pets, _) = people_and_pets(&mut model);
        let toy = model.create_class("Toy", None, None).unwrap();

        model.set_reference_target(pets, toy).unwrap();
        assert!(model.utilizers(pet).unwrap().is_empty());
        assert_eq!(model.utilizers(toy).unwrap(), vec![pets]);
        assert_eq!(model.reference_target(pets).unwrap(), toy);
        assert!(model.utilizers(person).unwrap().len() == 1);
    }

    #[test]
    fn opposites_link_both_sides() {
        let mut model = model();
        let (_, _, pets, owner) = people_and_pets(&mut model);
        model.flush().unwrap();

        model.set_reference_opposite(pets, Some(owner)).unwrap();
        assert_eq!(model.reference_opposite(owner).unwrap(), Some(pets));
        assert_eq!(model.pending_changes(), vec![pets.id(), owner.id()]);

        model.set_reference_opposite(owner, None).unwrap();
        assert_eq!(model.reference_opposite(pets).unwrap(), None);
    }

    #[test]
    fn mismatched_opposite_is_rejected() {
        let mut model = model();
        let (person, _, pets, _) = people_and_pets(&mut model);
        let nickname = model
            .create_reference(person, "friend", person, Cardinality::Single)
            .unwrap();

        let err = model.set_reference_opposite(pets, Some(nickname)).unwrap_err();
        assert_eq!(err.reason(), ErrorReason::InvalidOpposite);
        let err = model.set_reference_opposite(pets, Some(pets)).unwrap_err();
        assert_eq!(err.reason(), ErrorReason::InvalidOpposite);
        assert_eq!(model.reference_opposite(pets).unwrap(), None);
    }

    #[test]
    fn pairing_unlinks_previous_partners() {
        let mut model = model();
        let (person, pet, pets, owner) = people_and_pets(&mut model);
        let keeper = model
            .create_reference(pet, "keeper", person, Cardinality::Single)
            .unwrap();

        model.set_reference_opposite(pets, Some(owner)).unwrap();
        model.set_reference_opposite(pets, Some(keeper)).unwrap();
        assert_eq!(model.reference_opposite(owner).unwrap(), None);
        assert_eq!(model.reference_opposite(keeper).unwrap(), Some(pets));
        assert!(model.verify().unwrap().ok);
    }

    #[test]
    fn retarget_clears_opposite_that_no_longer_fits() {
        let mut model = model();
        let (_, _, pets, owner) = people_and_pets(&mut model);
        let toy = model.create_class("Toy", None, None).unwrap();
        model.set_reference_opposite(pets, Some(owner)).unwrap();

        model.set_reference_target(pets, toy).unwrap();
        assert_eq!(model.reference_opposite(pets).unwrap(), None);
        assert_eq!(model.reference_opposite(owner).unwrap(), None);
    }

    #[test]
    fn delete_reference_clears_opposite_and_utilizer() {
        let mut model = model();
        let (person, pet, pets, owner) = people_and_pets(&mut model);
        model.set_reference_opposite(pets, Some(owner)).unwrap();

        model.delete_reference(pets).unwrap();
        assert_eq!(model.reference_opposite(owner).unwrap(), None);
        assert!(model.utilizers(pet).unwrap().is_empty());
        assert!(model.reference_names(person).unwrap().is_empty());
        assert_eq!(
            model.reference_name(pets).unwrap_err().reason(),
            ErrorReason::ElementMissing
        );
    }
}
