//! model::class
//!
//! Classes, single inheritance and cascading deletion.
//!
//! # Invariants
//!
//! - A class name is unique among the children of its package
//! - The superclass chain is acyclic
//! - Attribute and reference names are unique among a class's direct
//!   members; inherited members may be shadowed
//!
//! # Deletion
//!
//! Deleting a class deletes its attributes, its references and every
//! reference targeting it. Each direct subclass is relinked to the deleted
//! class's own superclass, so `A <- B <- C` becomes `A <- C` when `B` goes.

use std::collections::BTreeSet;

use tracing::debug;

use super::element::Element;
use super::Metamodel;
use crate::core::error::{MetaError, MetaResult};
use crate::core::naming::validate_name;
use crate::core::types::{AttributeId, ClassId, PackageId, ReferenceId};

impl Metamodel {
    /// Create a class in `package` (the root if `None`).
    ///
    /// # Errors
    ///
    /// - `InvalidName` if `name` is not a valid element name
    /// - `ElementMissing` if the package or superclass is deleted
    /// - `NameConflict` if the package already has a child named `name`
    pub fn create_class(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
        package: Option<PackageId>,
    ) -> MetaResult<ClassId> {
        validate_name(name)?;
        let package = package.unwrap_or(PackageId::ROOT);
        self.ensure_free_child_name(package, name)?;
        if let Some(sup) = superclass {
            self.resolve_subclasses(sup)?;
        }

        let id = self.create_element(Element::new_class(name.to_string(), package, superclass))?;
        let cls = ClassId::from(id);
        self.add_class(package, cls, name)?;
        if let Some(sup) = superclass {
            self.class_data_mut(sup)?.subclasses.insert(cls);
        }
        self.committed();
        Ok(cls)
    }

    pub fn class_name(&mut self, cls: ClassId) -> MetaResult<String> {
        Ok(self.class_data(cls)?.name.clone())
    }

    /// Rename a class. Renaming to the current name is a no-op.
    ///
    /// Objects refer to their class by id and are unaffected.
    ///
    /// # Errors
    ///
    /// `NameConflict` if a sibling in the package already uses `name`.
    pub fn set_class_name(&mut self, cls: ClassId, name: &str) -> MetaResult<()> {
        validate_name(name)?;
        let data = self.class_data(cls)?;
        if data.name == name {
            return Ok(());
        }
        let old = data.name.clone();
        let package = data.package;
        self.ensure_free_child_name(package, name)?;

        self.remove_class(package, &old)?;
        self.class_data_mut(cls)?.name = name.to_string();
        self.add_class(package, cls, name)?;
        self.mark_changed(cls.id());
        debug!(class = %cls, from = %old, to = name, "renamed class");
        self.committed();
        Ok(())
    }

    pub fn superclass(&mut self, cls: ClassId) -> MetaResult<Option<ClassId>> {
        Ok(self.class_data(cls)?.superclass)
    }

    /// Change the superclass. Setting the current one is a no-op.
    ///
    /// # Errors
    ///
    /// `InvalidSuperclass` if `superclass` is `cls` itself or one of its
    /// descendants. The chain is left unchanged.
    pub fn set_superclass(&mut self, cls: ClassId, superclass: Option<ClassId>) -> MetaResult<()> {
        let old = self.superclass(cls)?;
        if old == superclass {
            return Ok(());
        }
        if let Some(sup) = superclass {
            if sup == cls || self.is_subclass_of(sup, cls)? {
                return Err(MetaError::InvalidSuperclass {
                    class: self.qualified_class_name(cls)?,
                    proposed: self.qualified_class_name(sup)?,
                });
            }
            self.resolve_subclasses(sup)?;
        }
        if let Some(old) = old {
            self.resolve_subclasses(old)?;
        }

        if let Some(old) = old {
            self.class_data_mut(old)?.subclasses.remove(&cls);
        }
        if let Some(sup) = superclass {
            self.class_data_mut(sup)?.subclasses.insert(cls);
        }
        self.class_data_mut(cls)?.superclass = superclass;
        self.mark_changed(cls.id());
        debug!(class = %cls, ?superclass, "changed superclass");
        self.committed();
        Ok(())
    }

    /// Whether `other` appears strictly above `cls` in its superclass
    /// chain. A class is not its own subclass.
    pub fn is_subclass_of(&mut self, cls: ClassId, other: ClassId) -> MetaResult<bool> {
        Ok(self.ancestors(cls)?.contains(&other))
    }

    /// `cls == other` or [`is_subclass_of`](Self::is_subclass_of).
    pub fn is_kind_of(&mut self, cls: ClassId, other: ClassId) -> MetaResult<bool> {
        Ok(cls == other || self.is_subclass_of(cls, other)?)
    }

    /// Superclasses from the direct one upwards.
    pub fn ancestors(&mut self, cls: ClassId) -> MetaResult<Vec<ClassId>> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::from([cls]);
        let mut current = self.superclass(cls)?;
        while let Some(sup) = current {
            if !seen.insert(sup) {
                break;
            }
            chain.push(sup);
            current = self.superclass(sup)?;
        }
        Ok(chain)
    }

    /// `cls` followed by its ancestors.
    fn lineage(&mut self, cls: ClassId) -> MetaResult<Vec<ClassId>> {
        let mut chain = vec![cls];
        chain.extend(self.ancestors(cls)?);
        Ok(chain)
    }

    /// Find an attribute by name, walking up the superclass chain. The
    /// nearest owner wins.
    pub fn attribute(&mut self, cls: ClassId, name: &str) -> MetaResult<Option<AttributeId>> {
        for owner in self.lineage(cls)? {
            self.resolve_members(owner)?;
            if let Some(&attr) = self.class_data(owner)?.attributes.get(name) {
                return Ok(Some(attr));
            }
        }
        Ok(None)
    }

    /// Find a reference by name, walking up the superclass chain. The
    /// nearest owner wins.
    pub fn reference(&mut self, cls: ClassId, name: &str) -> MetaResult<Option<ReferenceId>> {
        for owner in self.lineage(cls)? {
            self.resolve_members(owner)?;
            if let Some(&r) = self.class_data(owner)?.references.get(name) {
                return Ok(Some(r));
            }
        }
        Ok(None)
    }

    pub fn has_attribute(&mut self, cls: ClassId, name: &str) -> MetaResult<bool> {
        Ok(self.attribute(cls, name)?.is_some())
    }

    pub fn has_reference(&mut self, cls: ClassId, name: &str) -> MetaResult<bool> {
        Ok(self.reference(cls, name)?.is_some())
    }

    /// Whether `cls` has or inherits a member named `name`.
    pub fn has_member(&mut self, cls: ClassId, name: &str) -> MetaResult<bool> {
        Ok(self.has_attribute(cls, name)? || self.has_reference(cls, name)?)
    }

    /// Names of the direct attributes, sorted.
    pub fn attribute_names(&mut self, cls: ClassId) -> MetaResult<Vec<String>> {
        self.resolve_members(cls)?;
        Ok(self.class_data(cls)?.attributes.keys().cloned().collect())
    }

    /// Names of the direct references, sorted.
    pub fn reference_names(&mut self, cls: ClassId) -> MetaResult<Vec<String>> {
        self.resolve_members(cls)?;
        Ok(self.class_data(cls)?.references.keys().cloned().collect())
    }

    /// Names of all attributes, inherited included, sorted.
    pub fn all_attribute_names(&mut self, cls: ClassId) -> MetaResult<Vec<String>> {
        let mut names = BTreeSet::new();
        for owner in self.lineage(cls)? {
            names.extend(self.attribute_names(owner)?);
        }
        Ok(names.into_iter().collect())
    }

    /// Names of all references, inherited included, sorted.
    pub fn all_reference_names(&mut self, cls: ClassId) -> MetaResult<Vec<String>> {
        let mut names = BTreeSet::new();
        for owner in self.lineage(cls)? {
            names.extend(self.reference_names(owner)?);
        }
        Ok(names.into_iter().collect())
    }

    /// Direct subclasses, ascending by id.
    pub fn subclasses(&mut self, cls: ClassId) -> MetaResult<Vec<ClassId>> {
        self.resolve_subclasses(cls)?;
        Ok(self.class_data(cls)?.subclasses.iter().copied().collect())
    }

    /// References targeting `cls`, ascending by id.
    pub fn utilizers(&mut self, cls: ClassId) -> MetaResult<Vec<ReferenceId>> {
        self.resolve_utilizers(cls)?;
        Ok(self.class_data(cls)?.utilizers.iter().copied().collect())
    }

    pub fn class_package(&mut self, cls: ClassId) -> MetaResult<PackageId> {
        Ok(self.class_data(cls)?.package)
    }

    /// `pkg::Name`, or just `Name` in the root package.
    pub fn qualified_class_name(&mut self, cls: ClassId) -> MetaResult<String> {
        let data = self.class_data(cls)?;
        let (package, name) = (data.package, data.name.clone());
        self.qualify_in(package, &name)
    }

    /// Move a class to `package` (the root if `None`).
    ///
    /// # Errors
    ///
    /// `NameConflict` if the package already has a child with this name.
    pub fn set_class_package(&mut self, cls: ClassId, package: Option<PackageId>) -> MetaResult<()> {
        let package = package.unwrap_or(PackageId::ROOT);
        let data = self.class_data(cls)?;
        let (old, name) = (data.package, data.name.clone());
        if old == package {
            return Ok(());
        }
        self.ensure_free_child_name(package, &name)?;
        self.resolve_children(old)?;

        self.remove_class(old, &name)?;
        self.class_data_mut(cls)?.package = package;
        self.add_class(package, cls, &name)?;
        self.mark_changed(cls.id());
        debug!(class = %cls, from = %old, to = %package, "moved class");
        self.committed();
        Ok(())
    }

    /// Delete a class.
    ///
    /// Cascades to owned attributes, owned references and references that
    /// target this class; the classes owning those references survive.
    /// Direct subclasses are relinked to this class's superclass.
    pub fn delete_class(&mut self, cls: ClassId) -> MetaResult<()> {
        self.delete_class_inner(cls)?;
        self.committed();
        Ok(())
    }

    /// Load and resolve everything deleting `cls` touches, so that the
    /// deletion itself never reaches the adapter.
    pub(crate) fn prepare_class_removal(&mut self, cls: ClassId) -> MetaResult<()> {
        let data = self.class_data(cls)?;
        let (package, superclass) = (data.package, data.superclass);

        self.resolve_members(cls)?;
        self.resolve_subclasses(cls)?;
        self.resolve_utilizers(cls)?;
        self.resolve_children(package)?;
        if let Some(sup) = superclass {
            self.resolve_subclasses(sup)?;
        }
        for r in self.doomed_references(cls)? {
            self.prepare_reference_removal(r)?;
        }
        Ok(())
    }

    /// Owned references plus the references targeting `cls`.
    fn doomed_references(&mut self, cls: ClassId) -> MetaResult<BTreeSet<ReferenceId>> {
        let data = self.class_data(cls)?;
        Ok(data
            .references
            .values()
            .chain(data.utilizers.iter())
            .copied()
            .collect())
    }

    pub(crate) fn delete_class_inner(&mut self, cls: ClassId) -> MetaResult<()> {
        self.prepare_class_removal(cls)?;

        let data = self.class_data(cls)?;
        let (name, package, superclass) = (data.name.clone(), data.package, data.superclass);
        let attributes: Vec<AttributeId> = data.attributes.values().copied().collect();
        let subclasses: Vec<ClassId> = data.subclasses.iter().copied().collect();
        let references = self.doomed_references(cls)?;

        for r in references {
            self.delete_reference_inner(r)?;
        }
        for attr in attributes {
            self.delete_attribute_inner(attr)?;
        }
        for sub in subclasses {
            self.class_data_mut(sub)?.superclass = superclass;
            if let Some(sup) = superclass {
                self.class_data_mut(sup)?.subclasses.insert(sub);
            }
            self.mark_changed(sub.id());
            debug!(class = %sub, ?superclass, "relinked subclass");
        }
        if let Some(sup) = superclass {
            self.class_data_mut(sup)?.subclasses.remove(&cls);
        }
        self.remove_class(package, &name)?;
        self.mark_deleted(cls.id(), ClassId::KIND);
        Ok(())
    }
}
