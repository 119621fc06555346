//! model::package
//!
//! Packages: named namespaces holding classes and nested packages.
//!
//! # Invariants
//!
//! - Direct children (classes and subpackages) have distinct names
//! - A package is never its own ancestor
//! - The root package has no parent and is never renamed, moved or deleted

use tracing::debug;

use super::element::Element;
use super::Metamodel;
use crate::core::error::{MetaError, MetaResult};
use crate::core::naming::{qualify, validate_name, PATH_SEPARATOR};
use crate::core::record::ROOT_PACKAGE_NAME;
use crate::core::types::{ClassId, PackageId};

impl Metamodel {
    /// Create a package under `parent` (the root if `None`).
    ///
    /// # Errors
    ///
    /// - `InvalidName` if `name` is not a valid element name
    /// - `ElementMissing` if the parent is deleted
    /// - `NameConflict` if the parent already has a child named `name`
    pub fn create_package(&mut self, name: &str, parent: Option<PackageId>) -> MetaResult<PackageId> {
        validate_name(name)?;
        let parent = parent.unwrap_or(PackageId::ROOT);
        self.ensure_free_child_name(parent, name)?;

        let id = self.create_element(Element::new_package(name.to_string(), parent))?;
        let pkg = PackageId::from(id);
        self.add_subpackage(parent, pkg, name)?;
        self.committed();
        Ok(pkg)
    }

    pub fn package_name(&mut self, pkg: PackageId) -> MetaResult<String> {
        Ok(self.package_data(pkg)?.name.clone())
    }

    /// Rename a package. Renaming to the current name is a no-op.
    ///
    /// # Errors
    ///
    /// - `RootPackage` for the root
    /// - `NameConflict` if a sibling already uses `name`
    pub fn set_package_name(&mut self, pkg: PackageId, name: &str) -> MetaResult<()> {
        if pkg.is_root() {
            return Err(MetaError::RootPackage);
        }
        validate_name(name)?;
        let data = self.package_data(pkg)?;
        if data.name == name {
            return Ok(());
        }
        let old = data.name.clone();
        let parent = data.parent.unwrap_or(PackageId::ROOT);
        self.ensure_free_child_name(parent, name)?;

        self.remove_subpackage(parent, &old)?;
        self.package_data_mut(pkg)?.name = name.to_string();
        self.add_subpackage(parent, pkg, name)?;
        self.mark_changed(pkg.id());
        debug!(package = %pkg, from = %old, to = name, "renamed package");
        self.committed();
        Ok(())
    }

    /// The parent package, `None` only for the root.
    pub fn package_parent(&mut self, pkg: PackageId) -> MetaResult<Option<PackageId>> {
        Ok(self.package_data(pkg)?.parent)
    }

    /// Move a package under `parent` (the root if `None`).
    ///
    /// # Errors
    ///
    /// - `RootPackage` for the root
    /// - `PackageLoop` if `parent` is the package itself or nested in it
    /// - `NameConflict` if `parent` already has a child with this name
    pub fn set_package_parent(&mut self, pkg: PackageId, parent: Option<PackageId>) -> MetaResult<()> {
        if pkg.is_root() {
            return Err(MetaError::RootPackage);
        }
        let parent = parent.unwrap_or(PackageId::ROOT);
        let data = self.package_data(pkg)?;
        let old_parent = data.parent.unwrap_or(PackageId::ROOT);
        let name = data.name.clone();
        if old_parent == parent {
            return Ok(());
        }

        if self.package_ancestry(parent)?.contains(&pkg) {
            return Err(MetaError::PackageLoop {
                package: self.qualified_package_name(pkg)?,
                parent: self.qualified_package_name(parent)?,
            });
        }
        self.ensure_free_child_name(parent, &name)?;
        self.resolve_children(old_parent)?;

        self.remove_subpackage(old_parent, &name)?;
        self.package_data_mut(pkg)?.parent = Some(parent);
        self.add_subpackage(parent, pkg, &name)?;
        self.mark_changed(pkg.id());
        debug!(package = %pkg, from = %old_parent, to = %parent, "moved package");
        self.committed();
        Ok(())
    }

    /// Whether `pkg` has a direct class or subpackage named `name`.
    pub fn package_has_child(&mut self, pkg: PackageId, name: &str) -> MetaResult<bool> {
        self.resolve_children(pkg)?;
        Ok(self.package_data(pkg)?.has_child(name))
    }

    pub fn package_class(&mut self, pkg: PackageId, name: &str) -> MetaResult<Option<ClassId>> {
        self.resolve_children(pkg)?;
        Ok(self.package_data(pkg)?.classes.get(name).copied())
    }

    pub fn package_subpackage(&mut self, pkg: PackageId, name: &str) -> MetaResult<Option<PackageId>> {
        self.resolve_children(pkg)?;
        Ok(self.package_data(pkg)?.subpackages.get(name).copied())
    }

    /// Direct classes, sorted by name.
    pub fn package_classes(&mut self, pkg: PackageId) -> MetaResult<Vec<ClassId>> {
        self.resolve_children(pkg)?;
        Ok(self.package_data(pkg)?.classes.values().copied().collect())
    }

    /// Direct subpackages, sorted by name.
    pub fn package_subpackages(&mut self, pkg: PackageId) -> MetaResult<Vec<PackageId>> {
        self.resolve_children(pkg)?;
        Ok(self.package_data(pkg)?.subpackages.values().copied().collect())
    }

    /// `outer::inner` for a nested package. The root is just its name.
    pub fn qualified_package_name(&mut self, pkg: PackageId) -> MetaResult<String> {
        let path = self.package_path(pkg)?;
        if path.is_empty() {
            Ok(ROOT_PACKAGE_NAME.to_string())
        } else {
            Ok(path.join(PATH_SEPARATOR))
        }
    }

    /// Delete a package together with everything nested in it.
    ///
    /// The whole subtree is loaded before anything is removed, so an
    /// adapter failure leaves the package intact.
    ///
    /// # Errors
    ///
    /// `RootPackage` for the root.
    pub fn delete_package(&mut self, pkg: PackageId) -> MetaResult<()> {
        if pkg.is_root() {
            return Err(MetaError::RootPackage);
        }
        let data = self.package_data(pkg)?;
        let name = data.name.clone();
        let parent = data.parent.unwrap_or(PackageId::ROOT);
        self.resolve_children(parent)?;
        self.prepare_package_removal(pkg)?;

        for cls in self.package_classes(pkg)? {
            self.delete_class_inner(cls)?;
        }
        for child in self.package_subpackages(pkg)? {
            self.delete_package_inner(child)?;
        }

        self.remove_subpackage(parent, &name)?;
        self.mark_deleted(pkg.id(), PackageId::KIND);
        self.committed();
        Ok(())
    }

    fn prepare_package_removal(&mut self, pkg: PackageId) -> MetaResult<()> {
        let mut pending = vec![pkg];
        while let Some(current) = pending.pop() {
            for cls in self.package_classes(current)? {
                self.prepare_class_removal(cls)?;
            }
            pending.extend(self.package_subpackages(current)?);
        }
        Ok(())
    }

    fn delete_package_inner(&mut self, pkg: PackageId) -> MetaResult<()> {
        for cls in self.package_classes(pkg)? {
            self.delete_class_inner(cls)?;
        }
        for child in self.package_subpackages(pkg)? {
            self.delete_package_inner(child)?;
        }
        self.mark_deleted(pkg.id(), PackageId::KIND);
        Ok(())
    }

    /// Names from below the root down to `pkg`.
    pub(crate) fn package_path(&mut self, pkg: PackageId) -> MetaResult<Vec<String>> {
        let mut path = Vec::new();
        for ancestor in self.package_ancestry(pkg)? {
            if !ancestor.is_root() {
                path.push(self.package_name(ancestor)?);
            }
        }
        path.reverse();
        Ok(path)
    }

    /// `pkg` followed by its ancestors up to the root.
    fn package_ancestry(&mut self, pkg: PackageId) -> MetaResult<Vec<PackageId>> {
        let mut chain = vec![pkg];
        let mut current = self.package_parent(pkg)?;
        while let Some(parent) = current {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = self.package_parent(parent)?;
        }
        Ok(chain)
    }

    /// Qualified name of a class: `pkg::Name`, or `Name` in the root.
    pub(crate) fn qualify_in(&mut self, pkg: PackageId, name: &str) -> MetaResult<String> {
        let path = self.package_path(pkg)?;
        Ok(qualify(&path, name))
    }

    /// Fail with `NameConflict` if `pkg` already has a child named `name`.
    pub(crate) fn ensure_free_child_name(&mut self, pkg: PackageId, name: &str) -> MetaResult<()> {
        if self.package_has_child(pkg, name)? {
            return Err(MetaError::NameConflict {
                name: name.to_string(),
                scope: format!("package '{}'", self.qualified_package_name(pkg)?),
            });
        }
        Ok(())
    }

    // Linkage primitives. They keep the name indexes in step with the
    // forward links and never mark anything changed.

    pub(crate) fn add_class(&mut self, pkg: PackageId, cls: ClassId, name: &str) -> MetaResult<()> {
        self.resolve_children(pkg)?;
        self.package_data_mut(pkg)?.classes.insert(name.to_string(), cls);
        Ok(())
    }

    pub(crate) fn remove_class(&mut self, pkg: PackageId, name: &str) -> MetaResult<Option<ClassId>> {
        self.resolve_children(pkg)?;
        Ok(self.package_data_mut(pkg)?.classes.remove(name))
    }

    pub(crate) fn add_subpackage(&mut self, pkg: PackageId, child: PackageId, name: &str) -> MetaResult<()> {
        self.resolve_children(pkg)?;
        self.package_data_mut(pkg)?.subpackages.insert(name.to_string(), child);
        Ok(())
    }

    pub(crate) fn remove_subpackage(&mut self, pkg: PackageId, name: &str) -> MetaResult<Option<PackageId>> {
        self.resolve_children(pkg)?;
        Ok(self.package_data_mut(pkg)?.subpackages.remove(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::core::error::ErrorReason;
    use crate::model::ElementState;

    fn model() -> Metamodel {
        Metamodel::new(Box::new(MemoryAdapter::new()))
    }

    #[test]
    fn root_package_is_preseeded() {
        let mut model = model();
        let root = model.root_package();
        assert_eq!(model.package_name(root).unwrap(), "default");
        assert_eq!(model.package_parent(root).unwrap(), None);
        assert_eq!(model.qualified_package_name(root).unwrap(), "default");
    }

    #[test]
    fn root_package_is_immutable() {
        let mut model = model();
        let root = model.root_package();
        for err in [
            model.set_package_name(root, "other").unwrap_err(),
            model.set_package_parent(root, None).unwrap_err(),
            model.delete_package(root).unwrap_err(),
        ] {
            assert_eq!(err.reason(), ErrorReason::RootPackage);
        }
    }

    #[test]
    fn nested_packages_qualify_their_names() {
        let mut model = model();
        let zoo = model.create_package("zoo", None).unwrap();
        let birds = model.create_package("birds", Some(zoo)).unwrap();
        assert_eq!(model.qualified_package_name(birds).unwrap(), "zoo::birds");
        assert_eq!(model.package_subpackage(zoo, "birds").unwrap(), Some(birds));
        assert!(model.package_has_child(zoo, "birds").unwrap());
    }

    #[test]
    fn sibling_names_must_be_unique() {
        let mut model = model();
        model.create_package("zoo", None).unwrap();
        model.create_class("Keeper", None, None).unwrap();

        let err = model.create_package("zoo", None).unwrap_err();
        assert_eq!(err.reason(), ErrorReason::NameConflict);
        let err = model.create_package("Keeper", None).unwrap_err();
        assert_eq!(err.reason(), ErrorReason::NameConflict);
    }

    #[test]
    fn rename_updates_parent_index() {
        let mut model = model();
        let zoo = model.create_package("zoo", None).unwrap();
        model.set_package_name(zoo, "park").unwrap();

        let root = model.root_package();
        assert_eq!(model.package_subpackage(root, "zoo").unwrap(), None);
        assert_eq!(model.package_subpackage(root, "park").unwrap(), Some(zoo));
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let mut model = model();
        let zoo = model.create_package("zoo", None).unwrap();
        model.flush().unwrap();
        model.set_package_name(zoo, "zoo").unwrap();
        assert!(!model.is_dirty());
    }

    #[test]
    fn moving_into_a_descendant_is_a_loop() {
        let mut model = model();
        let a = model.create_package("a", None).unwrap();
        let b = model.create_package("b", Some(a)).unwrap();
        let c = model.create_package("c", Some(b)).unwrap();

        for target in [a, c] {
            let err = model.set_package_parent(a, Some(target)).unwrap_err();
            assert_eq!(err.reason(), ErrorReason::PackageLoop);
        }
        assert_eq!(model.package_parent(a).unwrap(), Some(PackageId::ROOT));
    }

    #[test]
    fn move_checks_names_in_new_parent() {
        let mut model = model();
        let a = model.create_package("a", None).unwrap();
        let b = model.create_package("b", None).unwrap();
        let inner = model.create_package("shared", Some(a)).unwrap();
        model.create_package("shared", Some(b)).unwrap();

        let err = model.set_package_parent(inner, Some(b)).unwrap_err();
        assert_eq!(err.reason(), ErrorReason::NameConflict);
        assert_eq!(model.package_parent(inner).unwrap(), Some(a));

        model.set_package_parent(inner, None).unwrap();
        assert_eq!(model.package_subpackage(a, "shared").unwrap(), None);
        assert_eq!(model.qualified_package_name(inner).unwrap(), "shared");
    }

    #[test]
    fn delete_package_cascades() {
        let mut model = model();
        let zoo = model.create_package("zoo", None).unwrap();
        let birds = model.create_package("birds", Some(zoo)).unwrap();
        let parrot = model.create_class("Parrot", None, Some(birds)).unwrap();
        let keeper = model.create_class("Keeper", None, Some(zoo)).unwrap();

        model.delete_package(zoo).unwrap();
        for id in [zoo.id(), birds.id(), parrot.id(), keeper.id()] {
            assert_eq!(model.state(id), Some(ElementState::Deleted));
        }
        assert!(model.package_subpackages(model.root_package()).unwrap().is_empty());
        assert_eq!(
            model.package_name(zoo).unwrap_err().reason(),
            ErrorReason::ElementMissing
        );
    }
}
