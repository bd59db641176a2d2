//! Containers: groups and, through [`File`](crate::File), the root.

use tracing::debug;

use crate::attribute::Attributes;
use crate::dataset::Dataset;
use crate::error::{Error, Result, StoreError};
use crate::handle::{Handle, ObjectKind};
use crate::object::{kind_mismatch, Entry, Object};

/// A container of named entries.
#[derive(Debug, Default)]
pub struct Group {
    handle: Handle,
}

impl Group {
    pub(crate) fn from_handle(handle: Handle) -> Group {
        Group { handle }
    }

    fn io_error(&self, source: StoreError) -> Error {
        Error::Io {
            name: self.handle.name().to_string(),
            source,
        }
    }

    /// Child names, ascending.
    pub fn keys(&self) -> Result<Vec<String>> {
        let (store, addr) = self.handle.location()?;
        let names = store.borrow().link_names(addr);
        names.map_err(|e| self.io_error(e))
    }

    pub fn has_key(&self, name: &str) -> Result<bool> {
        let (store, addr) = self.handle.location()?;
        let exists = store.borrow().link_exists(addr, name);
        exists.map_err(|e| self.io_error(e))
    }

    /// The child called `name`: materialized when it exists, pending
    /// otherwise.
    pub fn item(&self, name: &str) -> Result<Object> {
        let (store, addr) = self.handle.location()?;
        if !self.has_key(name)? {
            return Ok(Object::from_handle(Handle::pending(store, addr, name)));
        }
        let id = store.borrow_mut().open_object(addr, name);
        let id = id.map_err(|source| Error::ResourceOpen {
            name: name.to_string(),
            source,
        })?;
        Ok(Object::from_handle(Handle::materialized(store, id, addr, name)))
    }

    /// One materialized entry per child, in key order.
    pub fn items(&self) -> Result<Vec<Object>> {
        self.keys()?.iter().map(|name| self.item(name)).collect()
    }

    /// The child group `name`, created if absent. Fails when `name` is
    /// taken by something other than a group.
    pub fn create_group(&self, name: &str) -> Result<Group> {
        let (store, addr) = self.handle.location()?;
        if self.has_key(name)? {
            let existing = self.item(name)?;
            if existing.kind() != ObjectKind::Group {
                return Err(Error::ResourceOpen {
                    name: name.to_string(),
                    source: StoreError::AlreadyExists(name.to_string()),
                });
            }
            return existing.into_group();
        }
        let id = store.borrow_mut().create_group(addr, name);
        let id = id.map_err(|source| Error::ResourceOpen {
            name: name.to_string(),
            source,
        })?;
        debug!(parent = %self.handle.name(), name, "group created");
        Ok(Group::from_handle(Handle::materialized(store, id, addr, name)))
    }

    /// The existing child group `name`.
    pub fn group(&self, name: &str) -> Result<Group> {
        self.item(name)?.into_group()
    }

    /// The child `name` as a dataset, pending if it does not exist yet.
    pub fn dataset(&self, name: &str) -> Result<Dataset> {
        self.item(name)?.into_dataset()
    }

    pub fn try_clone(&self) -> Result<Group> {
        Ok(Group::from_handle(self.handle.try_clone()?))
    }

    /// Replace this group with a deep copy of `other`. See
    /// [`Handle::assign_from`].
    pub fn assign_from(&mut self, other: &Group) -> Result<()> {
        self.handle.assign_from(&other.handle)
    }

    pub fn close(&mut self) {
        self.handle.close();
    }
}

impl Entry for Group {
    fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Attributes for Group {}

impl TryFrom<Object> for Group {
    type Error = Error;

    fn try_from(object: Object) -> Result<Group> {
        if !object.is_valid() || !object.is_group() {
            return Err(kind_mismatch(&object, "group"));
        }
        Ok(Group::from_handle(object.into_handle()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::File;

    #[test]
    fn keys_are_sorted() {
        let file = File::in_memory().unwrap();
        for name in ["zebra", "apple", "mango"] {
            file.create_group(name).unwrap();
        }
        assert_eq!(file.keys().unwrap(), vec!["apple", "mango", "zebra"]);
        assert_eq!(file.items().unwrap().len(), 3);
    }

    #[test]
    fn item_is_pending_for_missing_name() {
        let file = File::in_memory().unwrap();
        let item = file.item("missing").unwrap();
        assert!(item.is_pending());
        assert!(!file.has_key("missing").unwrap());
    }

    #[test]
    fn create_group_returns_existing() {
        let file = File::in_memory().unwrap();
        let a = file.create_group("g").unwrap();
        let b = file.create_group("g").unwrap();
        assert_eq!(a.object_addr(), b.object_addr());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn create_group_over_dataset_fails() {
        let file = File::in_memory().unwrap();
        file.dataset("d").unwrap().write(&1.5f64).unwrap();
        assert!(matches!(
            file.create_group("d"),
            Err(Error::ResourceOpen {
                source: StoreError::AlreadyExists(_),
                ..
            })
        ));
    }

    #[test]
    fn nested_groups() {
        let file = File::in_memory().unwrap();
        let outer = file.create_group("outer").unwrap();
        let inner = outer.create_group("inner").unwrap();
        assert_eq!(inner.parent(), outer.object_addr().unwrap());
        assert!(outer.group("inner").unwrap().is_valid());
        assert!(outer.group("nope").is_err());
    }

    #[test]
    fn closed_group_cannot_enumerate() {
        let file = File::in_memory().unwrap();
        let mut g = file.create_group("g").unwrap();
        g.close();
        assert!(matches!(g.keys(), Err(Error::InvalidEntry(_))));
        assert!(matches!(g.item("x"), Err(Error::InvalidEntry(_))));
    }

    #[test]
    fn group_assignment_copies_subtree() {
        let file = File::in_memory().unwrap();
        let src = file.create_group("src").unwrap();
        src.dataset("x").unwrap().write(&vec![1i32, 2]).unwrap();
        let mut dst = file.create_group("dst").unwrap();
        dst.assign_from(&src).unwrap();
        let copied: Vec<i32> = dst.dataset("x").unwrap().read().unwrap();
        assert_eq!(copied, vec![1, 2]);
        assert_ne!(
            dst.dataset("x").unwrap().object_addr(),
            src.dataset("x").unwrap().object_addr()
        );
    }
}
