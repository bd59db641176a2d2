//! Untyped entries and the accessors shared by every entry type.

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::group::Group;
use crate::handle::{Handle, ObjectKind};
use crate::store::{Hid, ObjectAddr};

/// Accessors every entry provides through its [`Handle`].
pub trait Entry {
    fn handle(&self) -> &Handle;

    fn name(&self) -> &str {
        self.handle().name()
    }

    fn parent(&self) -> ObjectAddr {
        self.handle().parent()
    }

    fn id(&self) -> Hid {
        self.handle().id()
    }

    fn kind(&self) -> ObjectKind {
        self.handle().kind()
    }

    /// Backed by an open object.
    fn is_valid(&self) -> bool {
        self.handle().is_valid()
    }

    /// Named but not yet created.
    fn is_pending(&self) -> bool {
        self.handle().is_pending()
    }

    /// Identity of the backing object.
    fn object_addr(&self) -> Option<ObjectAddr> {
        self.handle().object_addr()
    }
}

/// An entry of not yet known kind, as returned by [`Group::item`].
#[derive(Debug, Default)]
pub struct Object {
    handle: Handle,
}

impl Object {
    pub(crate) fn from_handle(handle: Handle) -> Object {
        Object { handle }
    }

    pub(crate) fn into_handle(self) -> Handle {
        self.handle
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind(), ObjectKind::Group | ObjectKind::File)
    }

    pub fn is_dataset(&self) -> bool {
        self.kind() == ObjectKind::Dataset
    }

    pub fn try_clone(&self) -> Result<Object> {
        Ok(Object::from_handle(self.handle.try_clone()?))
    }

    /// See [`Handle::assign_from`].
    pub fn assign_from(&mut self, other: &Object) -> Result<()> {
        self.handle.assign_from(&other.handle)
    }

    pub fn close(&mut self) {
        self.handle.close();
    }

    /// View as a dataset. Pending objects become pending datasets.
    pub fn into_dataset(self) -> Result<Dataset> {
        Dataset::try_from(self)
    }

    /// View as a group. The object must be a materialized group.
    pub fn into_group(self) -> Result<Group> {
        Group::try_from(self)
    }
}

impl Entry for Object {
    fn handle(&self) -> &Handle {
        &self.handle
    }
}

pub(crate) fn kind_mismatch(object: &Object, wanted: &str) -> Error {
    Error::InvalidEntry(format!("{} is {:?}, not a {wanted}", object.name(), object.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::File;

    #[test]
    fn default_object_is_invalid() {
        let o = Object::default();
        assert!(!o.is_valid());
        assert!(!o.is_pending());
        assert_eq!(o.kind(), ObjectKind::Invalid);
        assert!(o.into_dataset().is_err());
    }

    #[test]
    fn kind_checks() {
        let file = File::in_memory().unwrap();
        let g = file.create_group("g").unwrap();
        drop(g);
        let item = file.item("g").unwrap();
        assert!(item.is_group());
        assert!(!item.is_dataset());
        assert!(matches!(item.into_dataset(), Err(Error::InvalidEntry(_))));
    }

    #[test]
    fn pending_object_converts_to_pending_dataset() {
        let file = File::in_memory().unwrap();
        let ds = file.item("later").unwrap().into_dataset().unwrap();
        assert!(ds.is_pending());
        assert_eq!(ds.name(), "later");
    }

    #[test]
    fn close_then_reopen_via_container() {
        let file = File::in_memory().unwrap();
        file.create_group("g").unwrap();
        let mut item = file.item("g").unwrap();
        let addr = item.object_addr();
        item.close();
        assert!(item.is_pending());
        assert_eq!(file.item("g").unwrap().object_addr(), addr);
    }
}
