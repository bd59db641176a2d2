//! The shared core of every entry: a store id plus the location it names.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::store::{Hid, IdKind, ObjectAddr, SharedStore};

/// What an entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    File,
    Group,
    Dataset,
    Datatype,
    Dataspace,
    Attribute,
    /// No backing resource is held.
    Invalid,
}

impl From<IdKind> for ObjectKind {
    fn from(kind: IdKind) -> Self {
        match kind {
            IdKind::File => ObjectKind::File,
            IdKind::Group => ObjectKind::Group,
            IdKind::Dataset => ObjectKind::Dataset,
            IdKind::Datatype => ObjectKind::Datatype,
            IdKind::Dataspace => ObjectKind::Dataspace,
            IdKind::Attribute => ObjectKind::Attribute,
        }
    }
}

/// Release `id`, logging instead of failing. Used on every drop path, so
/// a store that is already borrowed is reported rather than panicking.
pub(crate) fn release(store: &SharedStore, id: Hid) {
    match store.try_borrow_mut() {
        Ok(mut s) => {
            if let Err(cause) = s.close(id) {
                warn!(error = %Error::Close(id), %cause, "release failed");
            }
        }
        Err(_) => warn!(error = %Error::Close(id), "store busy, id leaked"),
    }
}

/// A reference to a location in a file.
///
/// A handle is in one of three states, derived from its fields:
///
/// * materialized: it holds an open id (and, unless it is the root, a
///   name and a parent);
/// * pending: no id, but a name and a parent, so the first write can
///   create the object;
/// * invalid: anything else.
///
/// An open id is released exactly once, by [`close`](Handle::close) or on
/// drop.
#[derive(Default)]
pub struct Handle {
    store: Option<SharedStore>,
    id: Hid,
    parent: ObjectAddr,
    name: String,
}

impl Handle {
    pub(crate) fn materialized(
        store: SharedStore,
        id: Hid,
        parent: ObjectAddr,
        name: impl Into<String>,
    ) -> Handle {
        Handle {
            store: Some(store),
            id,
            parent,
            name: name.into(),
        }
    }

    pub(crate) fn pending(store: SharedStore, parent: ObjectAddr, name: impl Into<String>) -> Handle {
        Handle {
            store: Some(store),
            id: Hid::NONE,
            parent,
            name: name.into(),
        }
    }

    /// An invalid handle that still remembers the name it was meant for.
    pub(crate) fn invalid(name: impl Into<String>) -> Handle {
        Handle {
            store: None,
            id: Hid::NONE,
            parent: ObjectAddr::NONE,
            name: name.into(),
        }
    }

    pub fn id(&self) -> Hid {
        self.id
    }

    pub fn parent(&self) -> ObjectAddr {
        self.parent
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> Option<&SharedStore> {
        self.store.as_ref()
    }

    /// Kind of the open id, or [`ObjectKind::Invalid`] when none is held.
    pub fn kind(&self) -> ObjectKind {
        match (&self.store, self.id.is_none()) {
            (Some(store), false) => store
                .borrow()
                .id_kind(self.id)
                .map_or(ObjectKind::Invalid, ObjectKind::from),
            _ => ObjectKind::Invalid,
        }
    }

    pub fn is_valid(&self) -> bool {
        if self.id.is_none() {
            return false;
        }
        (!self.parent.is_none() && !self.name.is_empty()) || self.kind() == ObjectKind::File
    }

    pub fn is_pending(&self) -> bool {
        self.id.is_none() && !self.name.is_empty() && !self.parent.is_none() && self.store.is_some()
    }

    /// Address of the backing object. `None` unless materialized as a
    /// file, group or dataset.
    pub fn object_addr(&self) -> Option<ObjectAddr> {
        let store = self.store.as_ref()?;
        if self.id.is_none() {
            return None;
        }
        store.borrow().object_addr(self.id).ok()
    }

    /// The store and object address of a materialized entry.
    pub(crate) fn location(&self) -> Result<(SharedStore, ObjectAddr)> {
        match (&self.store, self.object_addr()) {
            (Some(store), Some(addr)) if self.is_valid() => Ok((Rc::clone(store), addr)),
            _ => Err(Error::InvalidEntry(self.name.clone())),
        }
    }

    /// The store of a materialized or pending entry.
    pub(crate) fn shared_store(&self) -> Result<SharedStore> {
        self.store
            .clone()
            .ok_or_else(|| Error::InvalidEntry(self.name.clone()))
    }

    /// An independent handle to the same location. A materialized handle
    /// gets a fresh id on the same object; other states copy as they are.
    pub fn try_clone(&self) -> Result<Handle> {
        let id = match &self.store {
            Some(store) if !self.id.is_none() => {
                store
                    .borrow_mut()
                    .reopen(self.id)
                    .map_err(|source| Error::ResourceOpen {
                        name: self.name.clone(),
                        source,
                    })?
            }
            _ => Hid::NONE,
        };
        Ok(Handle {
            store: self.store.clone(),
            id,
            parent: self.parent,
            name: self.name.clone(),
        })
    }

    fn same_location(&self, other: &Handle) -> bool {
        let same_store = match (&self.store, &other.store) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_store && self.parent == other.parent && self.name == other.name
    }

    /// Make this location hold a copy of `other`.
    ///
    /// Assigning a location to itself does nothing. When `other` is
    /// materialized and this handle names a location (materialized or
    /// pending), whatever is linked there is replaced by a deep copy of
    /// `other`'s object. In every other case this handle becomes a copy of
    /// `other`.
    pub fn assign_from(&mut self, other: &Handle) -> Result<()> {
        if self.same_location(other) {
            return Ok(());
        }
        let names_location = !self.parent.is_none() && (self.is_valid() || self.is_pending());
        if !(other.is_valid() && names_location) {
            *self = other.try_clone()?;
            return Ok(());
        }

        let store = match (&self.store, &other.store) {
            (Some(a), Some(b)) if Rc::ptr_eq(a, b) => Rc::clone(a),
            _ => return Err(Error::InvalidEntry(self.name.clone())),
        };
        self.close();

        let mut s = store.borrow_mut();
        let exists = s.link_exists(self.parent, &self.name).map_err(|source| Error::Deletion {
            name: self.name.clone(),
            source,
        })?;
        if exists {
            s.delete_link(self.parent, &self.name)
                .map_err(|source| Error::Deletion {
                    name: self.name.clone(),
                    source,
                })?;
        }
        s.copy_object(other.id, self.parent, &self.name)
            .map_err(|source| Error::Io {
                name: self.name.clone(),
                source,
            })?;
        self.id = s
            .open_object(self.parent, &self.name)
            .map_err(|source| Error::ResourceOpen {
                name: self.name.clone(),
                source,
            })?;
        debug!(name = %self.name, from = %other.name, replaced = exists, "entry assigned");
        Ok(())
    }

    /// Release the id if one is held. Name and parent are kept, so a
    /// closed entry becomes pending.
    pub fn close(&mut self) {
        if self.id.is_none() {
            return;
        }
        if let Some(store) = &self.store {
            release(store, self.id);
        }
        self.id = Hid::NONE;
    }

    /// Close and forget the parent: the entry becomes invalid.
    pub(crate) fn detach(&mut self) {
        self.close();
        self.parent = ObjectAddr::NONE;
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("name", &self.name)
            .finish()
    }
}
