//! Attributes: small named values attached to a group or dataset.
//!
//! An [`Attribute`] follows the same rules as a [`Dataset`](crate::Dataset)
//! except that it is owned by an object instead of linked from a group:
//! its handle's parent is the owner's address. Writing a value of a
//! different shape deletes and recreates it. An open attribute keeps its
//! owner alive.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::{Error, Result, StoreError};
use crate::handle::Handle;
use crate::marshal::TypeMarshal;
use crate::object::Entry;
use crate::store::{ObjectAddr, SharedStore};

/// Attribute access for materialized objects.
pub trait Attributes: Entry {
    /// The attribute `name`: materialized when it exists, pending
    /// otherwise.
    fn attribute(&self, name: &str) -> Result<Attribute> {
        let (store, owner) = self.handle().location()?;
        let exists = store.borrow().attr_exists(owner, name);
        let exists = exists.map_err(|source| Error::Io {
            name: self.name().to_string(),
            source,
        })?;
        if !exists {
            return Ok(Attribute::from_handle(Handle::pending(store, owner, name)));
        }
        let id = store.borrow_mut().open_attr(owner, name);
        let id = id.map_err(|source| Error::ResourceOpen {
            name: name.to_string(),
            source,
        })?;
        Ok(Attribute::from_handle(Handle::materialized(store, id, owner, name)))
    }

    /// Attribute names, ascending.
    fn attribute_keys(&self) -> Result<Vec<String>> {
        let (store, owner) = self.handle().location()?;
        let names = store.borrow().attr_names(owner);
        names.map_err(|source| Error::Io {
            name: self.name().to_string(),
            source,
        })
    }

    fn has_attribute(&self, name: &str) -> Result<bool> {
        let (store, owner) = self.handle().location()?;
        let exists = store.borrow().attr_exists(owner, name);
        exists.map_err(|source| Error::Io {
            name: self.name().to_string(),
            source,
        })
    }

    fn attributes(&self) -> Result<Vec<Attribute>> {
        self.attribute_keys()?
            .iter()
            .map(|name| self.attribute(name))
            .collect()
    }
}

/// A named value stored in an object's header.
#[derive(Debug, Default)]
pub struct Attribute {
    handle: Handle,
}

impl Attribute {
    fn from_handle(handle: Handle) -> Attribute {
        Attribute { handle }
    }

    fn io_error(&self, source: StoreError) -> Error {
        Error::Io {
            name: self.handle.name().to_string(),
            source,
        }
    }

    /// Create attribute `name` on `owner` holding `value`. Failure yields an
    /// invalid attribute that keeps the name.
    pub fn create<O, T>(owner: &O, name: &str, value: &T) -> Attribute
    where
        O: Attributes + ?Sized,
        T: TypeMarshal,
    {
        Attribute::try_create(owner, name, value).unwrap_or_else(|err| {
            warn!(name, error = %err, "attribute creation failed");
            Attribute::from_handle(Handle::invalid(name))
        })
    }

    pub fn try_create<O, T>(owner: &O, name: &str, value: &T) -> Result<Attribute>
    where
        O: Attributes + ?Sized,
        T: TypeMarshal,
    {
        let (store, addr) = owner.handle().location()?;
        create_at(&store, addr, name, value)
    }

    /// Store `value`, creating the attribute if it is pending and
    /// recreating it if the shape changed.
    pub fn write<T: TypeMarshal>(&mut self, value: &T) -> Result<()> {
        if self.handle.is_pending() {
            let store = self.handle.shared_store()?;
            let owner = self.handle.parent();
            let name = self.handle.name().to_string();
            return match create_at(&store, owner, &name, value) {
                Ok(created) => {
                    *self = created;
                    Ok(())
                }
                Err(err) => {
                    self.handle.detach();
                    Err(err)
                }
            };
        }
        if !self.handle.is_valid() {
            return Err(Error::InvalidEntry(self.handle.name().to_string()));
        }

        let store = self.handle.shared_store()?;
        let space = self.space(&store)?;
        if value.matching_extents(space.extents()) {
            drop(space);
            let dtype = Datatype::native::<T::Elem>(&store);
            let view = value.raw_view();
            let written = store
                .borrow_mut()
                .write_attr(self.handle.id(), dtype.id(), bytemuck::cast_slice(&view));
            return written.map_err(|e| self.io_error(e));
        }

        drop(space);
        let owner = self.handle.parent();
        let name = self.handle.name().to_string();
        debug!(name, "attribute shape changed, recreating");
        self.handle.close();
        let deleted = store.borrow_mut().delete_attr(owner, &name);
        deleted.map_err(|source| Error::Deletion {
            name: name.clone(),
            source,
        })?;
        match create_at(&store, owner, &name, value) {
            Ok(created) => {
                *self = created;
                Ok(())
            }
            Err(err) => {
                self.handle.detach();
                Err(err)
            }
        }
    }

    pub fn read<T: TypeMarshal>(&self) -> Result<T> {
        if !self.handle.is_valid() {
            return Err(Error::InvalidEntry(self.handle.name().to_string()));
        }
        let store = self.handle.shared_store()?;
        let space = self.space(&store)?;
        if space.rank() != T::dimension_count() {
            return Err(Error::ShapeMismatch {
                actual: space.rank(),
                requested: std::any::type_name::<T>(),
            });
        }
        let mut value = T::allocate(space.extents())?;
        drop(space);
        let dtype = Datatype::native::<T::Elem>(&store);
        let read = store.borrow().read_attr(
            self.handle.id(),
            dtype.id(),
            bytemuck::cast_slice_mut(value.raw_view_mut()?),
        );
        read.map_err(|e| self.io_error(e))?;
        Ok(value)
    }

    pub fn extents(&self) -> Result<Vec<u64>> {
        let store = self.handle.shared_store()?;
        Ok(self.space(&store)?.extents().to_vec())
    }

    /// Address of the owning object.
    pub fn owner(&self) -> ObjectAddr {
        self.handle.parent()
    }

    pub fn close(&mut self) {
        self.handle.close();
    }

    fn space(&self, store: &SharedStore) -> Result<Dataspace> {
        if !self.handle.is_valid() {
            return Err(Error::InvalidEntry(self.handle.name().to_string()));
        }
        let id = store.borrow_mut().attr_space(self.handle.id());
        let id = id.map_err(|e| self.io_error(e))?;
        Dataspace::adopt(store, id).map_err(|e| self.io_error(e))
    }
}

impl Entry for Attribute {
    fn handle(&self) -> &Handle {
        &self.handle
    }
}

fn create_at<T: TypeMarshal>(
    store: &SharedStore,
    owner: ObjectAddr,
    name: &str,
    value: &T,
) -> Result<Attribute> {
    let open_error = |source| Error::ResourceOpen {
        name: name.to_string(),
        source,
    };
    let space = Dataspace::create(store, &value.shape_of()).map_err(open_error)?;
    let dtype = Datatype::create(store, value.datatype_of());
    let id = store
        .borrow_mut()
        .create_attr(owner, name, dtype.id(), space.id());
    let id = id.map_err(open_error)?;
    let attr = Attribute::from_handle(Handle::materialized(Rc::clone(store), id, owner, name));

    let mem = Datatype::native::<T::Elem>(store);
    let view = value.raw_view();
    let written = store
        .borrow_mut()
        .write_attr(id, mem.id(), bytemuck::cast_slice(&view));
    if let Err(source) = written {
        drop(attr);
        if let Err(cause) = store.borrow_mut().delete_attr(owner, name) {
            warn!(name, %cause, "could not remove half-created attribute");
        }
        return Err(Error::Io {
            name: name.to_string(),
            source,
        });
    }
    debug!(name, %owner, "attribute created");
    Ok(attr)
}
