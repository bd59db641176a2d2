//! Datasets and the write / create / read protocol.
//!
//! Writing a value to a dataset takes one of three paths:
//!
//! * the dataset is pending: it is created from the value;
//! * the stored extents match the value's: the buffer is overwritten in
//!   place and the object keeps its identity;
//! * the extents differ: the link is deleted and the dataset created
//!   again under the same name.
//!
//! Recreation is not transactional. When the new dataset cannot be
//! created after the old one was unlinked, the name is left absent and
//! the entry becomes invalid.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::attribute::Attributes;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::{Error, Result, StoreError};
use crate::group::Group;
use crate::handle::{Handle, ObjectKind};
use crate::marshal::TypeMarshal;
use crate::object::{kind_mismatch, Entry, Object};
use crate::store::{ObjectAddr, Primitive, SharedStore};

/// A fixed-shape typed array stored under a name.
#[derive(Debug, Default)]
pub struct Dataset {
    handle: Handle,
}

impl Dataset {
    fn from_handle(handle: Handle) -> Dataset {
        Dataset { handle }
    }

    fn io_error(&self, source: StoreError) -> Error {
        Error::Io {
            name: self.handle.name().to_string(),
            source,
        }
    }

    /// Create `name` under `parent` holding `value`.
    ///
    /// Never fails outright: on error the result is an invalid dataset
    /// that keeps the requested name but has no parent. Use
    /// [`try_create`](Dataset::try_create) to see the cause.
    pub fn create<T: TypeMarshal>(parent: &Group, name: &str, value: &T) -> Dataset {
        Dataset::try_create(parent, name, value).unwrap_or_else(|err| {
            warn!(name, error = %err, "dataset creation failed");
            Dataset::from_handle(Handle::invalid(name))
        })
    }

    pub fn try_create<T: TypeMarshal>(parent: &Group, name: &str, value: &T) -> Result<Dataset> {
        let (store, addr) = parent.handle().location()?;
        create_at(&store, addr, name, value)
    }

    /// Store `value` under this entry's name.
    pub fn write<T: TypeMarshal>(&mut self, value: &T) -> Result<()> {
        if self.handle.is_pending() {
            let store = self.handle.shared_store()?;
            return self.replace_with(&store, value);
        }
        if !self.handle.is_valid() {
            return Err(Error::InvalidEntry(self.handle.name().to_string()));
        }

        let store = self.handle.shared_store()?;
        let space = self.space(&store)?;
        if value.matching_extents(space.extents()) {
            drop(space);
            return self.write_in_place(&store, value);
        }

        warn!(
            name = %self.handle.name(),
            stored = ?space.extents(),
            new = ?value.shape_of(),
            "shape changed, recreating dataset"
        );
        drop(space);
        let parent = self.handle.parent();
        let name = self.handle.name().to_string();
        self.handle.close();
        let deleted = store.borrow_mut().delete_link(parent, &name);
        deleted.map_err(|source| Error::Deletion { name, source })?;
        self.replace_with(&store, value)
    }

    /// Create this entry from `value` and take over the new handle. On
    /// failure the entry is left invalid.
    fn replace_with<T: TypeMarshal>(&mut self, store: &SharedStore, value: &T) -> Result<()> {
        let parent = self.handle.parent();
        let name = self.handle.name().to_string();
        match create_at(store, parent, &name, value) {
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

    fn write_in_place<T: TypeMarshal>(&self, store: &SharedStore, value: &T) -> Result<()> {
        let mem = Datatype::native::<T::Elem>(store);
        let view = value.raw_view();
        let written = store
            .borrow_mut()
            .write_dataset(self.handle.id(), mem.id(), bytemuck::cast_slice(&view));
        written.map_err(|e| self.io_error(e))?;
        debug!(name = %self.handle.name(), "dataset written in place");
        Ok(())
    }

    /// Read the whole dataset as a `T`. The stored rank must equal
    /// `T::dimension_count()`; element types are converted.
    pub fn read<T: TypeMarshal>(&self) -> Result<T> {
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
        let mem = Datatype::native::<T::Elem>(&store);
        let read = store.borrow().read_dataset(
            self.handle.id(),
            mem.id(),
            bytemuck::cast_slice_mut(value.raw_view_mut()?),
        );
        read.map_err(|e| self.io_error(e))?;
        Ok(value)
    }

    /// Current extents, one per dimension.
    pub fn extents(&self) -> Result<Vec<u64>> {
        let store = self.handle.shared_store()?;
        Ok(self.space(&store)?.extents().to_vec())
    }

    pub fn dimension_count(&self) -> Result<usize> {
        let store = self.handle.shared_store()?;
        Ok(self.space(&store)?.rank())
    }

    /// Stored element type.
    pub fn element_type(&self) -> Result<Primitive> {
        if !self.handle.is_valid() {
            return Err(Error::InvalidEntry(self.handle.name().to_string()));
        }
        let store = self.handle.shared_store()?;
        let id = store.borrow_mut().dataset_type(self.handle.id());
        let id = id.map_err(|e| self.io_error(e))?;
        let dtype = Datatype::adopt(&store, id).map_err(|e| self.io_error(e))?;
        Ok(dtype.primitive())
    }

    pub fn try_clone(&self) -> Result<Dataset> {
        Ok(Dataset::from_handle(self.handle.try_clone()?))
    }

    /// Replace this dataset with a deep copy of `other`. See
    /// [`Handle::assign_from`].
    pub fn assign_from(&mut self, other: &Dataset) -> Result<()> {
        self.handle.assign_from(&other.handle)
    }

    pub fn close(&mut self) {
        self.handle.close();
    }

    fn space(&self, store: &SharedStore) -> Result<Dataspace> {
        if !self.handle.is_valid() {
            return Err(Error::InvalidEntry(self.handle.name().to_string()));
        }
        let id = store.borrow_mut().dataset_space(self.handle.id());
        let id = id.map_err(|e| self.io_error(e))?;
        Dataspace::adopt(store, id).map_err(|e| self.io_error(e))
    }
}

impl Entry for Dataset {
    fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Attributes for Dataset {}

impl TryFrom<Object> for Dataset {
    type Error = Error;

    fn try_from(object: Object) -> Result<Dataset> {
        if object.is_pending() || object.kind() == ObjectKind::Dataset {
            Ok(Dataset::from_handle(object.into_handle()))
        } else {
            Err(kind_mismatch(&object, "dataset"))
        }
    }
}

fn create_at<T: TypeMarshal>(
    store: &SharedStore,
    parent: ObjectAddr,
    name: &str,
    value: &T,
) -> Result<Dataset> {
    let open_error = |source| Error::ResourceOpen {
        name: name.to_string(),
        source,
    };
    let space = Dataspace::create(store, &value.shape_of()).map_err(open_error)?;
    let dtype = Datatype::create(store, value.datatype_of());
    let id = store
        .borrow_mut()
        .create_dataset(parent, name, dtype.id(), space.id());
    let id = id.map_err(open_error)?;
    let mut dataset = Dataset::from_handle(Handle::materialized(Rc::clone(store), id, parent, name));

    if let Err(err) = dataset.write_in_place(store, value) {
        dataset.handle.close();
        if let Err(cause) = store.borrow_mut().delete_link(parent, name) {
            warn!(name, %cause, "could not remove half-created dataset");
        }
        return Err(err);
    }
    debug!(name, %parent, extents = ?space.extents(), ty = %dtype.primitive(), "dataset created");
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::File;
    use crate::props::{ConversionPolicy, FileAccessProps};
    use ndarray::{array, Array1, Array2};
    use tracing_test::traced_test;

    #[test]
    fn create_and_read_vector() {
        let file = File::in_memory().unwrap();
        let ds = Dataset::try_create(&file, "v", &vec![1.0f64, 2.0, 3.0]).unwrap();
        assert!(ds.is_valid());
        assert_eq!(ds.extents().unwrap(), vec![3]);
        assert_eq!(ds.dimension_count().unwrap(), 1);
        assert_eq!(ds.element_type().unwrap(), Primitive::F64);
        assert_eq!(ds.read::<Vec<f64>>().unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn create_on_existing_name_is_invalid() {
        let file = File::in_memory().unwrap();
        Dataset::create(&file, "v", &1i32);
        let dup = Dataset::create(&file, "v", &2i32);
        assert!(!dup.is_valid());
        assert!(!dup.is_pending());
        assert_eq!(dup.name(), "v");
        assert_eq!(dup.parent(), ObjectAddr::NONE);
        assert_eq!(file.dataset("v").unwrap().read::<i32>().unwrap(), 1);
    }

    #[test]
    fn pending_write_materializes() {
        let file = File::in_memory().unwrap();
        let mut ds = file.dataset("x").unwrap();
        assert!(ds.is_pending());
        assert!(matches!(ds.read::<f64>(), Err(Error::InvalidEntry(_))));
        ds.write(&4.5f64).unwrap();
        assert!(ds.is_valid());
        assert_eq!(ds.read::<f64>().unwrap(), 4.5);
    }

    #[test]
    fn same_shape_keeps_identity() {
        let file = File::in_memory().unwrap();
        let mut ds = Dataset::try_create(&file, "m", &array![[1i32, 2], [3, 4]]).unwrap();
        let addr = ds.object_addr();
        ds.write(&array![[5i32, 6], [7, 8]]).unwrap();
        assert_eq!(ds.object_addr(), addr);
        assert_eq!(ds.read::<Array2<i32>>().unwrap(), array![[5, 6], [7, 8]]);
    }

    #[test]
    #[traced_test]
    fn shape_change_recreates() {
        let file = File::in_memory().unwrap();
        let mut ds = Dataset::try_create(&file, "v", &vec![1u8, 2, 3]).unwrap();
        let addr = ds.object_addr();
        ds.write(&vec![1u8, 2]).unwrap();
        assert_ne!(ds.object_addr(), addr);
        assert_eq!(ds.extents().unwrap(), vec![2]);
        assert!(logs_contain("shape changed, recreating dataset"));
    }

    #[test]
    fn rank_mismatch_names_requested_type() {
        let file = File::in_memory().unwrap();
        let ds = Dataset::try_create(&file, "v", &vec![1.0f32]).unwrap();
        match ds.read::<Array2<f32>>() {
            Err(Error::ShapeMismatch { actual, requested }) => {
                assert_eq!(actual, 1);
                assert!(requested.contains("ArrayBase"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn element_conversion_on_read() {
        let file = File::in_memory().unwrap();
        let ds = Dataset::try_create(&file, "v", &Array1::from(vec![300i32, -1])).unwrap();
        assert_eq!(ds.read::<Vec<u8>>().unwrap(), vec![255, 0]);
    }

    #[test]
    fn exact_policy_rejects_conversion() {
        let file = File::in_memory_with(FileAccessProps::new().conversion(ConversionPolicy::Exact)).unwrap();
        let ds = Dataset::try_create(&file, "v", &vec![1i32]).unwrap();
        assert!(matches!(
            ds.read::<Vec<i64>>(),
            Err(Error::Io {
                source: StoreError::Conversion { .. },
                ..
            })
        ));
        assert_eq!(ds.read::<Vec<i32>>().unwrap(), vec![1]);
    }

    #[test]
    fn try_from_object() {
        let file = File::in_memory().unwrap();
        Dataset::create(&file, "d", &1u32);
        let d = Dataset::try_from(file.item("d").unwrap()).unwrap();
        assert_eq!(d.read::<u32>().unwrap(), 1);
        file.create_group("g").unwrap();
        assert!(Dataset::try_from(file.item("g").unwrap()).is_err());
    }

    #[test]
    fn failed_unlink_leaves_entry_pending() {
        let source = File::in_memory().unwrap();
        Dataset::create(&source, "x", &vec![1u16, 2]);
        let bytes = source.to_bytes().unwrap();
        let file = File::from_bytes_with(&bytes, FileAccessProps::new().read_only()).unwrap();

        let mut ds = file.dataset("x").unwrap();
        let err = ds.write(&vec![1u16, 2, 3]).unwrap_err();
        match err {
            Error::Deletion { name, source } => {
                assert_eq!(name, "x");
                assert!(matches!(source, StoreError::ReadOnly));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!ds.is_valid());
        assert!(ds.is_pending());
        assert_eq!(ds.parent(), file.object_addr().unwrap());
        assert_eq!(file.dataset("x").unwrap().read::<Vec<u16>>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn no_ids_leak() {
        let file = File::in_memory().unwrap();
        let baseline = file.open_ids();
        {
            let mut ds = file.dataset("v").unwrap();
            ds.write(&vec![1.0f64]).unwrap();
            ds.write(&vec![1.0f64, 2.0]).unwrap();
            ds.write(&vec![3.0f64, 4.0]).unwrap();
            let _ = ds.read::<Vec<f64>>().unwrap();
            let _ = ds.read::<Array2<f64>>();
            let _ = ds.element_type().unwrap();
        }
        assert_eq!(file.open_ids(), baseline);
    }
}
