//! Read and write native Rust values by name in HDF5 files.
//!
//! Entries are looked up by name in a container. A name that does not exist
//! yet gives a *pending* entry, which the first write creates:
//!
//! ```
//! use h5entry::prelude::*;
//! use ndarray::array;
//!
//! let file = File::in_memory()?;
//! let mut temperature = file.dataset("temperature")?;
//! temperature.write(&vec![21.5f64, 22.0, 22.4, 21.9])?;
//!
//! // a different shape replaces the stored dataset
//! temperature.write(&array![[21.5f64, 22.0], [22.4, 21.9]])?;
//! let back: ndarray::Array2<f64> = temperature.read()?;
//! assert_eq!(back.shape(), &[2, 2]);
//! # Ok::<(), h5entry::Error>(())
//! ```
//!
//! Values are marshalled through [`TypeMarshal`], implemented for the
//! numeric scalars, `Vec` and `ndarray` arrays up to rank four.
//!
//! Every entry owns at most one identifier in the file's [`Store`] and
//! releases it on drop. Entries share the store through an `Rc`, so they
//! are confined to one thread.

pub mod attribute;
pub mod dataset;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod file;
pub mod group;
pub mod handle;
pub mod marshal;
pub mod object;
pub mod props;
pub mod store;

pub use attribute::{Attribute, Attributes};
pub use dataset::Dataset;
pub use dataspace::Dataspace;
pub use datatype::Datatype;
pub use error::{Error, Result, StoreError};
pub use file::File;
pub use group::Group;
pub use handle::{Handle, ObjectKind};
pub use marshal::{Element, TypeMarshal};
pub use object::{Entry, Object};
pub use props::{AccessMode, ConversionPolicy, FileAccessProps, FileCreateProps};
pub use store::{Hid, ObjectAddr, Primitive, Store};

/// The entry types and the traits their accessors live on.
pub mod prelude {
    pub use crate::{Attribute, Attributes, Dataset, Entry, File, Group, Object, TypeMarshal};
}
