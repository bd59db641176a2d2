//! Error types for the handle layer and the backing store.

use h5entry_format::error::FormatError;

use crate::store::{Hid, IdKind, Primitive};

/// Failures reported by the backing [`Store`](crate::store::Store).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The id was never issued or has already been closed.
    #[error("identifier {0} is not open")]
    BadId(Hid),
    /// The id is open but refers to the wrong kind of resource.
    #[error("identifier {id} is a {actual:?}, expected {expected}")]
    WrongKind {
        id: Hid,
        actual: IdKind,
        expected: &'static str,
    },
    /// No link or attribute of that name, or the object was reclaimed.
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("file is opened read-only")]
    ReadOnly,
    #[error("rank {0} exceeds the maximum of 32")]
    RankTooLarge(usize),
    /// The extents describe more bytes than memory can address.
    #[error("extents {0:?} exceed the addressable size")]
    TooLarge(Vec<u64>),
    /// Caller buffer length disagrees with extents times element size.
    #[error("buffer holds {actual} bytes, selection needs {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    /// Element types differ and the file forbids conversion.
    #[error("no conversion from {from} to {to} under the exact conversion policy")]
    Conversion { from: Primitive, to: Primitive },
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

/// Errors surfaced by entries, containers and files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The entry is neither materialized nor pending-named, or it is
    /// pending where a materialized entry is required.
    #[error("invalid entry `{0}`")]
    InvalidEntry(String),
    /// The store refused to open or create a backing resource.
    #[error("could not open `{name}`")]
    ResourceOpen {
        name: String,
        #[source]
        source: StoreError,
    },
    /// Stored rank disagrees with the rank of the requested native type.
    #[error("stored data has {actual} dimensions, cannot read as {requested}")]
    ShapeMismatch {
        actual: usize,
        requested: &'static str,
    },
    /// A whole-object read or write failed.
    #[error("I/O on `{name}` failed")]
    Io {
        name: String,
        #[source]
        source: StoreError,
    },
    /// The superseded entry could not be unlinked before recreation.
    #[error("could not delete `{name}`")]
    Deletion {
        name: String,
        #[source]
        source: StoreError,
    },
    /// Releasing an id failed. Only ever logged.
    #[error("could not close identifier {0}")]
    Close(Hid),
    /// A native value could not be built from stored extents.
    #[error("marshalling failed: {0}")]
    Marshal(String),
    #[error("HDF5 format error: {0}")]
    Format(#[from] FormatError),
    #[error("file I/O error: {0}")]
    File(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
