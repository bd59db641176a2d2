//! Files: the root container and the store behind it.

use std::fs;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::attribute::Attributes;
use crate::error::{Error, Result};
use crate::group::Group;
use crate::handle::Handle;
use crate::object::Entry;
use crate::props::{FileAccessProps, FileCreateProps};
use crate::store::{Hid, ObjectAddr, SharedStore, Store};

/// An open file. Dereferences to its root [`Group`].
///
/// Entries opened from a file share its store, so the store (and, for
/// files on disk, the pending write-back) lives until the last of them is
/// dropped.
#[derive(Debug)]
pub struct File {
    root: Group,
}

impl File {
    /// Create a file at `path`, replacing any existing one.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<File> {
        File::create_with(path, FileCreateProps::default(), FileAccessProps::default())
    }

    pub fn create_with<P: AsRef<Path>>(
        path: P,
        create: FileCreateProps,
        access: FileAccessProps,
    ) -> Result<File> {
        let path = path.as_ref();
        if !create.truncate && path.exists() {
            return Err(Error::File(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )));
        }
        let mut store = Store::new(access);
        store.set_path(Some(path.to_path_buf()));
        store.flush()?;
        debug!(path = %path.display(), "file created");
        File::from_store(store)
    }

    /// Open an existing file for reading and writing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<File> {
        File::open_with(path, FileAccessProps::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, access: FileAccessProps) -> Result<File> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let mut store = Store::load(&bytes, access)?;
        store.set_path(Some(path.to_path_buf()));
        debug!(path = %path.display(), bytes = bytes.len(), "file opened");
        File::from_store(store)
    }

    /// A file that lives only in memory.
    pub fn in_memory() -> Result<File> {
        File::in_memory_with(FileAccessProps::default())
    }

    pub fn in_memory_with(access: FileAccessProps) -> Result<File> {
        File::from_store(Store::new(access))
    }

    /// Open an in-memory copy of a file image.
    pub fn from_bytes(bytes: &[u8]) -> Result<File> {
        File::from_bytes_with(bytes, FileAccessProps::default())
    }

    pub fn from_bytes_with(bytes: &[u8], access: FileAccessProps) -> Result<File> {
        File::from_store(Store::load(bytes, access)?)
    }

    fn from_store(store: Store) -> Result<File> {
        let store = store.into_shared();
        let id = store.borrow_mut().open_root();
        let id = id.map_err(|source| Error::ResourceOpen {
            name: "/".into(),
            source,
        })?;
        Ok(File::with_root(store, id))
    }

    fn with_root(store: SharedStore, id: Hid) -> File {
        File {
            root: Group::from_handle(Handle::materialized(store, id, ObjectAddr::NONE, "/")),
        }
    }

    fn store(&self) -> Result<&SharedStore> {
        self.root
            .handle()
            .store()
            .ok_or_else(|| Error::InvalidEntry("/".into()))
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Encode the whole file as an HDF5 image.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.store()?.borrow().to_bytes()?)
    }

    /// Write pending changes to disk. Does nothing for in-memory and
    /// read-only files.
    pub fn flush(&self) -> Result<()> {
        self.store()?.borrow_mut().flush()
    }

    /// Flush and close the root. Entries still open keep the store alive.
    pub fn close(mut self) -> Result<()> {
        let flushed = self.flush();
        self.root.close();
        flushed
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.store().ok()?.borrow().path().map(Path::to_path_buf)
    }

    pub fn props(&self) -> FileAccessProps {
        self.store()
            .map(|s| s.borrow().props().clone())
            .unwrap_or_default()
    }

    /// Ids currently open against this file's store, the root included.
    pub fn open_ids(&self) -> usize {
        self.store().map_or(0, |s| s.borrow().open_ids())
    }
}

impl Deref for File {
    type Target = Group;

    fn deref(&self) -> &Group {
        &self.root
    }
}

impl Entry for File {
    fn handle(&self) -> &Handle {
        self.root.handle()
    }
}

impl Attributes for File {}
