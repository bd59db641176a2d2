//! The backing object store.
//!
//! [`Store`] plays the part of the HDF5 C library: callers receive plain
//! integer identifiers ([`Hid`]) that are not reference counted and must
//! be released with [`Store::close`]. Objects live in an arena keyed by
//! [`ObjectAddr`] and stay alive while they are linked from a group or held
//! open by at least one id. Objects with neither are reclaimed.
//!
//! Everything happens in memory. [`Store::load`] and [`Store::to_bytes`]
//! translate to and from the HDF5 file image; [`Store::flush`] persists to
//! the store's path, if it has one.

mod convert;
mod image;

pub use convert::Primitive;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use h5entry_format::dataspace::MAX_RANK;
use h5entry_format::error::FormatError;
use h5entry_format::file_reader::read_graph;
use h5entry_format::file_writer::write_graph;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::props::{AccessMode, FileAccessProps};

/// A store shared by every entry opened from one file.
pub type SharedStore = Rc<RefCell<Store>>;

/// Largest attribute value, in bytes; attributes live in object headers.
pub const MAX_ATTRIBUTE_BYTES: usize = 64 * 1024 - 1024;

/// Resource identifier issued by the store. `Hid(0)` is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hid(pub i64);

impl Hid {
    pub const NONE: Hid = Hid(0);

    pub fn is_none(self) -> bool {
        self == Hid::NONE
    }
}

impl fmt::Display for Hid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable token naming an object in the arena. Holding one keeps nothing
/// alive. `ObjectAddr(0)` is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectAddr(pub u64);

impl ObjectAddr {
    pub const NONE: ObjectAddr = ObjectAddr(0);

    pub fn is_none(self) -> bool {
        self == ObjectAddr::NONE
    }
}

impl fmt::Display for ObjectAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// What an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    File,
    Group,
    Dataset,
    Datatype,
    Dataspace,
    Attribute,
}

#[derive(Debug, Clone)]
enum Target {
    Object(ObjectAddr),
    Space(Vec<u64>),
    Type(Primitive),
    Attribute { owner: ObjectAddr, name: String },
}

#[derive(Debug)]
struct IdEntry {
    kind: IdKind,
    target: Target,
}

/// Typed payload of a dataset or attribute, elements in native byte order.
#[derive(Debug, Clone, PartialEq)]
struct Value {
    primitive: Primitive,
    extents: Vec<u64>,
    data: Vec<u8>,
}

/// Bytes held by `extents` elements of `size` bytes, or `None` past the
/// largest allocation the platform allows.
fn byte_len(extents: &[u64], size: usize) -> Option<usize> {
    let count = extents.iter().try_fold(1usize, |n, &dim| {
        n.checked_mul(usize::try_from(dim).ok()?)
    })?;
    count
        .checked_mul(size)
        .filter(|&len| len <= isize::MAX as usize)
}

impl Value {
    fn zeroed(primitive: Primitive, extents: Vec<u64>) -> Result<Value, StoreError> {
        let len = byte_len(&extents, primitive.size())
            .ok_or_else(|| StoreError::TooLarge(extents.clone()))?;
        Ok(Value {
            primitive,
            extents,
            data: vec![0; len],
        })
    }

    fn num_elements(&self) -> usize {
        self.data.len() / self.primitive.size()
    }

    fn write(
        &mut self,
        mem: Primitive,
        bytes: &[u8],
        props: &FileAccessProps,
    ) -> Result<(), StoreError> {
        let expected = self.num_elements() * mem.size();
        if bytes.len() != expected {
            return Err(StoreError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        self.data = convert::convert(mem, self.primitive, bytes, props.conversion)?;
        Ok(())
    }

    fn read(&self, mem: Primitive, out: &mut [u8], props: &FileAccessProps) -> Result<(), StoreError> {
        let expected = self.num_elements() * mem.size();
        if out.len() != expected {
            return Err(StoreError::SizeMismatch {
                expected,
                actual: out.len(),
            });
        }
        out.copy_from_slice(&convert::convert(
            self.primitive,
            mem,
            &self.data,
            props.conversion,
        )?);
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Body {
    Group(HashMap<String, ObjectAddr>),
    Dataset(Value),
}

#[derive(Debug, Clone)]
struct Node {
    /// Hard links pointing here. The root carries one extra.
    links: u32,
    /// Open ids keeping this object alive, attribute ids included.
    opens: u32,
    body: Body,
    attributes: BTreeMap<String, Value>,
}

impl Node {
    fn new(body: Body) -> Node {
        Node {
            links: 0,
            opens: 0,
            body,
            attributes: BTreeMap::new(),
        }
    }
}

/// An open file's objects plus its identifier table.
#[derive(Debug)]
pub struct Store {
    ids: HashMap<Hid, IdEntry>,
    next_id: i64,
    nodes: HashMap<ObjectAddr, Node>,
    next_addr: u64,
    root: ObjectAddr,
    props: FileAccessProps,
    path: Option<PathBuf>,
    dirty: bool,
}

impl Store {
    /// An empty store holding just a root group.
    pub fn new(props: FileAccessProps) -> Store {
        let mut store = Store {
            ids: HashMap::new(),
            next_id: 1,
            nodes: HashMap::new(),
            next_addr: 1,
            root: ObjectAddr::NONE,
            props,
            path: None,
            dirty: false,
        };
        let mut root = Node::new(Body::Group(HashMap::new()));
        root.links = 1;
        store.root = store.insert_node(root);
        store
    }

    /// Decode an HDF5 file image.
    pub fn load(bytes: &[u8], props: FileAccessProps) -> Result<Store, FormatError> {
        let graph = read_graph(bytes)?;
        let mut store = Store::new(props);
        store.nodes.clear();
        store.root = image::load(&mut store, &graph)?;
        debug!(objects = store.nodes.len(), "loaded file image");
        Ok(store)
    }

    /// Encode every object reachable from the root as an HDF5 file image.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        write_graph(&image::save(self)?)
    }

    pub fn into_shared(self) -> SharedStore {
        Rc::new(RefCell::new(self))
    }

    pub fn props(&self) -> &FileAccessProps {
        &self.props
    }

    pub fn is_read_only(&self) -> bool {
        self.props.mode == AccessMode::ReadOnly
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    /// True when there are changes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the file at the store's path with the current contents.
    ///
    /// The image goes to a temporary file in the same directory first and
    /// is renamed over the target, so readers never see a partial file.
    /// In-memory and read-only stores have nothing to flush.
    pub fn flush(&mut self) -> crate::Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        if self.is_read_only() {
            return Ok(());
        }
        let bytes = self.to_bytes()?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        self.dirty = false;
        debug!(path = %path.display(), bytes = bytes.len(), "flushed");
        Ok(())
    }

    /// Number of ids currently open.
    pub fn open_ids(&self) -> usize {
        self.ids.len()
    }

    /// Number of live objects, reclaimed ones excluded.
    pub fn object_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> ObjectAddr {
        self.root
    }

    // ---- identifiers ----

    fn issue(&mut self, kind: IdKind, target: Target) -> Hid {
        let id = Hid(self.next_id);
        self.next_id += 1;
        self.ids.insert(id, IdEntry { kind, target });
        id
    }

    fn entry(&self, id: Hid) -> Result<&IdEntry, StoreError> {
        self.ids.get(&id).ok_or(StoreError::BadId(id))
    }

    fn expect_kind(&self, id: Hid, expected: &'static str, ok: &[IdKind]) -> Result<&Target, StoreError> {
        let entry = self.entry(id)?;
        if ok.contains(&entry.kind) {
            Ok(&entry.target)
        } else {
            Err(StoreError::WrongKind {
                id,
                actual: entry.kind,
                expected,
            })
        }
    }

    pub fn is_open(&self, id: Hid) -> bool {
        self.ids.contains_key(&id)
    }

    pub fn id_kind(&self, id: Hid) -> Result<IdKind, StoreError> {
        Ok(self.entry(id)?.kind)
    }

    /// Address of the object a file, group or dataset id refers to.
    pub fn object_addr(&self, id: Hid) -> Result<ObjectAddr, StoreError> {
        match self.entry(id)? {
            IdEntry {
                target: Target::Object(addr),
                ..
            } => Ok(*addr),
            entry => Err(StoreError::WrongKind {
                id,
                actual: entry.kind,
                expected: "object",
            }),
        }
    }

    /// A second, independent id for whatever `id` refers to.
    pub fn reopen(&mut self, id: Hid) -> Result<Hid, StoreError> {
        let entry = self.entry(id)?;
        let (kind, target) = (entry.kind, entry.target.clone());
        if let Target::Object(addr) | Target::Attribute { owner: addr, .. } = &target {
            self.node_mut(*addr)?.opens += 1;
        }
        Ok(self.issue(kind, target))
    }

    /// Release an id. Objects left with no links and no open ids are
    /// reclaimed.
    pub fn close(&mut self, id: Hid) -> Result<(), StoreError> {
        let entry = self.ids.remove(&id).ok_or(StoreError::BadId(id))?;
        if let Target::Object(addr) | Target::Attribute { owner: addr, .. } = entry.target {
            if let Some(node) = self.nodes.get_mut(&addr) {
                node.opens = node.opens.saturating_sub(1);
            }
            self.reclaim(addr);
        }
        Ok(())
    }

    // ---- arena ----

    fn insert_node(&mut self, node: Node) -> ObjectAddr {
        let addr = ObjectAddr(self.next_addr);
        self.next_addr += 1;
        self.nodes.insert(addr, node);
        addr
    }

    fn node(&self, addr: ObjectAddr) -> Result<&Node, StoreError> {
        self.nodes
            .get(&addr)
            .ok_or_else(|| StoreError::NotFound(format!("object {addr}")))
    }

    fn node_mut(&mut self, addr: ObjectAddr) -> Result<&mut Node, StoreError> {
        self.nodes
            .get_mut(&addr)
            .ok_or_else(|| StoreError::NotFound(format!("object {addr}")))
    }

    fn group(&self, addr: ObjectAddr) -> Result<&HashMap<String, ObjectAddr>, StoreError> {
        match &self.node(addr)?.body {
            Body::Group(links) => Ok(links),
            Body::Dataset(_) => Err(StoreError::NotFound(format!("group {addr}"))),
        }
    }

    fn group_mut(&mut self, addr: ObjectAddr) -> Result<&mut HashMap<String, ObjectAddr>, StoreError> {
        match &mut self.node_mut(addr)?.body {
            Body::Group(links) => Ok(links),
            Body::Dataset(_) => Err(StoreError::NotFound(format!("group {addr}"))),
        }
    }

    fn reclaim(&mut self, addr: ObjectAddr) {
        let mut pending = vec![addr];
        while let Some(addr) = pending.pop() {
            match self.nodes.get(&addr) {
                Some(node) if node.links == 0 && node.opens == 0 => {}
                _ => continue,
            }
            let Some(node) = self.nodes.remove(&addr) else {
                continue;
            };
            if let Body::Group(links) = node.body {
                for child in links.into_values() {
                    if let Some(c) = self.nodes.get_mut(&child) {
                        c.links = c.links.saturating_sub(1);
                    }
                    pending.push(child);
                }
            }
            debug!(%addr, "object reclaimed");
        }
    }

    fn open_node(&mut self, addr: ObjectAddr, kind: IdKind) -> Result<Hid, StoreError> {
        self.node_mut(addr)?.opens += 1;
        Ok(self.issue(kind, Target::Object(addr)))
    }

    fn writable(&self) -> Result<(), StoreError> {
        if self.is_read_only() {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }

    // ---- namespace ----

    /// Open the root group as a file id.
    pub fn open_root(&mut self) -> Result<Hid, StoreError> {
        self.open_node(self.root, IdKind::File)
    }

    /// Open the object linked as `name` in group `parent`.
    pub fn open_object(&mut self, parent: ObjectAddr, name: &str) -> Result<Hid, StoreError> {
        let addr = *self
            .group(parent)?
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let kind = match self.node(addr)?.body {
            Body::Group(_) => IdKind::Group,
            Body::Dataset(_) => IdKind::Dataset,
        };
        self.open_node(addr, kind)
    }

    pub fn link_exists(&self, parent: ObjectAddr, name: &str) -> Result<bool, StoreError> {
        Ok(self.group(parent)?.contains_key(name))
    }

    /// Link names of a group, ascending.
    pub fn link_names(&self, parent: ObjectAddr) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.group(parent)?.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }

    fn check_free(&self, parent: ObjectAddr, name: &str) -> Result<(), StoreError> {
        if name.is_empty() || name.contains('/') || name == "." {
            return Err(StoreError::Unsupported("link names must be non-empty path components"));
        }
        if self.group(parent)?.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        Ok(())
    }

    fn link(&mut self, parent: ObjectAddr, name: &str, addr: ObjectAddr) -> Result<(), StoreError> {
        self.group_mut(parent)?.insert(name.to_string(), addr);
        self.node_mut(addr)?.links += 1;
        self.dirty = true;
        Ok(())
    }

    pub fn create_group(&mut self, parent: ObjectAddr, name: &str) -> Result<Hid, StoreError> {
        self.writable()?;
        self.check_free(parent, name)?;
        let addr = self.insert_node(Node::new(Body::Group(HashMap::new())));
        self.link(parent, name, addr)?;
        debug!(%parent, name, %addr, "group created");
        self.open_node(addr, IdKind::Group)
    }

    /// Create a zero-filled dataset with the element type of `type_id` and
    /// the extents of `space_id`.
    pub fn create_dataset(
        &mut self,
        parent: ObjectAddr,
        name: &str,
        type_id: Hid,
        space_id: Hid,
    ) -> Result<Hid, StoreError> {
        self.writable()?;
        self.check_free(parent, name)?;
        let primitive = self.type_primitive(type_id)?;
        let extents = self.space_extents(space_id)?;
        let value = Value::zeroed(primitive, extents)?;
        let addr = self.insert_node(Node::new(Body::Dataset(value)));
        self.link(parent, name, addr)?;
        debug!(%parent, name, %addr, %primitive, "dataset created");
        self.open_node(addr, IdKind::Dataset)
    }

    /// Remove the link `name` from `parent`. The object itself survives
    /// while other links or open ids refer to it.
    pub fn delete_link(&mut self, parent: ObjectAddr, name: &str) -> Result<(), StoreError> {
        self.writable()?;
        let addr = self
            .group_mut(parent)?
            .remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        if let Some(node) = self.nodes.get_mut(&addr) {
            node.links = node.links.saturating_sub(1);
        }
        self.dirty = true;
        debug!(%parent, name, %addr, "link deleted");
        self.reclaim(addr);
        Ok(())
    }

    /// Deep-copy the object behind `src` and link the copy as `dst_name`
    /// in `dst_parent`. Objects reachable more than once through the
    /// source are copied once, so sharing and cycles carry over.
    pub fn copy_object(
        &mut self,
        src: Hid,
        dst_parent: ObjectAddr,
        dst_name: &str,
    ) -> Result<(), StoreError> {
        self.writable()?;
        let src_addr = self.object_addr(src)?;
        self.check_free(dst_parent, dst_name)?;

        let mut copies: HashMap<ObjectAddr, ObjectAddr> = HashMap::new();
        let mut copied = Vec::new();
        let mut stack = vec![src_addr];
        while let Some(addr) = stack.pop() {
            if copies.contains_key(&addr) {
                continue;
            }
            let node = self.node(addr)?;
            if let Body::Group(links) = &node.body {
                stack.extend(links.values().copied());
            }
            let copy = Node {
                links: 0,
                opens: 0,
                body: node.body.clone(),
                attributes: node.attributes.clone(),
            };
            let new = self.insert_node(copy);
            copies.insert(addr, new);
            copied.push(new);
        }

        let mut targets = Vec::new();
        for new in copied {
            if let Ok(links) = self.group_mut(new) {
                for target in links.values_mut() {
                    let old = *target;
                    *target = copies.get(&old).copied().unwrap_or(old);
                    targets.push(*target);
                }
            }
        }
        for target in targets {
            self.node_mut(target)?.links += 1;
        }

        let root_copy = copies.get(&src_addr).copied().unwrap_or(ObjectAddr::NONE);
        self.link(dst_parent, dst_name, root_copy)?;
        debug!(src = %src_addr, dst = %root_copy, dst_name, "object copied");
        Ok(())
    }

    // ---- descriptors ----

    pub fn create_space(&mut self, extents: &[u64]) -> Result<Hid, StoreError> {
        if extents.len() > MAX_RANK {
            return Err(StoreError::RankTooLarge(extents.len()));
        }
        if byte_len(extents, 1).is_none() {
            return Err(StoreError::TooLarge(extents.to_vec()));
        }
        Ok(self.issue(IdKind::Dataspace, Target::Space(extents.to_vec())))
    }

    pub fn space_extents(&self, id: Hid) -> Result<Vec<u64>, StoreError> {
        match self.expect_kind(id, "dataspace", &[IdKind::Dataspace])? {
            Target::Space(extents) => Ok(extents.clone()),
            _ => Err(StoreError::BadId(id)),
        }
    }

    pub fn create_type(&mut self, primitive: Primitive) -> Hid {
        self.issue(IdKind::Datatype, Target::Type(primitive))
    }

    pub fn type_primitive(&self, id: Hid) -> Result<Primitive, StoreError> {
        match self.expect_kind(id, "datatype", &[IdKind::Datatype])? {
            Target::Type(primitive) => Ok(*primitive),
            _ => Err(StoreError::BadId(id)),
        }
    }

    // ---- datasets ----

    fn dataset_addr(&self, id: Hid) -> Result<ObjectAddr, StoreError> {
        match self.expect_kind(id, "dataset", &[IdKind::Dataset])? {
            Target::Object(addr) => Ok(*addr),
            _ => Err(StoreError::BadId(id)),
        }
    }

    fn dataset_value(&self, id: Hid) -> Result<&Value, StoreError> {
        let addr = self.dataset_addr(id)?;
        match &self.node(addr)?.body {
            Body::Dataset(value) => Ok(value),
            Body::Group(_) => Err(StoreError::BadId(id)),
        }
    }

    /// A new dataspace id with the dataset's current extents.
    pub fn dataset_space(&mut self, id: Hid) -> Result<Hid, StoreError> {
        let extents = self.dataset_value(id)?.extents.clone();
        Ok(self.issue(IdKind::Dataspace, Target::Space(extents)))
    }

    /// A new datatype id with the dataset's stored element type.
    pub fn dataset_type(&mut self, id: Hid) -> Result<Hid, StoreError> {
        let primitive = self.dataset_value(id)?.primitive;
        Ok(self.create_type(primitive))
    }

    /// Replace the whole dataset with `bytes`, native-endian elements of
    /// `mem_type`.
    pub fn write_dataset(&mut self, id: Hid, mem_type: Hid, bytes: &[u8]) -> Result<(), StoreError> {
        self.writable()?;
        let mem = self.type_primitive(mem_type)?;
        let addr = self.dataset_addr(id)?;
        let props = self.props.clone();
        match &mut self.node_mut(addr)?.body {
            Body::Dataset(value) => value.write(mem, bytes, &props)?,
            Body::Group(_) => return Err(StoreError::BadId(id)),
        }
        self.dirty = true;
        Ok(())
    }

    /// Read the whole dataset into `out` as elements of `mem_type`.
    pub fn read_dataset(&self, id: Hid, mem_type: Hid, out: &mut [u8]) -> Result<(), StoreError> {
        let mem = self.type_primitive(mem_type)?;
        self.dataset_value(id)?.read(mem, out, &self.props)
    }

    // ---- attributes ----

    pub fn attr_exists(&self, owner: ObjectAddr, name: &str) -> Result<bool, StoreError> {
        Ok(self.node(owner)?.attributes.contains_key(name))
    }

    /// Attribute names, ascending.
    pub fn attr_names(&self, owner: ObjectAddr) -> Result<Vec<String>, StoreError> {
        Ok(self.node(owner)?.attributes.keys().cloned().collect())
    }

    pub fn create_attr(
        &mut self,
        owner: ObjectAddr,
        name: &str,
        type_id: Hid,
        space_id: Hid,
    ) -> Result<Hid, StoreError> {
        self.writable()?;
        if name.is_empty() {
            return Err(StoreError::Unsupported("attribute names must be non-empty"));
        }
        let primitive = self.type_primitive(type_id)?;
        let extents = self.space_extents(space_id)?;
        match byte_len(&extents, primitive.size()) {
            Some(len) if len <= MAX_ATTRIBUTE_BYTES => {}
            _ => return Err(StoreError::Unsupported("attribute values are limited to 63 KiB")),
        }
        let value = Value::zeroed(primitive, extents)?;
        let node = self.node_mut(owner)?;
        if node.attributes.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        node.attributes.insert(name.to_string(), value);
        self.dirty = true;
        self.open_attr(owner, name)
    }

    pub fn open_attr(&mut self, owner: ObjectAddr, name: &str) -> Result<Hid, StoreError> {
        let node = self.node_mut(owner)?;
        if !node.attributes.contains_key(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        node.opens += 1;
        Ok(self.issue(
            IdKind::Attribute,
            Target::Attribute {
                owner,
                name: name.to_string(),
            },
        ))
    }

    pub fn delete_attr(&mut self, owner: ObjectAddr, name: &str) -> Result<(), StoreError> {
        self.writable()?;
        self.node_mut(owner)?
            .attributes
            .remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        self.dirty = true;
        Ok(())
    }

    fn attr_target(&self, id: Hid) -> Result<(ObjectAddr, &str), StoreError> {
        match self.expect_kind(id, "attribute", &[IdKind::Attribute])? {
            Target::Attribute { owner, name } => Ok((*owner, name.as_str())),
            _ => Err(StoreError::BadId(id)),
        }
    }

    fn attr_value(&self, id: Hid) -> Result<&Value, StoreError> {
        let (owner, name) = self.attr_target(id)?;
        self.node(owner)?
            .attributes
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn attr_space(&mut self, id: Hid) -> Result<Hid, StoreError> {
        let extents = self.attr_value(id)?.extents.clone();
        Ok(self.issue(IdKind::Dataspace, Target::Space(extents)))
    }

    pub fn attr_type(&mut self, id: Hid) -> Result<Hid, StoreError> {
        let primitive = self.attr_value(id)?.primitive;
        Ok(self.create_type(primitive))
    }

    pub fn write_attr(&mut self, id: Hid, mem_type: Hid, bytes: &[u8]) -> Result<(), StoreError> {
        self.writable()?;
        let mem = self.type_primitive(mem_type)?;
        let (owner, name) = self.attr_target(id)?;
        let name = name.to_string();
        let props = self.props.clone();
        self.node_mut(owner)?
            .attributes
            .get_mut(&name)
            .ok_or(StoreError::NotFound(name))?
            .write(mem, bytes, &props)?;
        self.dirty = true;
        Ok(())
    }

    pub fn read_attr(&self, id: Hid, mem_type: Hid, out: &mut [u8]) -> Result<(), StoreError> {
        let mem = self.type_primitive(mem_type)?;
        self.attr_value(id)?.read(mem, out, &self.props)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if self.dirty && self.props.flush_on_drop && self.path.is_some() {
            if let Err(err) = self.flush() {
                error!(error = %err, path = ?self.path, "flush on drop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::new(FileAccessProps::default())
    }

    fn f64_dataset(s: &mut Store, parent: ObjectAddr, name: &str, values: &[f64]) -> Hid {
        let ty = s.create_type(Primitive::F64);
        let space = s.create_space(&[values.len() as u64]).unwrap();
        let id = s.create_dataset(parent, name, ty, space).unwrap();
        s.write_dataset(id, ty, bytemuck::cast_slice(values)).unwrap();
        s.close(space).unwrap();
        s.close(ty).unwrap();
        id
    }

    fn read_f64(s: &mut Store, id: Hid) -> Vec<f64> {
        let ty = s.create_type(Primitive::F64);
        let space = s.dataset_space(id).unwrap();
        let n = s.space_extents(space).unwrap().iter().product::<u64>() as usize;
        let mut out = vec![0f64; n];
        s.read_dataset(id, ty, bytemuck::cast_slice_mut(&mut out)).unwrap();
        s.close(space).unwrap();
        s.close(ty).unwrap();
        out
    }

    #[test]
    fn unaddressable_extents_rejected() {
        let mut s = store();
        assert_eq!(
            s.create_space(&[u64::MAX, 2]),
            Err(StoreError::TooLarge(vec![u64::MAX, 2]))
        );
        assert!(s.create_space(&[0, u64::MAX]).is_ok());

        // the element count fits, the bytes do not
        let space = s.create_space(&[1 << 61]).unwrap();
        let ty = s.create_type(Primitive::F64);
        let root = s.root();
        assert_eq!(
            s.create_dataset(root, "huge", ty, space),
            Err(StoreError::TooLarge(vec![1 << 61]))
        );
        assert!(!s.link_exists(root, "huge").unwrap());
    }

    #[test]
    fn byte_len_is_checked() {
        assert_eq!(byte_len(&[], 8), Some(8));
        assert_eq!(byte_len(&[3, 4], 2), Some(24));
        assert_eq!(byte_len(&[0, u64::MAX], 8), Some(0));
        assert_eq!(byte_len(&[1 << 32, 1 << 32], 1), None);
        assert_eq!(byte_len(&[1 << 62], 2), None);
    }

    #[test]
    fn ids_start_at_one_and_are_not_reused() {
        let mut s = store();
        let a = s.open_root().unwrap();
        assert_eq!(a, Hid(1));
        s.close(a).unwrap();
        let b = s.open_root().unwrap();
        assert_eq!(b, Hid(2));
        assert_eq!(s.close(a), Err(StoreError::BadId(a)));
    }

    #[test]
    fn create_and_read_dataset() {
        let mut s = store();
        let root = s.root();
        let id = f64_dataset(&mut s, root, "x", &[1.0, 2.0, 3.0]);
        assert_eq!(s.id_kind(id), Ok(IdKind::Dataset));
        assert_eq!(read_f64(&mut s, id), vec![1.0, 2.0, 3.0]);
        assert_eq!(s.link_names(root).unwrap(), vec!["x".to_string()]);
        s.close(id).unwrap();
        assert_eq!(s.open_ids(), 0);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut s = store();
        let root = s.root();
        let g = s.create_group(root, "g").unwrap();
        assert_eq!(
            s.create_group(root, "g"),
            Err(StoreError::AlreadyExists("g".into()))
        );
        assert!(matches!(
            s.create_group(root, "a/b"),
            Err(StoreError::Unsupported(_))
        ));
        s.close(g).unwrap();
    }

    #[test]
    fn unlinked_object_lives_while_open() {
        let mut s = store();
        let root = s.root();
        let id = f64_dataset(&mut s, root, "x", &[4.0]);
        let before = s.object_count();
        s.delete_link(root, "x").unwrap();
        assert!(!s.link_exists(root, "x").unwrap());
        assert_eq!(read_f64(&mut s, id), vec![4.0]);
        assert_eq!(s.object_count(), before);
        s.close(id).unwrap();
        assert_eq!(s.object_count(), before - 1);
    }

    #[test]
    fn deleting_group_reclaims_subtree() {
        let mut s = store();
        let root = s.root();
        let g = s.create_group(root, "g").unwrap();
        let g_addr = s.object_addr(g).unwrap();
        let d = f64_dataset(&mut s, g_addr, "d", &[1.0]);
        s.close(d).unwrap();
        s.close(g).unwrap();
        assert_eq!(s.object_count(), 3);
        s.delete_link(root, "g").unwrap();
        assert_eq!(s.object_count(), 1);
    }

    #[test]
    fn copy_preserves_sharing() {
        let mut s = store();
        let root = s.root();
        let g = s.create_group(root, "g").unwrap();
        let g_addr = s.object_addr(g).unwrap();
        let d = f64_dataset(&mut s, g_addr, "a", &[1.0, 2.0]);
        s.copy_object(d, g_addr, "b").unwrap();
        // a second hard link to the same dataset
        let d_addr = s.object_addr(d).unwrap();
        s.group_mut(g_addr).unwrap().insert("alias".into(), d_addr);
        s.node_mut(d_addr).unwrap().links += 1;

        s.copy_object(g, root, "h").unwrap();
        let h = s.open_object(root, "h").unwrap();
        let h_addr = s.object_addr(h).unwrap();
        let a = s.open_object(h_addr, "a").unwrap();
        let alias = s.open_object(h_addr, "alias").unwrap();
        let b = s.open_object(h_addr, "b").unwrap();
        assert_eq!(s.object_addr(a), s.object_addr(alias));
        assert_ne!(s.object_addr(a), s.object_addr(b));
        assert_ne!(s.object_addr(a), s.object_addr(d));
        assert_eq!(read_f64(&mut s, b), vec![1.0, 2.0]);
    }

    #[test]
    fn copy_onto_existing_name_fails() {
        let mut s = store();
        let root = s.root();
        let d = f64_dataset(&mut s, root, "a", &[1.0]);
        assert_eq!(
            s.copy_object(d, root, "a"),
            Err(StoreError::AlreadyExists("a".into()))
        );
    }

    #[test]
    fn rank_limit() {
        let mut s = store();
        assert_eq!(
            s.create_space(&[1; 33]),
            Err(StoreError::RankTooLarge(33))
        );
        assert!(s.create_space(&[1; 32]).is_ok());
    }

    #[test]
    fn wrong_kind_reported() {
        let mut s = store();
        let space = s.create_space(&[2]).unwrap();
        assert!(matches!(
            s.type_primitive(space),
            Err(StoreError::WrongKind {
                actual: IdKind::Dataspace,
                ..
            })
        ));
        assert!(matches!(s.object_addr(space), Err(StoreError::WrongKind { .. })));
    }

    #[test]
    fn size_mismatch_on_write() {
        let mut s = store();
        let root = s.root();
        let id = f64_dataset(&mut s, root, "x", &[1.0, 2.0]);
        let ty = s.create_type(Primitive::F64);
        assert_eq!(
            s.write_dataset(id, ty, &[0u8; 8]),
            Err(StoreError::SizeMismatch {
                expected: 16,
                actual: 8
            })
        );
    }

    #[test]
    fn read_converts_element_type() {
        let mut s = store();
        let root = s.root();
        let id = f64_dataset(&mut s, root, "x", &[1.9, -3.2]);
        let ty = s.create_type(Primitive::I32);
        let mut out = [0i32; 2];
        s.read_dataset(id, ty, bytemuck::cast_slice_mut(&mut out)).unwrap();
        assert_eq!(out, [1, -3]);
    }

    #[test]
    fn exact_policy_refuses_conversion() {
        let props = FileAccessProps::new().conversion(crate::props::ConversionPolicy::Exact);
        let mut s = Store::new(props);
        let root = s.root();
        let id = f64_dataset(&mut s, root, "x", &[1.0]);
        let ty = s.create_type(Primitive::F32);
        let mut out = [0f32; 1];
        assert!(matches!(
            s.read_dataset(id, ty, bytemuck::cast_slice_mut(&mut out)),
            Err(StoreError::Conversion { .. })
        ));
    }

    #[test]
    fn attributes_keep_owner_alive() {
        let mut s = store();
        let root = s.root();
        let d = f64_dataset(&mut s, root, "x", &[1.0]);
        let addr = s.object_addr(d).unwrap();
        let ty = s.create_type(Primitive::I64);
        let space = s.create_space(&[]).unwrap();
        let attr = s.create_attr(addr, "version", ty, space).unwrap();
        s.write_attr(attr, ty, &7i64.to_ne_bytes()).unwrap();
        s.close(d).unwrap();
        s.delete_link(root, "x").unwrap();

        let mut out = [0u8; 8];
        s.read_attr(attr, ty, &mut out).unwrap();
        assert_eq!(i64::from_ne_bytes(out), 7);
        s.close(attr).unwrap();
        assert_eq!(s.object_count(), 1);
        assert_eq!(
            s.open_attr(addr, "version"),
            Err(StoreError::NotFound(format!("object {addr}")))
        );
    }

    #[test]
    fn attribute_names_sorted() {
        let mut s = store();
        let root = s.root();
        let ty = s.create_type(Primitive::U8);
        let space = s.create_space(&[1]).unwrap();
        for name in ["zeta", "alpha", "mid"] {
            let a = s.create_attr(root, name, ty, space).unwrap();
            s.close(a).unwrap();
        }
        assert_eq!(s.attr_names(root).unwrap(), vec!["alpha", "mid", "zeta"]);
        s.delete_attr(root, "mid").unwrap();
        assert!(!s.attr_exists(root, "mid").unwrap());
    }

    #[test]
    fn read_only_rejects_mutation() {
        let mut s = Store::new(FileAccessProps::new().read_only());
        let root = s.root();
        assert_eq!(s.create_group(root, "g"), Err(StoreError::ReadOnly));
        assert_eq!(s.delete_link(root, "g"), Err(StoreError::ReadOnly));
        assert!(!s.is_dirty());
    }

    #[test]
    fn image_roundtrip() {
        let mut s = store();
        let root = s.root();
        let d = f64_dataset(&mut s, root, "x", &[0.5, 1.5]);
        s.close(d).unwrap();
        let bytes = s.to_bytes().unwrap();

        let mut back = Store::load(&bytes, FileAccessProps::default()).unwrap();
        let root = back.root();
        let id = back.open_object(root, "x").unwrap();
        assert_eq!(read_f64(&mut back, id), vec![0.5, 1.5]);
    }
}
