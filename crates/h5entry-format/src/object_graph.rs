//! In-memory model of the objects a file holds.
//!
//! Keys are opaque: [`read_graph`](crate::file_reader::read_graph) uses
//! object header addresses, callers writing a graph may use anything.

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, string::String, vec, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeMap;

use crate::attribute::AttributeMessage;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;

/// A group: named hard links plus attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupRecord {
    /// `(name, target key)` pairs.
    pub links: Vec<(String, u64)>,
    pub attributes: Vec<AttributeMessage>,
}

/// A contiguous dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    /// Raw element bytes in the datatype's byte order.
    pub data: Vec<u8>,
    pub attributes: Vec<AttributeMessage>,
}

impl DatasetRecord {
    /// A dataset whose elements are all zero bytes.
    pub fn zeroed(datatype: Datatype, dataspace: Dataspace) -> Result<Self, FormatError> {
        let len = dataspace.byte_len(datatype.type_size())?;
        let len = usize::try_from(len).map_err(|_| FormatError::SizeOverflow)?;
        Ok(Self {
            datatype,
            dataspace,
            data: vec![0; len],
            attributes: Vec::new(),
        })
    }

    /// Bytes the dataspace and datatype call for.
    pub fn expected_len(&self) -> Result<u64, FormatError> {
        self.dataspace.byte_len(self.datatype.type_size())
    }
}

/// Either kind of object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRecord {
    Group(GroupRecord),
    Dataset(DatasetRecord),
}

impl ObjectRecord {
    pub fn attributes(&self) -> &[AttributeMessage] {
        match self {
            ObjectRecord::Group(g) => &g.attributes,
            ObjectRecord::Dataset(d) => &d.attributes,
        }
    }
}

/// Objects keyed by id, with the key of the root group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectGraph {
    pub root: u64,
    pub objects: BTreeMap<u64, ObjectRecord>,
}

impl ObjectGraph {
    /// A graph holding only an empty root group under key 0.
    pub fn empty() -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(0, ObjectRecord::Group(GroupRecord::default()));
        Self { root: 0, objects }
    }

    pub fn get(&self, key: u64) -> Option<&ObjectRecord> {
        self.objects.get(&key)
    }

    /// Follow `/`-separated link names from the root.
    pub fn resolve(&self, path: &str) -> Option<u64> {
        let mut key = self.root;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            let ObjectRecord::Group(group) = self.objects.get(&key)? else {
                return None;
            };
            key = group.links.iter().find(|(name, _)| name == part)?.1;
        }
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DatatypeByteOrder;

    #[test]
    fn resolve_paths() {
        let mut graph = ObjectGraph::empty();
        let dt = Datatype::integer(4, true, DatatypeByteOrder::LittleEndian);
        let ds = Dataspace::from_extents(&[3]).unwrap();
        let sub = GroupRecord {
            links: vec![("x".into(), 2)],
            attributes: Vec::new(),
        };
        graph.objects.insert(1, ObjectRecord::Group(sub));
        graph.objects.insert(2, ObjectRecord::Dataset(DatasetRecord::zeroed(dt, ds).unwrap()));
        if let Some(ObjectRecord::Group(root)) = graph.objects.get_mut(&0) {
            root.links.push(("g".into(), 1));
        }

        assert_eq!(graph.resolve("/"), Some(0));
        assert_eq!(graph.resolve("/g"), Some(1));
        assert_eq!(graph.resolve("g/x"), Some(2));
        assert_eq!(graph.resolve("/g/x/y"), None);
        assert_eq!(graph.resolve("/missing"), None);
    }

    #[test]
    fn zeroed_dataset_size() {
        let rec = DatasetRecord::zeroed(
            Datatype::float(8, DatatypeByteOrder::LittleEndian),
            Dataspace::from_extents(&[2, 5]).unwrap(),
        )
        .unwrap();
        assert_eq!(rec.data.len(), 80);
        assert_eq!(rec.expected_len(), Ok(80));
    }
}
