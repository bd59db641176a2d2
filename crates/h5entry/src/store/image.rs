//! Translation between the store's arena and the format crate's
//! [`ObjectGraph`].

use std::collections::{BTreeMap, HashMap};

use h5entry_format::attribute::AttributeMessage;
use h5entry_format::dataspace::{Dataspace, DataspaceType};
use h5entry_format::datatype::{Datatype, DatatypeByteOrder};
use h5entry_format::error::FormatError;
use h5entry_format::object_graph::{DatasetRecord, GroupRecord, ObjectGraph, ObjectRecord};

use super::convert::swap_elements;
use super::{Body, Node, ObjectAddr, Primitive, Store, Value};

/// Populate `store` from `graph`, returning the root's address.
pub(super) fn load(store: &mut Store, graph: &ObjectGraph) -> Result<ObjectAddr, FormatError> {
    let mut addrs = HashMap::with_capacity(graph.objects.len());
    for &key in graph.objects.keys() {
        let addr = ObjectAddr(store.next_addr);
        store.next_addr += 1;
        addrs.insert(key, addr);
    }
    let lookup = |key: u64| addrs.get(&key).copied().ok_or(FormatError::DanglingLink(key));

    let mut incoming: HashMap<ObjectAddr, u32> = HashMap::new();
    for (key, record) in &graph.objects {
        let body = match record {
            ObjectRecord::Group(group) => {
                let mut links = HashMap::with_capacity(group.links.len());
                for (name, target) in &group.links {
                    let target = lookup(*target)?;
                    *incoming.entry(target).or_default() += 1;
                    links.insert(name.clone(), target);
                }
                Body::Group(links)
            }
            ObjectRecord::Dataset(ds) => {
                Body::Dataset(value_from(&ds.datatype, &ds.dataspace, ds.data.clone())?)
            }
        };
        let mut attributes = BTreeMap::new();
        for attr in record.attributes() {
            let value = value_from(&attr.datatype, &attr.dataspace, attr.raw_data.clone())?;
            attributes.insert(attr.name.clone(), value);
        }
        let mut node = Node::new(body);
        node.attributes = attributes;
        store.nodes.insert(lookup(*key)?, node);
    }

    let root = lookup(graph.root)?;
    *incoming.entry(root).or_default() += 1;
    for (addr, count) in incoming {
        if let Some(node) = store.nodes.get_mut(&addr) {
            node.links = count;
        }
    }
    Ok(root)
}

/// Snapshot the arena as a graph keyed by raw addresses. Links are emitted
/// in name order so the encoded file is deterministic.
pub(super) fn save(store: &Store) -> Result<ObjectGraph, FormatError> {
    let mut objects = BTreeMap::new();
    for (addr, node) in &store.nodes {
        let attributes = node
            .attributes
            .iter()
            .map(|(name, value)| {
                let (datatype, dataspace) = describe(value)?;
                Ok(AttributeMessage {
                    name: name.clone(),
                    datatype,
                    dataspace,
                    raw_data: value.data.clone(),
                })
            })
            .collect::<Result<Vec<_>, FormatError>>()?;

        let record = match &node.body {
            Body::Group(links) => {
                let mut links: Vec<(String, u64)> =
                    links.iter().map(|(name, addr)| (name.clone(), addr.0)).collect();
                links.sort_unstable();
                ObjectRecord::Group(GroupRecord { links, attributes })
            }
            Body::Dataset(value) => {
                let (datatype, dataspace) = describe(value)?;
                ObjectRecord::Dataset(DatasetRecord {
                    datatype,
                    dataspace,
                    data: value.data.clone(),
                    attributes,
                })
            }
        };
        objects.insert(addr.0, record);
    }
    Ok(ObjectGraph {
        root: store.root.0,
        objects,
    })
}

fn describe(value: &Value) -> Result<(Datatype, Dataspace), FormatError> {
    Ok((
        value.primitive.to_datatype(DatatypeByteOrder::native()),
        Dataspace::from_extents(&value.extents)?,
    ))
}

fn value_from(datatype: &Datatype, dataspace: &Dataspace, mut data: Vec<u8>) -> Result<Value, FormatError> {
    let primitive = Primitive::from_datatype(datatype).ok_or(FormatError::UnsupportedDatatype(
        match datatype {
            Datatype::FixedPoint { .. } => 0,
            Datatype::FloatingPoint { .. } => 1,
        },
    ))?;
    if dataspace.space_type == DataspaceType::Null {
        return Err(FormatError::InvalidDataspaceType(2));
    }
    let expected = dataspace.byte_len(primitive.size() as u32)?;
    if data.len() as u64 != expected {
        return Err(FormatError::DataSizeMismatch {
            expected,
            actual: data.len() as u64,
        });
    }
    if datatype.byte_order() != DatatypeByteOrder::native() {
        swap_elements(&mut data, primitive.size());
    }
    Ok(Value {
        primitive,
        extents: dataspace.dimensions.clone(),
        data,
    })
}
