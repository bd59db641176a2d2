//! Encode an [`ObjectGraph`] as a complete file image.
//!
//! Layout: a v3 superblock, then every reachable object in breadth-first
//! order, each dataset header immediately followed by its raw data.
//! Offsets and lengths are always 8 bytes, so header sizes do not depend
//! on the addresses they contain and a single sizing pass is enough.

#[cfg(not(feature = "std"))]
use alloc::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    vec,
    vec::Vec,
};
#[cfg(feature = "std")]
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::data_layout::DataLayout;
use crate::error::FormatError;
use crate::group_info::GroupInfoMessage;
use crate::link_info::LinkInfoMessage;
use crate::link_message::LinkMessage;
use crate::message_type::MessageType;
use crate::object_graph::{DatasetRecord, GroupRecord, ObjectGraph, ObjectRecord};
use crate::object_header_writer::ObjectHeaderWriter;
use crate::superblock::{Superblock, SUPERBLOCK_V3_SIZE};

const OFFSET_SIZE: u8 = 8;
const LENGTH_SIZE: u8 = 8;

/// Message flag: the message is constant for the object's lifetime.
const MSG_FLAG_CONSTANT: u8 = 0x01;

/// Serialize every object reachable from `graph.root`.
///
/// Unreachable objects are dropped. Fails on links to missing keys and on
/// datasets whose data length disagrees with their shape.
pub fn write_graph(graph: &ObjectGraph) -> Result<Vec<u8>, FormatError> {
    let order = reachable(graph)?;

    // sizing pass: placeholder addresses produce same-length headers
    let placeholder: BTreeMap<u64, u64> = order.iter().map(|&k| (k, 0)).collect();
    let mut addresses = BTreeMap::new();
    let mut data_addresses = BTreeMap::new();
    let mut pos = SUPERBLOCK_V3_SIZE as u64;
    for &key in &order {
        let record = object(graph, key)?;
        addresses.insert(key, pos);
        pos += build_header(record, &placeholder, 0)?.encoded_len() as u64;
        if let ObjectRecord::Dataset(ds) = record {
            if !ds.data.is_empty() {
                data_addresses.insert(key, pos);
                pos += ds.data.len() as u64;
            }
        }
    }

    let root = addresses[&graph.root];
    let mut buf = Superblock::new_v3(root, pos).serialize();
    buf.reserve(pos as usize - buf.len());
    for &key in &order {
        let record = object(graph, key)?;
        let data_addr = data_addresses.get(&key).copied().unwrap_or(0);
        buf.extend_from_slice(&build_header(record, &addresses, data_addr)?.serialize());
        if let ObjectRecord::Dataset(ds) = record {
            buf.extend_from_slice(&ds.data);
        }
    }
    debug_assert_eq!(buf.len() as u64, pos);
    Ok(buf)
}

fn object(graph: &ObjectGraph, key: u64) -> Result<&ObjectRecord, FormatError> {
    graph.get(key).ok_or(FormatError::DanglingLink(key))
}

/// Breadth-first key order from the root, each key once.
fn reachable(graph: &ObjectGraph) -> Result<Vec<u64>, FormatError> {
    let mut order = Vec::new();
    let mut queued = BTreeSet::from([graph.root]);
    let mut queue = VecDeque::from(vec![graph.root]);
    while let Some(key) = queue.pop_front() {
        order.push(key);
        match object(graph, key)? {
            ObjectRecord::Group(group) => {
                for (_, target) in &group.links {
                    if queued.insert(*target) {
                        queue.push_back(*target);
                    }
                }
            }
            ObjectRecord::Dataset(ds) => {
                let expected = ds.expected_len()?;
                if ds.data.len() as u64 != expected {
                    return Err(FormatError::DataSizeMismatch {
                        expected,
                        actual: ds.data.len() as u64,
                    });
                }
            }
        }
    }
    Ok(order)
}

fn build_header(
    record: &ObjectRecord,
    addresses: &BTreeMap<u64, u64>,
    data_addr: u64,
) -> Result<ObjectHeaderWriter, FormatError> {
    let mut w = ObjectHeaderWriter::new();
    match record {
        ObjectRecord::Group(group) => build_group(&mut w, group, addresses)?,
        ObjectRecord::Dataset(ds) => build_dataset(&mut w, ds, data_addr)?,
    }
    for attr in record.attributes() {
        add(&mut w, MessageType::Attribute, attr.serialize(LENGTH_SIZE), 0)?;
    }
    Ok(w)
}

fn build_group(
    w: &mut ObjectHeaderWriter,
    group: &GroupRecord,
    addresses: &BTreeMap<u64, u64>,
) -> Result<(), FormatError> {
    add(w, MessageType::LinkInfo, LinkInfoMessage::compact().serialize(OFFSET_SIZE), 0)?;
    add(w, MessageType::GroupInfo, GroupInfoMessage::default().serialize(), 0)?;
    for (name, target) in &group.links {
        let addr = *addresses.get(target).ok_or(FormatError::DanglingLink(*target))?;
        let link = LinkMessage::hard(name.as_str(), addr);
        add(w, MessageType::Link, link.serialize(OFFSET_SIZE)?, 0)?;
    }
    Ok(())
}

fn build_dataset(
    w: &mut ObjectHeaderWriter,
    ds: &DatasetRecord,
    data_addr: u64,
) -> Result<(), FormatError> {
    add(w, MessageType::Datatype, ds.datatype.serialize(), MSG_FLAG_CONSTANT)?;
    add(w, MessageType::Dataspace, ds.dataspace.serialize(LENGTH_SIZE), 0)?;
    // v3 fill value: late allocation, write fill "if set", no value defined
    add(w, MessageType::FillValue, vec![3, 0x0a], MSG_FLAG_CONSTANT)?;
    let layout = DataLayout::Contiguous {
        address: (!ds.data.is_empty()).then_some(data_addr),
        size: ds.data.len() as u64,
    };
    add(w, MessageType::DataLayout, layout.serialize(OFFSET_SIZE, LENGTH_SIZE), 0)
}

fn add(
    w: &mut ObjectHeaderWriter,
    msg_type: MessageType,
    data: Vec<u8>,
    flags: u8,
) -> Result<(), FormatError> {
    if data.len() > u16::MAX as usize {
        return Err(FormatError::MessageTooLarge(data.len()));
    }
    w.add_message_with_flags(msg_type, data, flags);
    Ok(())
}
