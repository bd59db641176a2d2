//! Decode a whole file image into an [`ObjectGraph`].

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeSet, vec, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeSet;

use crate::attribute::AttributeMessage;
use crate::data_layout::DataLayout;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::link_info::LinkInfoMessage;
use crate::link_message::{LinkMessage, LinkTarget};
use crate::message_type::MessageType;
use crate::object_graph::{DatasetRecord, GroupRecord, ObjectGraph, ObjectRecord};
use crate::object_header::ObjectHeader;
use crate::signature::find_signature;
use crate::superblock::Superblock;

/// Walk every object reachable from the root group through hard links.
///
/// Soft and external links are skipped. Objects are keyed by their object
/// header address.
pub fn read_graph(data: &[u8]) -> Result<ObjectGraph, FormatError> {
    let sig = find_signature(data)?;
    let sb = Superblock::parse(data, sig)?;
    let reader = Reader { data, sb: &sb };

    let mut graph = ObjectGraph {
        root: sb.root_group_address,
        objects: Default::default(),
    };
    let mut seen = BTreeSet::new();
    let mut pending = vec![sb.root_group_address];
    while let Some(addr) = pending.pop() {
        if !seen.insert(addr) {
            continue;
        }
        let record = reader.read_object(addr)?;
        if let ObjectRecord::Group(group) = &record {
            pending.extend(group.links.iter().map(|(_, target)| *target));
        }
        graph.objects.insert(addr, record);
    }
    Ok(graph)
}

struct Reader<'a> {
    data: &'a [u8],
    sb: &'a Superblock,
}

impl Reader<'_> {
    fn absolute(&self, addr: u64) -> usize {
        self.sb.base_address.saturating_add(addr) as usize
    }

    fn read_object(&self, addr: u64) -> Result<ObjectRecord, FormatError> {
        let sb = self.sb;
        let header = ObjectHeader::parse(
            self.data,
            self.absolute(addr),
            sb.base_address,
            sb.offset_size,
            sb.length_size,
        )?;

        let attributes = header
            .find_all(MessageType::Attribute)
            .map(|m| AttributeMessage::parse(&m.data, sb.length_size))
            .collect::<Result<Vec<_>, _>>()?;

        let has = |t| header.find(t).is_some();
        if has(MessageType::DataLayout)
            && has(MessageType::Datatype)
            && has(MessageType::Dataspace)
        {
            return self.read_dataset(&header, attributes).map(ObjectRecord::Dataset);
        }
        let group_like =
            has(MessageType::LinkInfo) || has(MessageType::Link) || has(MessageType::GroupInfo);
        if group_like || header.messages.iter().all(|m| m.msg_type == MessageType::Attribute) {
            return self.read_group(&header, attributes).map(ObjectRecord::Group);
        }
        Err(FormatError::UnsupportedObject(addr))
    }

    fn read_group(
        &self,
        header: &ObjectHeader,
        attributes: Vec<AttributeMessage>,
    ) -> Result<GroupRecord, FormatError> {
        if let Some(msg) = header.find(MessageType::LinkInfo) {
            if LinkInfoMessage::parse(&msg.data, self.sb.offset_size)?.is_dense() {
                return Err(FormatError::DenseLinkStorage);
            }
        }
        let mut links = Vec::new();
        for msg in header.find_all(MessageType::Link) {
            let link = LinkMessage::parse(&msg.data, self.sb.offset_size)?;
            if let LinkTarget::Hard(target) = link.target {
                links.push((link.name, target));
            }
        }
        Ok(GroupRecord { links, attributes })
    }

    fn read_dataset(
        &self,
        header: &ObjectHeader,
        attributes: Vec<AttributeMessage>,
    ) -> Result<DatasetRecord, FormatError> {
        let sb = self.sb;
        // presence checked by the caller
        let body = |t| header.find(t).map(|m| m.data.as_slice()).unwrap_or_default();

        let (datatype, _) = Datatype::parse(body(MessageType::Datatype))?;
        let dataspace = Dataspace::parse(body(MessageType::Dataspace), sb.length_size)?;
        let layout = DataLayout::parse(body(MessageType::DataLayout), sb.offset_size, sb.length_size)?;

        // sizes are settled before anything is copied out of the image
        let expected = dataspace.byte_len(datatype.type_size())?;
        let data = match layout {
            DataLayout::Compact { data } => data,
            // unallocated storage holds no bytes
            DataLayout::Contiguous { address: None, .. } => Vec::new(),
            DataLayout::Contiguous {
                address: Some(addr),
                size,
            } => {
                if size != expected {
                    return Err(FormatError::DataSizeMismatch {
                        expected,
                        actual: size,
                    });
                }
                let start = self.absolute(addr);
                let end = usize::try_from(size)
                    .ok()
                    .and_then(|size| start.checked_add(size))
                    .ok_or(FormatError::SizeOverflow)?;
                let bytes = self.data.get(start..end).ok_or(FormatError::UnexpectedEof {
                    expected: end,
                    available: self.data.len(),
                })?;
                bytes.to_vec()
            }
        };
        if data.len() as u64 != expected {
            return Err(FormatError::DataSizeMismatch {
                expected,
                actual: data.len() as u64,
            });
        }
        Ok(DatasetRecord {
            datatype,
            dataspace,
            data,
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_header_writer::ObjectHeaderWriter;
    use crate::superblock::SUPERBLOCK_V3_SIZE;

    fn file_with_root(root: ObjectHeaderWriter) -> Vec<u8> {
        let oh = root.serialize();
        let eof = (SUPERBLOCK_V3_SIZE + oh.len()) as u64;
        let mut data = Superblock::new_v3(SUPERBLOCK_V3_SIZE as u64, eof).serialize();
        data.extend_from_slice(&oh);
        data
    }

    #[test]
    fn empty_header_is_group() {
        let graph = read_graph(&file_with_root(ObjectHeaderWriter::new())).unwrap();
        assert_eq!(graph.root, SUPERBLOCK_V3_SIZE as u64);
        assert_eq!(
            graph.get(graph.root),
            Some(&ObjectRecord::Group(GroupRecord::default()))
        );
    }

    #[test]
    fn soft_links_skipped() {
        let soft = LinkMessage {
            name: "alias".into(),
            target: LinkTarget::Soft("/elsewhere".into()),
            creation_order: None,
        };
        let mut root = ObjectHeaderWriter::new();
        root.add_message(MessageType::Link, soft.serialize(8).unwrap());
        let graph = read_graph(&file_with_root(root)).unwrap();
        match graph.get(graph.root) {
            Some(ObjectRecord::Group(g)) => assert!(g.links.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dense_links_rejected() {
        let info = LinkInfoMessage {
            fractal_heap_address: Some(0x200),
            ..LinkInfoMessage::compact()
        };
        let mut root = ObjectHeaderWriter::new();
        root.add_message(MessageType::LinkInfo, info.serialize(8));
        assert_eq!(
            read_graph(&file_with_root(root)),
            Err(FormatError::DenseLinkStorage)
        );
    }

    #[test]
    fn unknown_object_kind() {
        let dt = Datatype::float(8, crate::datatype::DatatypeByteOrder::LittleEndian);
        let mut root = ObjectHeaderWriter::new();
        root.add_message(MessageType::Datatype, dt.serialize());
        assert_eq!(
            read_graph(&file_with_root(root)),
            Err(FormatError::UnsupportedObject(SUPERBLOCK_V3_SIZE as u64))
        );
    }

    fn dataset_image(extents: &[u64], layout: DataLayout) -> Vec<u8> {
        let dt = Datatype::integer(1, false, crate::datatype::DatatypeByteOrder::LittleEndian);
        let space = Dataspace::from_extents(extents).unwrap();
        let mut root = ObjectHeaderWriter::new();
        root.add_message(MessageType::Datatype, dt.serialize());
        root.add_message(MessageType::Dataspace, space.serialize(8));
        root.add_message(MessageType::DataLayout, layout.serialize(8, 8));
        file_with_root(root)
    }

    #[test]
    fn overflowing_extents_are_an_error() {
        let unallocated = DataLayout::Contiguous {
            address: None,
            size: 0,
        };
        assert_eq!(
            read_graph(&dataset_image(&[1 << 32, 1 << 32, 2], unallocated.clone())),
            Err(FormatError::SizeOverflow)
        );
        assert_eq!(
            read_graph(&dataset_image(&[4], unallocated)),
            Err(FormatError::DataSizeMismatch {
                expected: 4,
                actual: 0
            })
        );
    }

    #[test]
    fn declared_size_checked_before_copy() {
        let short = DataLayout::Contiguous {
            address: Some(0),
            size: 4,
        };
        assert_eq!(
            read_graph(&dataset_image(&[1 << 40], short)),
            Err(FormatError::DataSizeMismatch {
                expected: 1 << 40,
                actual: 4
            })
        );

        // a terabyte the image does not hold
        let huge = DataLayout::Contiguous {
            address: Some(0),
            size: 1 << 40,
        };
        let image = dataset_image(&[1 << 40], huge);
        assert_eq!(
            read_graph(&image),
            Err(FormatError::UnexpectedEof {
                expected: 1 << 40,
                available: image.len(),
            })
        );
    }

    #[test]
    fn not_hdf5() {
        assert_eq!(read_graph(&[0u8; 64]), Err(FormatError::SignatureNotFound));
    }
}
