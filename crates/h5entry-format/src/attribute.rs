//! HDF5 Attribute message (message type 0x000C).

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::bytes::ensure_len;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;

/// A small named value stored directly in an object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMessage {
    pub name: String,
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    /// Raw element bytes, `num_elements * type_size` long.
    pub raw_data: Vec<u8>,
}

/// Round up to the next multiple of 8.
fn pad8(x: usize) -> usize {
    (x + 7) & !7
}

impl AttributeMessage {
    /// Parse a version 1, 2 or 3 attribute message.
    pub fn parse(data: &[u8], length_size: u8) -> Result<AttributeMessage, FormatError> {
        ensure_len(data, 0, 8)?;
        let version = data[0];
        let (header_len, padded) = match version {
            1 => (8, true),
            2 => (8, false),
            3 => (9, false),
            v => return Err(FormatError::InvalidAttributeVersion(v)),
        };
        ensure_len(data, 0, header_len)?;
        let name_size = u16::from_le_bytes([data[2], data[3]]) as usize;
        let datatype_size = u16::from_le_bytes([data[4], data[5]]) as usize;
        let dataspace_size = u16::from_le_bytes([data[6], data[7]]) as usize;
        let advance = |n: usize| if padded { pad8(n) } else { n };

        let mut pos = header_len;
        ensure_len(data, pos, name_size)?;
        let name = extract_name(&data[pos..pos + name_size]);
        pos += advance(name_size);

        ensure_len(data, pos, datatype_size)?;
        let (datatype, _) = Datatype::parse(&data[pos..pos + datatype_size])?;
        pos += advance(datatype_size);

        ensure_len(data, pos, dataspace_size)?;
        let dataspace = Dataspace::parse(&data[pos..pos + dataspace_size], length_size)?;
        pos += advance(dataspace_size);

        let len = dataspace.byte_len(datatype.type_size())?;
        let len = usize::try_from(len).map_err(|_| FormatError::SizeOverflow)?;
        ensure_len(data, pos, len)?;
        let raw_data = data[pos..pos + len].to_vec();

        Ok(AttributeMessage {
            name,
            datatype,
            dataspace,
            raw_data,
        })
    }

    /// Serialize as a version 3 message; the name encoding is UTF-8 when
    /// the name is not plain ASCII.
    pub fn serialize(&self, length_size: u8) -> Vec<u8> {
        let mut name = self.name.as_bytes().to_vec();
        name.push(0);
        let dt = self.datatype.serialize();
        let ds = self.dataspace.serialize(length_size);

        let mut buf = Vec::with_capacity(9 + name.len() + dt.len() + ds.len() + self.raw_data.len());
        buf.push(3);
        buf.push(0);
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(dt.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(ds.len() as u16).to_le_bytes());
        buf.push(if self.name.is_ascii() { 0 } else { 1 });
        buf.extend_from_slice(&name);
        buf.extend_from_slice(&dt);
        buf.extend_from_slice(&ds);
        buf.extend_from_slice(&self.raw_data);
        buf
    }
}

fn extract_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
