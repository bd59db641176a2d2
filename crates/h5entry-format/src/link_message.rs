//! HDF5 Link message (message type 0x0006).

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::bytes::{ensure_len, read_uint, write_uint};
use crate::error::FormatError;

/// Where a link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Hard link to an object header address.
    Hard(u64),
    /// Soft link holding a path; never followed by this crate.
    Soft(String),
    /// External link (type 64); kept only so groups holding one still parse.
    External,
}

/// A parsed link message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMessage {
    /// Link name, unique within its group.
    pub name: String,
    /// Link target.
    pub target: LinkTarget,
    /// Creation order, when tracked.
    pub creation_order: Option<u64>,
}

impl LinkMessage {
    /// A hard link with no creation order.
    pub fn hard(name: impl Into<String>, address: u64) -> Self {
        Self {
            name: name.into(),
            target: LinkTarget::Hard(address),
            creation_order: None,
        }
    }

    /// Parse a link message from raw message bytes.
    pub fn parse(data: &[u8], offset_size: u8) -> Result<LinkMessage, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        if version != 1 {
            return Err(FormatError::InvalidLinkVersion(version));
        }

        let flags = data[1];
        let name_len_width: u8 = 1 << (flags & 0x03);
        let has_creation_order = flags & 0x04 != 0;
        let has_link_type = flags & 0x08 != 0;
        let has_charset = flags & 0x10 != 0;

        let mut pos = 2;
        let link_type = if has_link_type {
            ensure_len(data, pos, 1)?;
            pos += 1;
            data[pos - 1]
        } else {
            0
        };

        let creation_order = if has_creation_order {
            let co = read_uint(data, pos, 8)?;
            pos += 8;
            Some(co)
        } else {
            None
        };

        // charset only affects how the name should be displayed
        if has_charset {
            ensure_len(data, pos, 1)?;
            pos += 1;
        }

        let name_len = read_uint(data, pos, name_len_width)? as usize;
        pos += name_len_width as usize;
        ensure_len(data, pos, name_len)?;
        let name = String::from_utf8_lossy(&data[pos..pos + name_len]).into_owned();
        pos += name_len;

        let target = match link_type {
            0 => LinkTarget::Hard(read_uint(data, pos, offset_size)?),
            1 => {
                let len = read_uint(data, pos, 2)? as usize;
                ensure_len(data, pos + 2, len)?;
                LinkTarget::Soft(String::from_utf8_lossy(&data[pos + 2..pos + 2 + len]).into_owned())
            }
            64 => LinkTarget::External,
            other => return Err(FormatError::InvalidLinkType(other)),
        };

        Ok(LinkMessage {
            name,
            target,
            creation_order,
        })
    }

    /// Serialize a hard or soft link. External links cannot be written.
    pub fn serialize(&self, offset_size: u8) -> Result<Vec<u8>, FormatError> {
        let name = self.name.as_bytes();
        let (width_bits, width) = match name.len() {
            0..=0xFF => (0u8, 1u8),
            0x100..=0xFFFF => (1, 2),
            _ => (2, 4),
        };

        let mut flags = width_bits;
        if self.creation_order.is_some() {
            flags |= 0x04;
        }
        let link_type = match self.target {
            LinkTarget::Hard(_) => 0u8,
            LinkTarget::Soft(_) => 1,
            LinkTarget::External => return Err(FormatError::UnsupportedMessage(0x0006)),
        };
        if link_type != 0 {
            flags |= 0x08;
        }
        let utf8 = !self.name.is_ascii();
        if utf8 {
            flags |= 0x10;
        }

        let mut buf = Vec::with_capacity(4 + name.len() + offset_size as usize);
        buf.push(1);
        buf.push(flags);
        if link_type != 0 {
            buf.push(link_type);
        }
        if let Some(co) = self.creation_order {
            buf.extend_from_slice(&co.to_le_bytes());
        }
        if utf8 {
            buf.push(1);
        }
        write_uint(&mut buf, name.len() as u64, width);
        buf.extend_from_slice(name);
        match &self.target {
            LinkTarget::Hard(addr) => write_uint(&mut buf, *addr, offset_size),
            LinkTarget::Soft(path) => {
                buf.extend_from_slice(&(path.len() as u16).to_le_bytes());
                buf.extend_from_slice(path.as_bytes());
            }
            LinkTarget::External => {}
        }
        Ok(buf)
    }
}
