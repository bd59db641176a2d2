//! HDF5 Link Info message (message type 0x0002).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::bytes::{ensure_len, read_address, read_uint, write_uint, UNDEFINED_ADDRESS};
use crate::error::FormatError;

/// Parsed link info message of a new-style group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkInfoMessage {
    /// Maximum creation order value, if tracked.
    pub max_creation_order: Option<u64>,
    /// Fractal heap for dense link storage; `None` means links are compact.
    pub fractal_heap_address: Option<u64>,
    /// B-tree v2 name index for dense storage.
    pub btree_name_index_address: Option<u64>,
}

impl LinkInfoMessage {
    /// Link info for a group that stores its links compactly.
    pub fn compact() -> Self {
        Self::default()
    }

    /// True when links live in a fractal heap rather than in link messages.
    pub fn is_dense(&self) -> bool {
        self.fractal_heap_address.is_some()
    }

    pub fn parse(data: &[u8], offset_size: u8) -> Result<LinkInfoMessage, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        if version != 0 {
            return Err(FormatError::InvalidLinkInfoVersion(version));
        }
        let flags = data[1];
        let mut pos = 2;

        let max_creation_order = if flags & 0x01 != 0 {
            let v = read_uint(data, pos, 8)?;
            pos += 8;
            Some(v)
        } else {
            None
        };

        let fractal_heap_address = read_address(data, pos, offset_size)?;
        pos += offset_size as usize;
        let btree_name_index_address = read_address(data, pos, offset_size)?;

        Ok(LinkInfoMessage {
            max_creation_order,
            fractal_heap_address,
            btree_name_index_address,
        })
    }

    pub fn serialize(&self, offset_size: u8) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + 8 + 2 * offset_size as usize);
        buf.push(0);
        buf.push(if self.max_creation_order.is_some() { 0x01 } else { 0x00 });
        if let Some(co) = self.max_creation_order {
            buf.extend_from_slice(&co.to_le_bytes());
        }
        write_uint(
            &mut buf,
            self.fractal_heap_address.unwrap_or(UNDEFINED_ADDRESS),
            offset_size,
        );
        write_uint(
            &mut buf,
            self.btree_name_index_address.unwrap_or(UNDEFINED_ADDRESS),
            offset_size,
        );
        buf
    }
}
