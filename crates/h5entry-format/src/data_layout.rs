//! HDF5 Data Layout message (message type 0x0008), compact and contiguous.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::bytes::{ensure_len, read_address, read_uint, write_uint, UNDEFINED_ADDRESS};
use crate::error::FormatError;

/// Parsed data layout message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayout {
    /// Compact: data stored inline in the message.
    Compact {
        /// The inline raw data bytes.
        data: Vec<u8>,
    },
    /// Contiguous: data stored at a single address in the file.
    Contiguous {
        /// File address of the data, or `None` if never allocated.
        address: Option<u64>,
        /// Size of the data in bytes.
        size: u64,
    },
}

impl DataLayout {
    /// Parse a version 3 or 4 layout message.
    pub fn parse(data: &[u8], offset_size: u8, length_size: u8) -> Result<DataLayout, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        if !matches!(version, 3 | 4) {
            return Err(FormatError::InvalidLayoutVersion(version));
        }

        let pos = 2;
        match data[1] {
            0 => {
                ensure_len(data, pos, 2)?;
                let size = u16::from_le_bytes([data[pos], data[pos + 1]]) as usize;
                ensure_len(data, pos + 2, size)?;
                Ok(DataLayout::Compact {
                    data: data[pos + 2..pos + 2 + size].to_vec(),
                })
            }
            1 => {
                let address = read_address(data, pos, offset_size)?;
                let size = read_uint(data, pos + offset_size as usize, length_size)?;
                Ok(DataLayout::Contiguous { address, size })
            }
            class => Err(FormatError::UnsupportedLayout(class)),
        }
    }

    /// Serialize as a version 3 message.
    pub fn serialize(&self, offset_size: u8, length_size: u8) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(3);
        match self {
            DataLayout::Compact { data } => {
                buf.push(0);
                buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
                buf.extend_from_slice(data);
            }
            DataLayout::Contiguous { address, size } => {
                buf.push(1);
                write_uint(&mut buf, address.unwrap_or(UNDEFINED_ADDRESS), offset_size);
                write_uint(&mut buf, *size, length_size);
            }
        }
        buf
    }
}
