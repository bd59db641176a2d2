//! HDF5 superblock, versions 2 and 3.
//!
//! v0/v1 superblocks point at symbol-table groups (B-tree v1 + local heap),
//! which this codec does not read.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::bytes::{ensure_len, read_address, read_uint, validate_sizes, write_uint, UNDEFINED_ADDRESS};
use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::signature::HDF5_SIGNATURE;

/// Encoded size of a v2/v3 superblock with 8-byte offsets.
pub const SUPERBLOCK_V3_SIZE: usize = 48;

/// Parsed v2/v3 superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// Superblock version (2 or 3).
    pub version: u8,
    /// Size of offsets in bytes (2, 4, or 8).
    pub offset_size: u8,
    /// Size of lengths in bytes (2, 4, or 8).
    pub length_size: u8,
    /// File consistency flags.
    pub consistency_flags: u8,
    /// Absolute address every other address is relative to.
    pub base_address: u64,
    /// Superblock extension object header, if any.
    pub extension_address: Option<u64>,
    /// End-of-file address.
    pub eof_address: u64,
    /// Root group object header address.
    pub root_group_address: u64,
}

impl Superblock {
    /// A v3 superblock with 8-byte offsets and lengths.
    pub fn new_v3(root_group_address: u64, eof_address: u64) -> Self {
        Self {
            version: 3,
            offset_size: 8,
            length_size: 8,
            consistency_flags: 0,
            base_address: 0,
            extension_address: None,
            eof_address,
            root_group_address,
        }
    }

    /// Parse a superblock whose signature starts at `signature_offset`.
    pub fn parse(data: &[u8], signature_offset: usize) -> Result<Superblock, FormatError> {
        ensure_len(data, signature_offset, 12)?;
        let d = &data[signature_offset..];
        if d[..8] != HDF5_SIGNATURE {
            return Err(FormatError::SignatureNotFound);
        }

        let version = d[8];
        if !matches!(version, 2 | 3) {
            return Err(FormatError::UnsupportedVersion(version));
        }
        let offset_size = d[9];
        let length_size = d[10];
        validate_sizes(offset_size, length_size)?;
        let consistency_flags = d[11];

        let os = offset_size as usize;
        let checksum_pos = 12 + 4 * os;
        ensure_len(d, checksum_pos, 4)?;

        let stored = LittleEndian::read_u32(&d[checksum_pos..checksum_pos + 4]);
        let computed = jenkins_lookup3(&d[..checksum_pos]);
        if stored != computed {
            return Err(FormatError::ChecksumMismatch {
                expected: stored,
                computed,
            });
        }

        Ok(Superblock {
            version,
            offset_size,
            length_size,
            consistency_flags,
            base_address: read_uint(d, 12, offset_size)?,
            extension_address: read_address(d, 12 + os, offset_size)?,
            eof_address: read_uint(d, 12 + 2 * os, offset_size)?,
            root_group_address: read_uint(d, 12 + 3 * os, offset_size)?,
        })
    }

    /// Encode the superblock, checksum included.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SUPERBLOCK_V3_SIZE);
        buf.extend_from_slice(&HDF5_SIGNATURE);
        buf.push(self.version);
        buf.push(self.offset_size);
        buf.push(self.length_size);
        buf.push(self.consistency_flags);
        write_uint(&mut buf, self.base_address, self.offset_size);
        write_uint(
            &mut buf,
            self.extension_address.unwrap_or(UNDEFINED_ADDRESS),
            self.offset_size,
        );
        write_uint(&mut buf, self.eof_address, self.offset_size);
        write_uint(&mut buf, self.root_group_address, self.offset_size);
        let checksum = jenkins_lookup3(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }
}
