//! HDF5 Dataspace message (message type 0x0001).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::bytes::{ensure_len, read_uint, write_uint};
use crate::error::FormatError;

/// Highest rank HDF5 allows for a simple dataspace.
pub const MAX_RANK: usize = 32;

/// Type of dataspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataspaceType {
    /// Scalar (single element).
    Scalar,
    /// Simple (N-dimensional array).
    Simple,
    /// Null (no data).
    Null,
}

/// Parsed HDF5 dataspace message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataspace {
    /// The type of this dataspace.
    pub space_type: DataspaceType,
    /// Current dimension sizes; empty for scalar and null spaces.
    pub dimensions: Vec<u64>,
    /// Maximum dimension sizes, if present. `u64::MAX` means unlimited.
    pub max_dimensions: Option<Vec<u64>>,
}

impl Dataspace {
    /// A scalar dataspace for empty `dims`, a fixed-size simple one otherwise.
    pub fn from_extents(dims: &[u64]) -> Result<Dataspace, FormatError> {
        if dims.len() > MAX_RANK {
            return Err(FormatError::RankTooLarge(dims.len()));
        }
        let space_type = if dims.is_empty() {
            DataspaceType::Scalar
        } else {
            DataspaceType::Simple
        };
        Ok(Dataspace {
            space_type,
            dimensions: dims.to_vec(),
            max_dimensions: None,
        })
    }

    /// Number of dimensions (0 for scalar and null).
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Parse a dataspace message; `length_size` comes from the superblock.
    pub fn parse(data: &[u8], length_size: u8) -> Result<Dataspace, FormatError> {
        ensure_len(data, 0, 4)?;

        let version = data[0];
        let rank = data[1] as usize;
        let flags = data[2];
        if rank > MAX_RANK {
            return Err(FormatError::RankTooLarge(rank));
        }

        let (space_type, mut pos) = match version {
            // v1: reserved(1) + reserved(4); rank decides scalar vs simple
            1 => {
                ensure_len(data, 0, 8)?;
                let st = if rank == 0 {
                    DataspaceType::Scalar
                } else {
                    DataspaceType::Simple
                };
                (st, 8usize)
            }
            2 => {
                let st = match data[3] {
                    0 => DataspaceType::Scalar,
                    1 => DataspaceType::Simple,
                    2 => DataspaceType::Null,
                    other => return Err(FormatError::InvalidDataspaceType(other)),
                };
                (st, 4usize)
            }
            v => return Err(FormatError::InvalidDataspaceVersion(v)),
        };

        let ls = length_size as usize;
        let mut dimensions = Vec::with_capacity(rank);
        for _ in 0..rank {
            dimensions.push(read_uint(data, pos, length_size)?);
            pos += ls;
        }

        let max_dimensions = if flags & 0x01 != 0 {
            let mut max_dims = Vec::with_capacity(rank);
            for _ in 0..rank {
                max_dims.push(read_uint(data, pos, length_size)?);
                pos += ls;
            }
            Some(max_dims)
        } else {
            None
        };

        Ok(Dataspace {
            space_type,
            dimensions,
            max_dimensions,
        })
    }

    /// Serialize as a version 2 message.
    pub fn serialize(&self, length_size: u8) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 2 * self.rank() * length_size as usize);
        buf.push(2);
        buf.push(self.rank() as u8);
        buf.push(if self.max_dimensions.is_some() { 0x01 } else { 0x00 });
        buf.push(match self.space_type {
            DataspaceType::Scalar => 0,
            DataspaceType::Simple => 1,
            DataspaceType::Null => 2,
        });
        for &dim in &self.dimensions {
            write_uint(&mut buf, dim, length_size);
        }
        if let Some(ref max_dims) = self.max_dimensions {
            for &md in max_dims {
                write_uint(&mut buf, md, length_size);
            }
        }
        buf
    }

    /// Total number of elements. Scalar = 1, Null = 0. `None` when the
    /// extents multiply past `u64::MAX`.
    pub fn num_elements(&self) -> Option<u64> {
        match self.space_type {
            DataspaceType::Null => Some(0),
            DataspaceType::Scalar => Some(1),
            DataspaceType::Simple => self
                .dimensions
                .iter()
                .try_fold(1u64, |n, &dim| n.checked_mul(dim)),
        }
    }

    /// Bytes needed for every element at `type_size` bytes each.
    pub fn byte_len(&self, type_size: u32) -> Result<u64, FormatError> {
        self.num_elements()
            .and_then(|n| n.checked_mul(u64::from(type_size)))
            .ok_or(FormatError::SizeOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_from_empty_extents() {
        let ds = Dataspace::from_extents(&[]).unwrap();
        assert_eq!(ds.space_type, DataspaceType::Scalar);
        assert_eq!(ds.rank(), 0);
        assert_eq!(ds.num_elements(), Some(1));
    }

    #[test]
    fn simple_serialize_parse() {
        let ds = Dataspace::from_extents(&[2, 3]).unwrap();
        let bytes = ds.serialize(8);
        assert_eq!(bytes.len(), 4 + 16);
        let parsed = Dataspace::parse(&bytes, 8).unwrap();
        assert_eq!(parsed, ds);
        assert_eq!(parsed.num_elements(), Some(6));
    }

    #[test]
    fn zero_extent_has_no_elements() {
        let ds = Dataspace::from_extents(&[0]).unwrap();
        assert_eq!(ds.num_elements(), Some(0));
    }

    #[test]
    fn oversized_extents_do_not_wrap() {
        let ds = Dataspace::from_extents(&[1 << 32, 1 << 32, 2]).unwrap();
        assert_eq!(ds.num_elements(), None);
        assert_eq!(ds.byte_len(1), Err(FormatError::SizeOverflow));

        let ds = Dataspace::from_extents(&[1 << 32, 1 << 31]).unwrap();
        assert_eq!(ds.num_elements(), Some(1 << 63));
        assert_eq!(ds.byte_len(2), Err(FormatError::SizeOverflow));
        assert_eq!(Dataspace::from_extents(&[0, u64::MAX]).unwrap().byte_len(8), Ok(0));
    }

    #[test]
    fn parse_v1_with_max_dims() {
        let mut buf = vec![1, 1, 0x01, 0, 0, 0, 0, 0];
        buf.extend_from_slice(&5u64.to_le_bytes());
        buf.extend_from_slice(&u64::MAX.to_le_bytes());
        let ds = Dataspace::parse(&buf, 8).unwrap();
        assert_eq!(ds.space_type, DataspaceType::Simple);
        assert_eq!(ds.dimensions, vec![5]);
        assert_eq!(ds.max_dimensions, Some(vec![u64::MAX]));
    }

    #[test]
    fn parse_v2_null() {
        let ds = Dataspace::parse(&[2, 0, 0, 2], 8).unwrap();
        assert_eq!(ds.space_type, DataspaceType::Null);
        assert_eq!(ds.num_elements(), Some(0));
    }

    #[test]
    fn rank_limit() {
        let dims = vec![1u64; MAX_RANK + 1];
        assert_eq!(
            Dataspace::from_extents(&dims),
            Err(FormatError::RankTooLarge(MAX_RANK + 1))
        );
        assert!(Dataspace::from_extents(&dims[..MAX_RANK]).is_ok());
    }

    #[test]
    fn invalid_version_and_type() {
        assert_eq!(
            Dataspace::parse(&[3, 0, 0, 0], 8),
            Err(FormatError::InvalidDataspaceVersion(3))
        );
        assert_eq!(
            Dataspace::parse(&[2, 0, 0, 7], 8),
            Err(FormatError::InvalidDataspaceType(7))
        );
    }
}
