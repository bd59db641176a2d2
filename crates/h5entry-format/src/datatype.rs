//! HDF5 Datatype message (message type 0x0003).
//!
//! Only the numeric classes are decoded: fixed-point (class 0) and
//! floating-point (class 1). Every other class parses to
//! [`FormatError::UnsupportedDatatype`].

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::bytes::ensure_len;
use crate::error::FormatError;

/// Byte order of numeric data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatatypeByteOrder {
    LittleEndian,
    BigEndian,
}

impl DatatypeByteOrder {
    /// Byte order of the target this crate is compiled for.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            DatatypeByteOrder::BigEndian
        } else {
            DatatypeByteOrder::LittleEndian
        }
    }
}

/// Parsed numeric HDF5 datatype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datatype {
    /// Class 0: Fixed-point (integer) types.
    FixedPoint {
        size: u32,
        byte_order: DatatypeByteOrder,
        signed: bool,
        bit_offset: u16,
        bit_precision: u16,
    },
    /// Class 1: IEEE floating-point types.
    FloatingPoint {
        size: u32,
        byte_order: DatatypeByteOrder,
        bit_offset: u16,
        bit_precision: u16,
        exponent_location: u8,
        exponent_size: u8,
        mantissa_location: u8,
        mantissa_size: u8,
        exponent_bias: u32,
    },
}

impl Datatype {
    /// A full-precision integer of `size` bytes.
    pub fn integer(size: u32, signed: bool, byte_order: DatatypeByteOrder) -> Self {
        Datatype::FixedPoint {
            size,
            byte_order,
            signed,
            bit_offset: 0,
            bit_precision: (size * 8) as u16,
        }
    }

    /// IEEE 754 binary32 (`size == 4`) or binary64 (any other size).
    pub fn float(size: u32, byte_order: DatatypeByteOrder) -> Self {
        let (size, exponent_location, exponent_size, mantissa_size, exponent_bias) = if size == 4 {
            (4, 23, 8, 23, 127)
        } else {
            (8, 52, 11, 52, 1023)
        };
        Datatype::FloatingPoint {
            size,
            byte_order,
            bit_offset: 0,
            bit_precision: (size * 8) as u16,
            exponent_location,
            exponent_size,
            mantissa_location: 0,
            mantissa_size,
            exponent_bias,
        }
    }

    /// Parse a datatype message. Returns the datatype and the bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(Datatype, usize), FormatError> {
        // class_and_version(1) + bit field(3) + size(4)
        ensure_len(data, 0, 8)?;

        let class_id = data[0] & 0x0F;
        let bf0 = data[1];
        let size = LittleEndian::read_u32(&data[4..8]);
        let pos = 8;

        match class_id {
            0 => {
                ensure_len(data, pos, 4)?;
                let byte_order = if bf0 & 0x01 == 0 {
                    DatatypeByteOrder::LittleEndian
                } else {
                    DatatypeByteOrder::BigEndian
                };
                Ok((
                    Datatype::FixedPoint {
                        size,
                        byte_order,
                        signed: bf0 & 0x08 != 0,
                        bit_offset: LittleEndian::read_u16(&data[pos..pos + 2]),
                        bit_precision: LittleEndian::read_u16(&data[pos + 2..pos + 4]),
                    },
                    pos + 4,
                ))
            }
            1 => {
                ensure_len(data, pos, 12)?;
                // bit 6 set means VAX order, which has no native counterpart
                if bf0 & 0x40 != 0 {
                    return Err(FormatError::UnsupportedDatatype(class_id));
                }
                let byte_order = if bf0 & 0x01 == 0 {
                    DatatypeByteOrder::LittleEndian
                } else {
                    DatatypeByteOrder::BigEndian
                };
                Ok((
                    Datatype::FloatingPoint {
                        size,
                        byte_order,
                        bit_offset: LittleEndian::read_u16(&data[pos..pos + 2]),
                        bit_precision: LittleEndian::read_u16(&data[pos + 2..pos + 4]),
                        exponent_location: data[pos + 4],
                        exponent_size: data[pos + 5],
                        mantissa_location: data[pos + 6],
                        mantissa_size: data[pos + 7],
                        exponent_bias: LittleEndian::read_u32(&data[pos + 8..pos + 12]),
                    },
                    pos + 12,
                ))
            }
            2..=11 => Err(FormatError::UnsupportedDatatype(class_id)),
            _ => Err(FormatError::InvalidDatatypeClass(class_id)),
        }
    }

    /// Serialize as a version 1 datatype message.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Datatype::FixedPoint {
                size,
                byte_order,
                signed,
                bit_offset,
                bit_precision,
            } => {
                let mut bf0 = 0u8;
                if *byte_order == DatatypeByteOrder::BigEndian {
                    bf0 |= 0x01;
                }
                if *signed {
                    bf0 |= 0x08;
                }
                let mut buf = header(0, [bf0, 0, 0], *size);
                buf.extend_from_slice(&bit_offset.to_le_bytes());
                buf.extend_from_slice(&bit_precision.to_le_bytes());
                buf
            }
            Datatype::FloatingPoint {
                size,
                byte_order,
                bit_offset,
                bit_precision,
                exponent_location,
                exponent_size,
                mantissa_location,
                mantissa_size,
                exponent_bias,
            } => {
                // bit 5: mantissa normalization "implied" (IEEE 754)
                let mut bf0 = 0x20u8;
                if *byte_order == DatatypeByteOrder::BigEndian {
                    bf0 |= 0x01;
                }
                // second byte holds the sign bit position
                let sign_location = (size * 8 - 1) as u8;
                let mut buf = header(1, [bf0, sign_location, 0], *size);
                buf.extend_from_slice(&bit_offset.to_le_bytes());
                buf.extend_from_slice(&bit_precision.to_le_bytes());
                buf.push(*exponent_location);
                buf.push(*exponent_size);
                buf.push(*mantissa_location);
                buf.push(*mantissa_size);
                buf.extend_from_slice(&exponent_bias.to_le_bytes());
                buf
            }
        }
    }

    /// Size in bytes of one element.
    pub fn type_size(&self) -> u32 {
        match self {
            Datatype::FixedPoint { size, .. } | Datatype::FloatingPoint { size, .. } => *size,
        }
    }

    /// Byte order of stored elements.
    pub fn byte_order(&self) -> DatatypeByteOrder {
        match self {
            Datatype::FixedPoint { byte_order, .. } | Datatype::FloatingPoint { byte_order, .. } => {
                *byte_order
            }
        }
    }
}

fn header(class: u8, bf: [u8; 3], size: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(20);
    buf.push(class | (1 << 4));
    buf.extend_from_slice(&bf);
    buf.extend_from_slice(&size.to_le_bytes());
    buf
}
