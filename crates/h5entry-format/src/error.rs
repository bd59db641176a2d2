//! Error types for HDF5 format encoding and decoding.

use core::fmt;

/// Errors that can occur when parsing or writing HDF5 binary structures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The HDF5 magic signature was not found at any valid offset.
    SignatureNotFound,
    /// The superblock version is not supported (only v2 and v3 are).
    UnsupportedVersion(u8),
    /// Unexpected end of data.
    UnexpectedEof {
        /// Number of bytes expected.
        expected: usize,
        /// Number of bytes actually available.
        available: usize,
    },
    /// Invalid offset size (must be 2, 4, or 8).
    InvalidOffsetSize(u8),
    /// Invalid length size (must be 2, 4, or 8).
    InvalidLengthSize(u8),
    /// Invalid object header signature (v1 headers are not supported).
    InvalidObjectHeaderSignature,
    /// Invalid object header version.
    InvalidObjectHeaderVersion(u8),
    /// Unknown message type that is marked as must-understand.
    UnsupportedMessage(u16),
    /// A message stored in the shared message table.
    SharedMessage(u16),
    /// Jenkins lookup3 checksum mismatch.
    ChecksumMismatch {
        /// The checksum stored in the file.
        expected: u32,
        /// The checksum we computed.
        computed: u32,
    },
    /// Invalid dataspace message version.
    InvalidDataspaceVersion(u8),
    /// Invalid dataspace type byte.
    InvalidDataspaceType(u8),
    /// Dataspace rank above the HDF5 limit of 32.
    RankTooLarge(usize),
    /// Datatype class outside 0..=11.
    InvalidDatatypeClass(u8),
    /// Valid datatype class this codec does not handle.
    UnsupportedDatatype(u8),
    /// Invalid data layout message version.
    InvalidLayoutVersion(u8),
    /// Layout class this codec does not handle (chunked, virtual).
    UnsupportedLayout(u8),
    /// Invalid link message version.
    InvalidLinkVersion(u8),
    /// Link type other than hard (0), soft (1), or external (64).
    InvalidLinkType(u8),
    /// Invalid link info message version.
    InvalidLinkInfoVersion(u8),
    /// Group links stored in a fractal heap.
    DenseLinkStorage,
    /// Invalid attribute message version.
    InvalidAttributeVersion(u8),
    /// Object header that is neither a group nor a dataset.
    UnsupportedObject(u64),
    /// Link target missing from an object graph.
    DanglingLink(u64),
    /// Header message body longer than the 16-bit size field allows.
    MessageTooLarge(usize),
    /// Element count or byte size of a dataspace does not fit in 64 bits.
    SizeOverflow,
    /// Raw data length disagrees with dataspace and datatype.
    DataSizeMismatch {
        /// Bytes implied by the dataspace and datatype.
        expected: u64,
        /// Bytes actually present.
        actual: u64,
    },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::SignatureNotFound => {
                write!(f, "HDF5 signature not found at any valid offset")
            }
            FormatError::UnsupportedVersion(v) => {
                write!(f, "unsupported superblock version: {v}")
            }
            FormatError::UnexpectedEof {
                expected,
                available,
            } => {
                write!(f, "unexpected EOF: need {expected} bytes, have {available}")
            }
            FormatError::InvalidOffsetSize(s) => {
                write!(f, "invalid offset size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidLengthSize(s) => {
                write!(f, "invalid length size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidObjectHeaderSignature => {
                write!(f, "invalid object header signature")
            }
            FormatError::InvalidObjectHeaderVersion(v) => {
                write!(f, "invalid object header version: {v}")
            }
            FormatError::UnsupportedMessage(id) => {
                write!(
                    f,
                    "unsupported message type {id:#06x} marked as must-understand"
                )
            }
            FormatError::SharedMessage(id) => {
                write!(f, "shared message of type {id:#06x} is not supported")
            }
            FormatError::ChecksumMismatch { expected, computed } => {
                write!(
                    f,
                    "checksum mismatch: expected {expected:#010x}, computed {computed:#010x}"
                )
            }
            FormatError::InvalidDataspaceVersion(v) => {
                write!(f, "invalid dataspace version: {v}")
            }
            FormatError::InvalidDataspaceType(t) => write!(f, "invalid dataspace type: {t}"),
            FormatError::RankTooLarge(r) => write!(f, "dataspace rank {r} exceeds 32"),
            FormatError::InvalidDatatypeClass(c) => write!(f, "invalid datatype class: {c}"),
            FormatError::UnsupportedDatatype(c) => {
                write!(f, "unsupported datatype class: {c}")
            }
            FormatError::InvalidLayoutVersion(v) => write!(f, "invalid layout version: {v}"),
            FormatError::UnsupportedLayout(c) => write!(f, "unsupported layout class: {c}"),
            FormatError::InvalidLinkVersion(v) => write!(f, "invalid link version: {v}"),
            FormatError::InvalidLinkType(t) => write!(f, "invalid link type: {t}"),
            FormatError::InvalidLinkInfoVersion(v) => {
                write!(f, "invalid link info version: {v}")
            }
            FormatError::DenseLinkStorage => {
                write!(f, "dense (fractal heap) link storage is not supported")
            }
            FormatError::InvalidAttributeVersion(v) => {
                write!(f, "invalid attribute version: {v}")
            }
            FormatError::UnsupportedObject(addr) => {
                write!(f, "object at {addr:#x} is neither a group nor a dataset")
            }
            FormatError::DanglingLink(key) => {
                write!(f, "link points at missing object {key}")
            }
            FormatError::MessageTooLarge(n) => {
                write!(f, "header message of {n} bytes exceeds 65535")
            }
            FormatError::SizeOverflow => write!(f, "dataspace size overflows 64 bits"),
            FormatError::DataSizeMismatch { expected, actual } => {
                write!(f, "raw data is {actual} bytes, layout requires {expected}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}
