//! HDF5 file signature (magic bytes) detection.

use crate::error::FormatError;

/// The 8-byte HDF5 magic signature.
pub const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1A, b'\n'];

/// Locate the signature: offset 0, then every power of two from 512 on.
pub fn find_signature(data: &[u8]) -> Result<usize, FormatError> {
    let candidates = core::iter::once(0).chain((9..usize::BITS).map(|shift| 1usize << shift));
    for offset in candidates {
        let Some(window) = data.get(offset..offset + HDF5_SIGNATURE.len()) else {
            break;
        };
        if window == HDF5_SIGNATURE {
            return Ok(offset);
        }
    }
    Err(FormatError::SignatureNotFound)
}
