//! HDF5 Group Info message (message type 0x000A).

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::bytes::ensure_len;
use crate::error::FormatError;

/// Group info message. Only the default (no phase change, no estimates)
/// form is ever written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupInfoMessage {
    /// Maximum compact links and minimum dense links, when stored.
    pub link_phase_change: Option<(u16, u16)>,
    /// Estimated entry count and name length, when stored.
    pub estimates: Option<(u16, u16)>,
}

impl GroupInfoMessage {
    pub fn parse(data: &[u8]) -> Result<GroupInfoMessage, FormatError> {
        ensure_len(data, 0, 2)?;
        if data[0] != 0 {
            return Err(FormatError::UnsupportedVersion(data[0]));
        }
        let flags = data[1];
        let mut pos = 2;
        let mut pair = |present: bool| -> Result<Option<(u16, u16)>, FormatError> {
            if !present {
                return Ok(None);
            }
            ensure_len(data, pos, 4)?;
            let a = u16::from_le_bytes([data[pos], data[pos + 1]]);
            let b = u16::from_le_bytes([data[pos + 2], data[pos + 3]]);
            pos += 4;
            Ok(Some((a, b)))
        };
        let link_phase_change = pair(flags & 0x01 != 0)?;
        let estimates = pair(flags & 0x02 != 0)?;
        Ok(GroupInfoMessage {
            link_phase_change,
            estimates,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut flags = 0u8;
        let mut body = Vec::new();
        if let Some((a, b)) = self.link_phase_change {
            flags |= 0x01;
            body.extend_from_slice(&a.to_le_bytes());
            body.extend_from_slice(&b.to_le_bytes());
        }
        if let Some((a, b)) = self.estimates {
            flags |= 0x02;
            body.extend_from_slice(&a.to_le_bytes());
            body.extend_from_slice(&b.to_le_bytes());
        }
        let mut buf = vec![0, flags];
        buf.extend_from_slice(&body);
        buf
    }
}
