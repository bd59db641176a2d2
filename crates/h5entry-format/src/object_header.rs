//! HDF5 version 2 object header parsing ("OHDR" chunks plus "OCHK"
//! continuations). Version 1 headers belong to old-style groups and are
//! rejected with [`FormatError::InvalidObjectHeaderSignature`].

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::bytes::{ensure_len, read_uint};
use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::message_type::MessageType;

/// OHDR signature for v2 object headers.
pub const OHDR_SIGNATURE: [u8; 4] = *b"OHDR";

/// OCHK signature for v2 continuation chunks.
pub const OCHK_SIGNATURE: [u8; 4] = *b"OCHK";

/// Message flag: the message body lives in the shared message heap.
const MSG_FLAG_SHARED: u8 = 0x02;
/// Message flag: readers that do not know the type must fail.
const MSG_FLAG_MUST_UNDERSTAND: u8 = 0x08;

/// A single parsed header message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMessage {
    pub msg_type: MessageType,
    pub flags: u8,
    pub data: Vec<u8>,
}

/// Parsed v2 object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Object header flags byte.
    pub flags: u8,
    /// All non-NIL, non-continuation messages, in chunk order.
    pub messages: Vec<HeaderMessage>,
}

impl ObjectHeader {
    /// Parse the header at absolute position `offset`. Continuation
    /// addresses are relative to `base_address`.
    pub fn parse(
        data: &[u8],
        offset: usize,
        base_address: u64,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        ensure_len(data, offset, 6)?;
        if data[offset..offset + 4] != OHDR_SIGNATURE {
            return Err(FormatError::InvalidObjectHeaderSignature);
        }
        let version = data[offset + 4];
        if version != 2 {
            return Err(FormatError::InvalidObjectHeaderVersion(version));
        }
        let flags = data[offset + 5];
        let mut pos = offset + 6;

        // access, modification, change and birth times
        if flags & 0x20 != 0 {
            ensure_len(data, pos, 16)?;
            pos += 16;
        }
        // attribute phase change thresholds
        if flags & 0x10 != 0 {
            ensure_len(data, pos, 4)?;
            pos += 4;
        }

        let chunk_size_width = 1u8 << (flags & 0x03);
        let chunk0_size = read_uint(data, pos, chunk_size_width)? as usize;
        pos += chunk_size_width as usize;

        let chunk0_end = pos.saturating_add(chunk0_size);
        verify_checksum(data, offset, chunk0_end)?;

        let has_creation_order = flags & 0x04 != 0;
        let mut messages = Vec::new();
        let mut continuations = Vec::new();
        parse_messages(
            data,
            pos,
            chunk0_end,
            has_creation_order,
            offset_size,
            length_size,
            &mut messages,
            &mut continuations,
        )?;

        let mut visited: Vec<u64> = Vec::new();
        while let Some((cont_addr, cont_len)) = continuations.pop() {
            if visited.contains(&cont_addr) {
                continue;
            }
            visited.push(cont_addr);

            let start = base_address.saturating_add(cont_addr) as usize;
            let len = cont_len as usize;
            if len < 8 {
                return Err(FormatError::UnexpectedEof {
                    expected: 8,
                    available: len,
                });
            }
            ensure_len(data, start, len)?;
            if data[start..start + 4] != OCHK_SIGNATURE {
                return Err(FormatError::InvalidObjectHeaderSignature);
            }
            let checksum_pos = start + len - 4;
            verify_checksum(data, start, checksum_pos)?;
            parse_messages(
                data,
                start + 4,
                checksum_pos,
                has_creation_order,
                offset_size,
                length_size,
                &mut messages,
                &mut continuations,
            )?;
        }

        Ok(ObjectHeader { flags, messages })
    }

    /// First message of the given type.
    pub fn find(&self, msg_type: MessageType) -> Option<&HeaderMessage> {
        self.messages.iter().find(|m| m.msg_type == msg_type)
    }

    /// All messages of the given type.
    pub fn find_all(&self, msg_type: MessageType) -> impl Iterator<Item = &HeaderMessage> {
        self.messages.iter().filter(move |m| m.msg_type == msg_type)
    }
}

/// The four bytes after `end` hold the lookup3 checksum of `data[start..end]`.
fn verify_checksum(data: &[u8], start: usize, end: usize) -> Result<(), FormatError> {
    ensure_len(data, end, 4)?;
    let stored = LittleEndian::read_u32(&data[end..end + 4]);
    let computed = jenkins_lookup3(&data[start..end]);
    if stored != computed {
        return Err(FormatError::ChecksumMismatch {
            expected: stored,
            computed,
        });
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn parse_messages(
    data: &[u8],
    start: usize,
    end: usize,
    has_creation_order: bool,
    offset_size: u8,
    length_size: u8,
    messages: &mut Vec<HeaderMessage>,
    continuations: &mut Vec<(u64, u64)>,
) -> Result<(), FormatError> {
    let msg_header_size = if has_creation_order { 6 } else { 4 };
    let mut pos = start;

    while pos + msg_header_size <= end {
        let raw_type = data[pos] as u16;
        let size = LittleEndian::read_u16(&data[pos + 1..pos + 3]) as usize;
        let flags = data[pos + 3];
        pos += msg_header_size;

        // trailing gap too small for another message
        if pos + size > end {
            break;
        }
        let body = &data[pos..pos + size];
        pos += size;

        let msg_type = MessageType::from_u16(raw_type);
        match msg_type {
            MessageType::Nil => continue,
            MessageType::ObjectHeaderContinuation => {
                let addr = read_uint(body, 0, offset_size)?;
                let len = read_uint(body, offset_size as usize, length_size)?;
                continuations.push((addr, len));
                continue;
            }
            MessageType::Unknown(id) if flags & MSG_FLAG_MUST_UNDERSTAND != 0 => {
                return Err(FormatError::UnsupportedMessage(id));
            }
            _ => {}
        }
        if flags & MSG_FLAG_SHARED != 0 {
            return Err(FormatError::SharedMessage(raw_type));
        }
        messages.push(HeaderMessage {
            msg_type,
            flags,
            data: body.to_vec(),
        });
    }
    Ok(())
}
