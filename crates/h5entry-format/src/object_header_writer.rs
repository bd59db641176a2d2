//! Version 2 object header writer.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::checksum::jenkins_lookup3;
use crate::message_type::MessageType;
use crate::object_header::OHDR_SIGNATURE;

/// Builds one single-chunk v2 object header.
#[derive(Debug, Default)]
pub struct ObjectHeaderWriter {
    messages: Vec<(MessageType, Vec<u8>, u8)>,
}

impl ObjectHeaderWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message with flags 0.
    pub fn add_message(&mut self, msg_type: MessageType, data: Vec<u8>) {
        self.messages.push((msg_type, data, 0));
    }

    pub fn add_message_with_flags(&mut self, msg_type: MessageType, data: Vec<u8>, flags: u8) {
        self.messages.push((msg_type, data, flags));
    }

    fn messages_len(&self) -> usize {
        self.messages.iter().map(|(_, data, _)| 4 + data.len()).sum()
    }

    fn chunk_size_width(&self) -> (u8, usize) {
        match self.messages_len() {
            0..=0xFF => (0x00, 1),
            0x100..=0xFFFF => (0x01, 2),
            _ => (0x02, 4),
        }
    }

    /// Size of [`serialize`](Self::serialize)'s output, without building it.
    pub fn encoded_len(&self) -> usize {
        let (_, width) = self.chunk_size_width();
        6 + width + self.messages_len() + 4
    }

    /// Serialize the complete header: OHDR prefix, messages, checksum.
    pub fn serialize(&self) -> Vec<u8> {
        let total = self.messages_len();
        let (flags, width) = self.chunk_size_width();

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&OHDR_SIGNATURE);
        buf.push(2);
        buf.push(flags);
        buf.extend_from_slice(&(total as u32).to_le_bytes()[..width]);

        for (msg_type, data, msg_flags) in &self.messages {
            buf.push(msg_type.to_u16() as u8);
            buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
            buf.push(*msg_flags);
            buf.extend_from_slice(data);
        }

        let checksum = jenkins_lookup3(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }
}
