//! Packet-line framing
//!
//! A frame is four ASCII hex digits (length of the whole frame including
//! the four digits) followed by the payload. `0000` is the flush packet;
//! lengths 1..=3 are reserved and rejected.

use crate::errors::GitError;

/// The flush packet terminating a group of lines
pub const FLUSH: &str = "0000";

/// The literal `done` line ending fetch negotiation
pub const DONE: &str = "0009done\n";

/// Encode one payload as a packet-line
pub fn encode(payload: &str) -> String {
    format!("{:04x}{}", payload.len() + 4, payload)
}

/// Encode arbitrary bytes as a packet-line
pub fn encode_bytes(payload: &[u8]) -> Vec<u8> {
    let mut frame = format!("{:04x}", payload.len() + 4).into_bytes();
    frame.extend_from_slice(payload);
    frame
}

/// A decoded frame
#[derive(Debug, PartialEq, Eq)]
pub enum Packet<'a> {
    Flush,
    Data(&'a [u8]),
}

/// Sequential reader over a buffer of packet-lines
#[derive(Debug)]
pub struct PktReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> PktReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        PktReader { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes not yet consumed by the framing layer
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Read the next frame; `None` at end of buffer
    pub fn next_packet(&mut self) -> Result<Option<Packet<'a>>, GitError> {
        if self.is_empty() {
            return Ok(None);
        }
        if self.offset + 4 > self.data.len() {
            return Err(GitError::ProtocolFraming(
                "truncated packet length".to_string(),
            ));
        }

        let length_str = std::str::from_utf8(&self.data[self.offset..self.offset + 4])
            .map_err(|_| GitError::ProtocolFraming("non-ASCII packet length".to_string()))?;
        let length = usize::from_str_radix(length_str, 16).map_err(|_| {
            GitError::ProtocolFraming(format!("invalid packet length '{length_str}'"))
        })?;
        self.offset += 4;

        if length == 0 {
            return Ok(Some(Packet::Flush));
        }
        if length < 4 {
            return Err(GitError::ProtocolFraming(format!(
                "reserved packet length {length}"
            )));
        }

        let payload_len = length - 4;
        if self.offset + payload_len > self.data.len() {
            return Err(GitError::ProtocolFraming(
                "packet payload extends past buffer".to_string(),
            ));
        }

        let payload = &self.data[self.offset..self.offset + payload_len];
        self.offset += payload_len;
        Ok(Some(Packet::Data(payload)))
    }
}
