//! Side-band demultiplexing
//!
//! Inside a fetch response the server multiplexes frames whose first
//! payload byte is a channel id: 1 carries pack bytes, 2 carries human
//! progress (logged), 3 carries a fatal error (surfaced). Negotiation
//! ACK/NAK lines preceding the pack are skipped.

use crate::artifacts::protocol::pkt_line::{Packet, PktReader};
use crate::errors::GitError;
use anyhow::Result;
use log::{info, warn};

const CHANNEL_PACK: u8 = 1;
const CHANNEL_PROGRESS: u8 = 2;
const CHANNEL_ERROR: u8 = 3;

/// Extract raw pack bytes from a protocol response.
///
/// Handles all the shapes servers produce: bare pack data, packet-line
/// wrapped pack data, and side-band frames, with ACK/NAK negotiation
/// lines interleaved before the stream.
pub fn extract_pack_data(response: &[u8]) -> Result<Vec<u8>> {
    if response.starts_with(b"PACK") {
        return Ok(response.to_vec());
    }

    let mut reader = PktReader::new(response);
    let mut pack = Vec::new();

    loop {
        let packet = match reader.next_packet() {
            Ok(Some(packet)) => packet,
            Ok(None) => break,
            Err(_) if !pack.is_empty() => {
                // trailing bytes after framing stopped parsing are raw
                // pack continuation (servers may append without frames)
                pack.extend_from_slice(reader.remaining());
                break;
            }
            Err(err) => return Err(err.into()),
        };

        let payload = match packet {
            Packet::Flush => continue,
            Packet::Data(payload) => payload,
        };

        if payload.starts_with(b"NAK") || payload.starts_with(b"ACK") {
            continue;
        }

        if payload.starts_with(b"PACK") {
            // unbanded pack: this frame and everything after is pack data
            pack.extend_from_slice(payload);
            while let Ok(Some(next)) = reader.next_packet() {
                if let Packet::Data(data) = next {
                    pack.extend_from_slice(data);
                }
            }
            if !reader.is_empty() {
                pack.extend_from_slice(reader.remaining());
            }
            break;
        }

        match payload.first().copied() {
            Some(CHANNEL_PACK) => pack.extend_from_slice(&payload[1..]),
            Some(CHANNEL_PROGRESS) => {
                info!("remote: {}", String::from_utf8_lossy(&payload[1..]).trim_end());
            }
            Some(CHANNEL_ERROR) => {
                return Err(GitError::ProtocolFraming(format!(
                    "remote error: {}",
                    String::from_utf8_lossy(&payload[1..]).trim_end()
                ))
                .into());
            }
            _ => {
                // unknown frame; servers occasionally send unframed
                // pack bytes here
                warn!("unrecognized frame of {} bytes in pack stream", payload.len());
                pack.extend_from_slice(payload);
            }
        }
    }

    if pack.is_empty() {
        return Err(GitError::ProtocolFraming("no pack data in response".to_string()).into());
    }

    Ok(pack)
}
