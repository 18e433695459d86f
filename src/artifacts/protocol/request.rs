//! Fetch and push request construction, and push report parsing

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::protocol::pkt_line::{self, Packet, PktReader, DONE, FLUSH};
use crate::artifacts::protocol::ZERO_HASH;
use crate::errors::GitError;
use anyhow::Result;

/// Capabilities requested on the first want line
const FETCH_CAPABILITIES: &str = "multi_ack_detailed no-done side-band-64k thin-pack ofs-delta";

/// Capabilities requested on the first push command
const PUSH_CAPABILITIES: &str = "report-status side-band-64k";

/// One ref change a push asks the server to make
#[derive(Debug, Clone)]
pub struct RefUpdate {
    pub refname: String,
    pub old: Option<ObjectId>,
    pub new: Option<ObjectId>,
}

impl RefUpdate {
    fn old_hash(&self) -> &str {
        self.old.as_ref().map(|o| o.as_ref()).unwrap_or(ZERO_HASH)
    }

    fn new_hash(&self) -> &str {
        self.new.as_ref().map(|o| o.as_ref()).unwrap_or(ZERO_HASH)
    }
}

/// `want` lines (capabilities on the first), flush, `have` lines, `done`
pub fn build_fetch_request(wants: &[ObjectId], haves: &[ObjectId]) -> Vec<u8> {
    let mut request = Vec::new();

    for (index, want) in wants.iter().enumerate() {
        let line = if index == 0 {
            format!("want {want} {FETCH_CAPABILITIES}\n")
        } else {
            format!("want {want}\n")
        };
        request.extend_from_slice(pkt_line::encode(&line).as_bytes());
    }

    request.extend_from_slice(FLUSH.as_bytes());

    for have in haves {
        request.extend_from_slice(pkt_line::encode(&format!("have {have}\n")).as_bytes());
    }

    request.extend_from_slice(DONE.as_bytes());
    request
}

/// `<old> <new> <refname>` commands (capabilities on the first), flush
pub fn build_push_request(updates: &[RefUpdate]) -> Vec<u8> {
    let mut request = Vec::new();

    for (index, update) in updates.iter().enumerate() {
        let line = if index == 0 {
            format!(
                "{} {} {}\0{PUSH_CAPABILITIES}\n",
                update.old_hash(),
                update.new_hash(),
                update.refname
            )
        } else {
            format!(
                "{} {} {}\n",
                update.old_hash(),
                update.new_hash(),
                update.refname
            )
        };
        request.extend_from_slice(pkt_line::encode_bytes(line.as_bytes()).as_slice());
    }

    request.extend_from_slice(FLUSH.as_bytes());
    request
}

/// Parse a receive-pack status report, surfacing `ng` rejections.
///
/// Reports may arrive wrapped in side-band channel 1 frames; both shapes
/// are accepted. An empty report (server closed without report-status)
/// is treated as success.
pub fn parse_receive_report(response: &[u8]) -> Result<()> {
    let mut lines: Vec<String> = Vec::new();
    let mut reader = PktReader::new(response);

    while let Ok(Some(packet)) = reader.next_packet() {
        let payload = match packet {
            Packet::Flush => continue,
            Packet::Data(payload) => payload,
        };

        // side-band wrapped: unwrap channel 1, ignore progress
        let unwrapped: &[u8] = match payload.first() {
            Some(1) => &payload[1..],
            Some(2) => continue,
            Some(3) => {
                return Err(GitError::Rejected(
                    String::from_utf8_lossy(&payload[1..]).trim().to_string(),
                )
                .into())
            }
            _ => payload,
        };

        // unwrapped bytes may themselves contain packet-lines
        let mut inner = PktReader::new(unwrapped);
        match inner.next_packet() {
            Ok(Some(Packet::Data(first))) => {
                lines.push(String::from_utf8_lossy(first).trim_end().to_string());
                while let Ok(Some(Packet::Data(data))) = inner.next_packet() {
                    lines.push(String::from_utf8_lossy(data).trim_end().to_string());
                }
            }
            _ => lines.push(String::from_utf8_lossy(unwrapped).trim_end().to_string()),
        }
    }

    for line in &lines {
        if let Some(rest) = line.strip_prefix("ng ") {
            return Err(GitError::Rejected(rest.to_string()).into());
        }
        if line.starts_with("unpack ") && line != "unpack ok" {
            return Err(GitError::Rejected(line.clone()).into());
        }
    }

    Ok(())
}
