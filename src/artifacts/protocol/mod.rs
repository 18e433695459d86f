//! Smart-protocol building blocks: packet-line framing, side-band
//! demultiplexing, ref advertisement parsing and request construction.

pub mod advertisement;
pub mod pkt_line;
pub mod request;
pub mod sideband;

/// All-zero hash used in push commands for ref creation/deletion
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000";
