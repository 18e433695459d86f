use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use crate::errors::GitError;
use anyhow::{anyhow, Result};
use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::Write;

/// 12-byte index file header
#[derive(Debug, Clone, new)]
pub struct IndexHeader {
    pub marker: String,
    pub version: u32,
    pub entry_count: u32,
}

impl IndexHeader {
    pub fn empty() -> Self {
        IndexHeader {
            marker: String::from(SIGNATURE),
            version: VERSION,
            entry_count: 0,
        }
    }

    pub fn serialize(&self) -> Result<Bytes> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.write_all(self.marker.as_bytes())?;
        bytes.write_u32::<NetworkEndian>(self.version)?;
        bytes.write_u32::<NetworkEndian>(self.entry_count)?;
        Ok(Bytes::from(bytes))
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(anyhow!(GitError::IndexInvalid).context("index header too short"));
        }

        let marker = String::from_utf8(bytes[0..4].to_vec())
            .map_err(|_| anyhow!(GitError::IndexInvalid))?;
        let version = NetworkEndian::read_u32(&bytes[4..8]);
        let entry_count = NetworkEndian::read_u32(&bytes[8..12]);

        Ok(IndexHeader {
            marker,
            version,
            entry_count,
        })
    }

    /// Reject anything but a version-2 "DIRC" header
    pub fn validate(&self) -> Result<()> {
        if self.marker != SIGNATURE {
            return Err(anyhow!(GitError::IndexInvalid).context("bad index signature"));
        }
        if self.version != VERSION {
            return Err(anyhow!(GitError::IndexInvalid)
                .context(format!("unsupported index version {}", self.version)));
        }
        Ok(())
    }
}
