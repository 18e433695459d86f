//! Pack index (`.idx`) lookup
//!
//! Version 1 has no magic: a 256-entry big-endian fanout table followed by
//! `N` records of `(u32 offset, 20-byte hash)` sorted by hash. Version 2
//! opens with the magic `0xff744f63` and `u32 version == 2`, then the
//! fanout, `N` sorted hashes, `N` CRC32s, and `N` offsets. Offsets with
//! the high bit set point into a large-offset table which packs under
//! 2 GiB never need.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::OBJECT_ID_RAW_LENGTH;
use crate::errors::GitError;
use anyhow::{anyhow, Result};
use byteorder::{BigEndian, ByteOrder};
use std::cmp::Ordering;
use std::path::Path;

const V2_MAGIC: u32 = 0xff74_4f63;
const FANOUT_ENTRIES: usize = 256;
const FANOUT_SIZE: usize = FANOUT_ENTRIES * 4;
const V1_RECORD_SIZE: usize = 4 + OBJECT_ID_RAW_LENGTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexVersion {
    V1,
    V2,
}

/// A parsed pack index held in memory
#[derive(Debug)]
pub struct PackIndex {
    version: IndexVersion,
    data: Vec<u8>,
    object_count: usize,
}

impl PackIndex {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() < FANOUT_SIZE {
            return Err(anyhow!(GitError::Corrupted).context("pack index too short"));
        }

        let version = if BigEndian::read_u32(&data[0..4]) == V2_MAGIC {
            let declared = BigEndian::read_u32(&data[4..8]);
            if declared != 2 {
                return Err(anyhow!(GitError::Corrupted)
                    .context(format!("unsupported pack index version {declared}")));
            }
            IndexVersion::V2
        } else {
            IndexVersion::V1
        };

        let fanout_base = match version {
            IndexVersion::V1 => 0,
            IndexVersion::V2 => 8,
        };
        if data.len() < fanout_base + FANOUT_SIZE {
            return Err(anyhow!(GitError::Corrupted).context("pack index fanout truncated"));
        }

        let object_count =
            BigEndian::read_u32(&data[fanout_base + 255 * 4..fanout_base + 256 * 4]) as usize;

        Ok(PackIndex {
            version,
            data,
            object_count,
        })
    }

    pub fn object_count(&self) -> usize {
        self.object_count
    }

    fn fanout_base(&self) -> usize {
        match self.version {
            IndexVersion::V1 => 0,
            IndexVersion::V2 => 8,
        }
    }

    /// Bucket boundaries for the hash's first byte
    fn bucket_range(&self, first_byte: u8) -> (usize, usize) {
        let base = self.fanout_base();
        let read = |i: usize| BigEndian::read_u32(&self.data[base + i * 4..base + i * 4 + 4]) as usize;

        let low = if first_byte == 0 {
            0
        } else {
            read(first_byte as usize - 1)
        };
        (low, read(first_byte as usize))
    }

    fn hash_at(&self, position: usize) -> &[u8] {
        match self.version {
            IndexVersion::V1 => {
                let start = FANOUT_SIZE + position * V1_RECORD_SIZE + 4;
                &self.data[start..start + OBJECT_ID_RAW_LENGTH]
            }
            IndexVersion::V2 => {
                let start = 8 + FANOUT_SIZE + position * OBJECT_ID_RAW_LENGTH;
                &self.data[start..start + OBJECT_ID_RAW_LENGTH]
            }
        }
    }

    fn offset_at(&self, position: usize) -> Result<u64> {
        match self.version {
            IndexVersion::V1 => {
                let start = FANOUT_SIZE + position * V1_RECORD_SIZE;
                Ok(BigEndian::read_u32(&self.data[start..start + 4]) as u64)
            }
            IndexVersion::V2 => {
                let offsets_base = 8
                    + FANOUT_SIZE
                    + self.object_count * OBJECT_ID_RAW_LENGTH // hashes
                    + self.object_count * 4; // crc32s
                let start = offsets_base + position * 4;
                let raw = BigEndian::read_u32(&self.data[start..start + 4]);
                if raw & 0x8000_0000 != 0 {
                    return Err(anyhow!(GitError::Corrupted)
                        .context("large-offset pack entries are not supported"));
                }
                Ok(raw as u64)
            }
        }
    }

    /// Binary-search the hash's fanout bucket, returning the pack offset
    pub fn lookup(&self, oid: &ObjectId) -> Result<Option<u64>> {
        let raw = oid.to_raw();
        let (mut low, mut high) = self.bucket_range(raw[0]);
        if high > self.object_count {
            return Err(anyhow!(GitError::Corrupted).context("pack index fanout out of range"));
        }

        while low < high {
            let mid = low + (high - low) / 2;
            match self.hash_at(mid).cmp(raw.as_slice()) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Ok(Some(self.offset_at(mid)?)),
            }
        }

        Ok(None)
    }
}
