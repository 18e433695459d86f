//! Index entry binary codec
//!
//! Each entry has a 62-byte fixed prefix (timestamps, stat fields, mode,
//! object id, flags) followed by the path and NUL padding to the next
//! 8-byte boundary. The lower 12 bits of `flags` carry the path length,
//! with 0xFFF as the long-path sentinel.

use crate::artifacts::index::{padded_entry_size, ENTRY_FIXED_SIZE, LONG_PATH_FLAG};
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::GitError;
use anyhow::{anyhow, Result};
use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use is_executable::IsExecutable;
use std::fs::Metadata;
use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Stat information captured alongside each staged path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    pub ctime: i64,
    pub ctime_nsec: i64,
    pub mtime: i64,
    pub mtime_nsec: i64,
    pub dev: u64,
    pub ino: u64,
    pub mode: EntryMode,
    pub uid: u32,
    pub gid: u32,
    pub size: i64,
}

impl EntryMetadata {
    /// Capture metadata from a file on disk
    pub fn from_fs(path: &Path, metadata: &Metadata) -> Self {
        let mode = if path.is_executable() {
            EntryMode::Executable
        } else {
            EntryMode::Regular
        };

        EntryMetadata {
            ctime: metadata.ctime(),
            ctime_nsec: metadata.ctime_nsec(),
            mtime: metadata.mtime(),
            mtime_nsec: metadata.mtime_nsec(),
            dev: metadata.dev(),
            ino: metadata.ino(),
            mode,
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size() as i64,
        }
    }
}

/// One staged path
#[derive(Debug, Clone, Default, PartialEq, Eq, new)]
pub struct IndexEntry {
    /// Worktree-relative path, forward-slash separated
    pub path: String,
    /// Blob identity of the staged content
    pub oid: ObjectId,
    pub metadata: EntryMetadata,
    /// In-memory marker; every on-disk entry is staged
    #[new(value = "true")]
    pub staged: bool,
}

impl IndexEntry {
    /// Serialize the entry including its NUL padding
    pub fn serialize(&self) -> Result<Bytes> {
        if self.path.contains('\\') {
            return Err(anyhow!(GitError::IndexInvalid)
                .context(format!("backslash in index path '{}'", self.path)));
        }

        let path_bytes = self.path.as_bytes();
        let flags = (path_bytes.len().min(LONG_PATH_FLAG as usize)) as u16;

        let mut bytes = Vec::with_capacity(padded_entry_size(path_bytes.len()));
        bytes.write_u32::<NetworkEndian>(self.metadata.ctime as u32)?;
        bytes.write_u32::<NetworkEndian>(self.metadata.ctime_nsec as u32)?;
        bytes.write_u32::<NetworkEndian>(self.metadata.mtime as u32)?;
        bytes.write_u32::<NetworkEndian>(self.metadata.mtime_nsec as u32)?;
        bytes.write_u32::<NetworkEndian>(self.metadata.dev as u32)?;
        bytes.write_u32::<NetworkEndian>(self.metadata.ino as u32)?;
        bytes.write_u32::<NetworkEndian>(self.metadata.mode.as_u32())?;
        bytes.write_u32::<NetworkEndian>(self.metadata.uid)?;
        bytes.write_u32::<NetworkEndian>(self.metadata.gid)?;
        bytes.write_u32::<NetworkEndian>(self.metadata.size as u32)?;
        self.oid.write_raw_to(&mut bytes)?;
        bytes.write_u16::<NetworkEndian>(flags)?;
        bytes.write_all(path_bytes)?;

        while bytes.len() < padded_entry_size(path_bytes.len()) {
            bytes.push(0);
        }

        Ok(Bytes::from(bytes))
    }

    /// Parse the 62-byte fixed prefix; the caller supplies the path read
    /// according to the flags field.
    pub fn from_parts(fixed: &[u8], path: String) -> Result<Self> {
        if fixed.len() < ENTRY_FIXED_SIZE {
            return Err(anyhow!(GitError::IndexInvalid).context("index entry too short"));
        }

        let mode_raw = NetworkEndian::read_u32(&fixed[24..28]);
        let mode = EntryMode::try_from(mode_raw)
            .map_err(|_| anyhow!(GitError::IndexInvalid).context("bad entry mode"))?;

        let mut oid_bytes = &fixed[40..60];
        let oid = ObjectId::read_raw_from(&mut oid_bytes)?;

        Ok(IndexEntry {
            path,
            oid,
            metadata: EntryMetadata {
                ctime: NetworkEndian::read_u32(&fixed[0..4]) as i64,
                ctime_nsec: NetworkEndian::read_u32(&fixed[4..8]) as i64,
                mtime: NetworkEndian::read_u32(&fixed[8..12]) as i64,
                mtime_nsec: NetworkEndian::read_u32(&fixed[12..16]) as i64,
                dev: NetworkEndian::read_u32(&fixed[16..20]) as u64,
                ino: NetworkEndian::read_u32(&fixed[20..24]) as u64,
                mode,
                uid: NetworkEndian::read_u32(&fixed[28..32]),
                gid: NetworkEndian::read_u32(&fixed[32..36]),
                size: NetworkEndian::read_u32(&fixed[36..40]) as i64,
            },
            staged: true,
        })
    }

    /// Path length field stored in flags, or the long-path sentinel
    pub fn flags_path_len(fixed: &[u8]) -> u16 {
        NetworkEndian::read_u16(&fixed[60..62]) & LONG_PATH_FLAG
    }

    pub fn stat_matches(&self, other: &EntryMetadata) -> bool {
        self.metadata.mode == other.mode
            && (self.metadata.size == 0 || self.metadata.size == other.size)
    }

    pub fn times_match(&self, other: &EntryMetadata) -> bool {
        self.metadata.mtime == other.mtime && self.metadata.mtime_nsec == other.mtime_nsec
    }
}
