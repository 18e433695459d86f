//! Object identifier (SHA-1 hash)
//!
//! Object IDs are 40-character lowercase hexadecimal strings naming every
//! object in the store. Objects live at `objects/<first-2-chars>/<rest>`.

use crate::artifacts::objects::{OBJECT_ID_LENGTH, OBJECT_ID_RAW_LENGTH};
use crate::errors::GitError;
use sha1::{Digest, Sha1};
use std::io;
use std::path::PathBuf;

/// Validated 40-hex object identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object ID from a string
    pub fn try_parse(id: impl Into<String>) -> Result<Self, GitError> {
        let id = id.into();
        if !validate_hash(&id) {
            return Err(GitError::InvalidHash(id));
        }
        Ok(Self(id))
    }

    /// Hash arbitrary bytes into an object ID
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Convert 20 raw bytes to their hex identifier
    pub fn from_raw(raw: &[u8]) -> Result<Self, GitError> {
        if raw.len() != OBJECT_ID_RAW_LENGTH {
            return Err(GitError::InvalidHash(format!("{} raw bytes", raw.len())));
        }
        let mut hex = String::with_capacity(OBJECT_ID_LENGTH);
        for byte in raw {
            hex.push_str(&format!("{byte:02x}"));
        }
        Ok(Self(hex))
    }

    /// Write the ID in binary form (20 bytes)
    pub fn write_raw_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&self.0[i..i + 2], 16)
                .map_err(|_| GitError::InvalidHash(self.0.clone()))?;
            writer.write_all(&[byte])?;
        }
        Ok(())
    }

    /// Read an ID from binary form (20 bytes)
    pub fn read_raw_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut raw = [0u8; OBJECT_ID_RAW_LENGTH];
        reader.read_exact(&mut raw)?;
        Ok(Self::from_raw(&raw)?)
    }

    /// Raw binary form (20 bytes)
    pub fn to_raw(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(OBJECT_ID_RAW_LENGTH);
        self.write_raw_to(&mut raw).expect("valid hex");
        raw
    }

    /// Path under the objects directory: `ab/cdef...`
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// Abbreviated form, clamped to the full length
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(OBJECT_ID_LENGTH)]
    }
}

/// Check that a string is exactly 40 lowercase hex characters
pub fn validate_hash(hash: &str) -> bool {
    hash.len() == OBJECT_ID_LENGTH
        && hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Hex SHA-1 of raw bytes
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
