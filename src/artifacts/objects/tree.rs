//! Tree object
//!
//! A tree is an ordered directory listing. Each entry is encoded as
//! `<octal-mode> <name>\0<20-raw-hash-bytes>`. Entries are kept sorted by
//! raw name; this intentionally mirrors the behavior of the reference
//! client rather than git's trailing-slash directory ordering.

use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::{object_header, Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::GitError;
use anyhow::{Context, Result};
use bytes::Bytes;
use derive_new::new;
use std::io::{BufRead, Cursor, Write};

/// One named child of a tree
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub name: String,
    pub oid: ObjectId,
}

/// Directory snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Build a tree from entries, sorting them by raw name
    pub fn from_entries(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Tree { entries }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn find(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

impl Packable for Tree {
    fn serialize(&self) -> Result<Bytes> {
        let payload = self.payload()?;
        let mut bytes = object_header(ObjectType::Tree, payload.len());
        bytes.extend_from_slice(&payload);
        Ok(Bytes::from(bytes))
    }
}

impl Unpackable for Tree {
    fn deserialize(payload: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(payload);
        let mut entries = Vec::new();

        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break;
            }
            if *mode_bytes.last().unwrap() != b' ' {
                return Err(GitError::InvalidTree).context("unexpected end of mode field");
            }
            mode_bytes.pop();
            let mode_str =
                std::str::from_utf8(&mode_bytes).map_err(|_| GitError::InvalidTree)?;
            let mode = EntryMode::from_octal_str(mode_str)?;

            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || *name_bytes.last().unwrap() != b'\0' {
                return Err(GitError::InvalidTree).context("unexpected end of name field");
            }
            name_bytes.pop();
            let name = std::str::from_utf8(&name_bytes)
                .map_err(|_| GitError::InvalidTree)?
                .to_owned();

            let oid =
                ObjectId::read_raw_from(&mut reader).context("unexpected end of object id")?;

            entries.push(TreeEntry { mode, name, oid });
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn payload(&self) -> Result<Bytes> {
        let mut bytes = Vec::new();
        for entry in &self.entries {
            write!(bytes, "{} {}", entry.mode.as_octal(), entry.name)?;
            bytes.push(0);
            entry.oid.write_raw_to(&mut bytes)?;
        }
        Ok(Bytes::from(bytes))
    }
}
