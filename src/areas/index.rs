//! Staging index
//!
//! Tracks the set of paths that will form the next commit's tree, with
//! enough stat information to detect worktree changes cheaply. On-disk
//! format is the version-2 `DIRC` layout described in `artifacts::index`.

use crate::areas::database::Database;
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::{
    padded_entry_size, ENTRY_FIXED_SIZE, HEADER_SIZE, LONG_PATH_FLAG, SIGNATURE, VERSION,
};
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::{validate_hash, ObjectId};
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::errors::GitError;
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// The staging area
#[derive(Debug)]
pub struct Index {
    path: Box<Path>,
    entries: BTreeMap<String, IndexEntry>,
    changed: bool,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the index from disk. A missing file is an empty index.
    pub fn load(&mut self) -> Result<()> {
        self.entries.clear();
        self.changed = false;

        if !self.path.exists() {
            return Ok(());
        }

        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .open(&self.path)
            .with_context(|| format!("unable to open {}", self.path.display()))?;
        if file.metadata()?.len() == 0 {
            return Ok(());
        }

        let mut lock = file_guard::lock(&mut file, file_guard::Lock::Shared, 0, 1)?;
        let mut reader = Checksum::new(std::ops::DerefMut::deref_mut(&mut lock));
        let header_bytes = reader.read(HEADER_SIZE)?;
        let header = IndexHeader::deserialize(&header_bytes)?;
        header.validate()?;

        for _ in 0..header.entry_count {
            let entry = Self::read_entry(&mut reader)?;
            self.entries.insert(entry.path.clone(), entry);
        }

        reader.verify().context("index file failed verification")?;
        Ok(())
    }

    fn read_entry<R: std::io::Read>(reader: &mut Checksum<R>) -> Result<IndexEntry> {
        let fixed = reader.read(ENTRY_FIXED_SIZE)?;
        let flags_len = IndexEntry::flags_path_len(&fixed);

        let (path_bytes, consumed) = if flags_len == LONG_PATH_FLAG {
            // long path: NUL terminated
            let mut bytes = Vec::new();
            loop {
                let byte = reader.read(1)?[0];
                if byte == 0 {
                    break;
                }
                bytes.push(byte);
            }
            let consumed = ENTRY_FIXED_SIZE + bytes.len() + 1;
            (bytes, consumed)
        } else {
            let bytes = reader.read(flags_len as usize)?.to_vec();
            (bytes, ENTRY_FIXED_SIZE + flags_len as usize)
        };

        let padded = padded_entry_size(path_bytes.len());
        if padded > consumed {
            reader.read(padded - consumed)?;
        }

        let path = String::from_utf8(path_bytes)
            .map_err(|_| anyhow!(GitError::IndexInvalid).context("non-UTF-8 index path"))?;
        IndexEntry::from_parts(&fixed, path)
    }

    /// Write the index atomically: serialize into a temp file next to the
    /// index, checksum it, then rename over the old file.
    pub fn save(&mut self) -> Result<()> {
        let temp_path = self.path.with_extension("lock");
        {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("unable to open {}", temp_path.display()))?;
            let mut writer = Checksum::new(&mut file);

            let header = IndexHeader::new(
                SIGNATURE.to_string(),
                VERSION,
                self.entries.len() as u32,
            );
            writer.write(&header.serialize()?)?;

            for entry in self.entries.values() {
                writer.write(&entry.serialize()?)?;
            }

            writer.write_checksum()?;
        }

        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("unable to replace {}", self.path.display()))?;
        self.changed = false;
        Ok(())
    }

    /// Upsert an entry. Paths are unique keys; an existing entry for the
    /// same path is replaced.
    pub fn add(&mut self, entry: IndexEntry) -> Result<()> {
        if !validate_hash(entry.oid.as_ref()) {
            return Err(GitError::InvalidHash(entry.oid.to_string()).into());
        }
        if entry.path.contains('\\') {
            return Err(anyhow!(GitError::IndexInvalid)
                .context(format!("backslash in path '{}'", entry.path)));
        }
        self.entries.insert(entry.path.clone(), entry);
        self.changed = true;
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Result<()> {
        if self.entries.remove(path).is_none() {
            return Err(GitError::FileNotStaged(path.to_string()).into());
        }
        self.changed = true;
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn is_staged(&self, path: &str) -> bool {
        self.entries.get(path).map(|e| e.staged).unwrap_or(false)
    }

    pub fn has_changes(&self) -> bool {
        self.entries.values().any(|e| e.staged)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.changed = true;
    }

    /// Build the tree hierarchy for the staged paths and store every
    /// subtree, returning the root tree's identity.
    pub fn write_tree(&self, database: &Database) -> Result<ObjectId> {
        if !self.has_changes() {
            return Err(GitError::NothingToCommit.into());
        }

        let mut root = DirNode::default();
        for entry in self.entries.values().filter(|e| e.staged) {
            root.insert(&entry.path, entry.metadata.mode, entry.oid.clone())?;
        }

        root.store(database)
    }
}

/// In-memory directory graph used while building trees
#[derive(Debug, Default)]
struct DirNode {
    children: BTreeMap<String, DirNode>,
    files: BTreeMap<String, (EntryMode, ObjectId)>,
}

impl DirNode {
    fn insert(&mut self, path: &str, mode: EntryMode, oid: ObjectId) -> Result<()> {
        match path.split_once('/') {
            None => {
                self.files.insert(path.to_string(), (mode, oid));
            }
            Some((dir, rest)) => {
                self.children
                    .entry(dir.to_string())
                    .or_default()
                    .insert(rest, mode, oid)?;
            }
        }
        Ok(())
    }

    /// Store children before the parent: a subtree's hash must exist
    /// before the parent can be serialized.
    fn store(&self, database: &Database) -> Result<ObjectId> {
        let mut entries = Vec::new();

        for (name, child) in &self.children {
            let child_oid = child.store(database)?;
            entries.push(TreeEntry::new(
                EntryMode::Directory,
                name.clone(),
                child_oid,
            ));
        }

        for (name, (mode, oid)) in &self.files {
            entries.push(TreeEntry::new(*mode, name.clone(), oid.clone()));
        }

        let tree = Tree::from_entries(entries);
        database.store(&tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn index(dir: &TempDir) -> Index {
        Index::new(dir.path().join("index").into_boxed_path())
    }

    fn entry(path: &str, content: &[u8]) -> IndexEntry {
        IndexEntry::new(
            path.to_string(),
            crate::artifacts::objects::object::object_hash(
                crate::artifacts::objects::object_type::ObjectType::Blob,
                content,
            ),
            EntryMetadata {
                size: content.len() as i64,
                mtime: 1_700_000_000,
                ..EntryMetadata::default()
            },
        )
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let mut index = index(&dir);
        index.load().unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn save_load_round_trips_entry_set() {
        let dir = TempDir::new().unwrap();
        let mut index = index(&dir);
        index.add(entry("b.txt", b"bee")).unwrap();
        index.add(entry("a/nested.txt", b"nested")).unwrap();
        index.add(entry("a.txt", b"ay")).unwrap();
        index.save().unwrap();

        let mut fresh = Index::new(dir.path().join("index").into_boxed_path());
        fresh.load().unwrap();

        let original: Vec<_> = index
            .entries()
            .map(|e| (e.path.clone(), e.oid.clone(), e.metadata.mode, e.metadata.size))
            .collect();
        let reloaded: Vec<_> = fresh
            .entries()
            .map(|e| (e.path.clone(), e.oid.clone(), e.metadata.mode, e.metadata.size))
            .collect();
        assert_eq!(original, reloaded);
    }

    #[test]
    fn entries_are_sorted_by_path_on_save() {
        let dir = TempDir::new().unwrap();
        let mut index = index(&dir);
        index.add(entry("z.txt", b"z")).unwrap();
        index.add(entry("a.txt", b"a")).unwrap();
        index.save().unwrap();

        let mut fresh = Index::new(dir.path().join("index").into_boxed_path());
        fresh.load().unwrap();
        let paths: Vec<_> = fresh.entries().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec!["a.txt", "z.txt"]);
    }

    #[test]
    fn add_replaces_existing_path() {
        let dir = TempDir::new().unwrap();
        let mut index = index(&dir);
        index.add(entry("a.txt", b"old")).unwrap();
        index.add(entry("a.txt", b"new")).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn remove_unknown_path_fails() {
        let dir = TempDir::new().unwrap();
        let mut index = index(&dir);
        let err = index.remove("ghost.txt").unwrap_err();
        assert!(err.to_string().contains("not staged"));
    }

    #[test]
    fn corrupted_index_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut index = index(&dir);
        index.add(entry("a.txt", b"a")).unwrap();
        index.save().unwrap();

        let path = dir.path().join("index");
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, bytes).unwrap();

        let mut fresh = Index::new(path.into_boxed_path());
        assert!(fresh.load().is_err());
    }

    #[test]
    fn write_tree_is_deterministic_across_insert_order() {
        let dir = TempDir::new().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());

        let mut first = index(&dir);
        first.add(entry("src/lib.rs", b"lib")).unwrap();
        first.add(entry("readme.md", b"docs")).unwrap();
        first.add(entry("src/main.rs", b"main")).unwrap();

        let mut second = index(&dir);
        second.add(entry("src/main.rs", b"main")).unwrap();
        second.add(entry("src/lib.rs", b"lib")).unwrap();
        second.add(entry("readme.md", b"docs")).unwrap();

        assert_eq!(
            first.write_tree(&database).unwrap(),
            second.write_tree(&database).unwrap()
        );
    }

    #[test]
    fn write_tree_with_no_entries_fails() {
        let dir = TempDir::new().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());
        let index = index(&dir);
        let err = index.write_tree(&database).unwrap_err();
        assert!(err.to_string().contains("nothing to commit"));
    }
}
