//! Content-addressed object database
//!
//! Objects are zlib-compressed `<type> <size>\0<payload>` files stored at
//! `.git/objects/<first-2-hex>/<remaining-38-hex>`. Loads fall back to any
//! pack files under `objects/pack/` when the loose path is missing.

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::{
    object_hash, split_header, Object, ObjectKind, Packable,
};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::pack::pack_file;
use crate::artifacts::pack::pack_index::PackIndex;
use crate::errors::GitError;
use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Object database rooted at `.git/objects`
#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    fn pack_dir(&self) -> PathBuf {
        self.path.join("pack")
    }

    /// Store a typed object, returning its identity.
    ///
    /// Content-addressed storage makes this idempotent: an existing file
    /// at the target path is treated as success.
    pub fn store(&self, object: &impl Object) -> Result<ObjectId> {
        let oid = object.object_id()?;
        let content = object.serialize()?;
        self.write_object(&oid, &content)?;
        Ok(oid)
    }

    /// Store a raw payload under the canonical header for its type.
    ///
    /// Used by the pack processor, which must preserve byte-exact
    /// identities for objects lifted out of packs.
    pub fn store_raw(&self, object_type: ObjectType, payload: &[u8]) -> Result<ObjectId> {
        let oid = object_hash(object_type, payload);
        let mut content =
            crate::artifacts::objects::object::object_header(object_type, payload.len());
        content.extend_from_slice(payload);
        self.write_object(&oid, &content)?;
        Ok(oid)
    }

    fn write_object(&self, oid: &ObjectId, content: &[u8]) -> Result<()> {
        let object_path = self.path.join(oid.to_path());
        if object_path.exists() {
            return Ok(());
        }

        let object_dir = object_path
            .parent()
            .ok_or_else(|| anyhow!("invalid object path {}", object_path.display()))?;
        std::fs::create_dir_all(object_dir)
            .with_context(|| format!("unable to create {}", object_dir.display()))?;

        let compressed = Self::compress(content)?;

        // temp file + rename keeps a crashed writer from leaving torn objects
        let temp_path = object_dir.join(Self::temp_name());
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("unable to open {}", temp_path.display()))?;
        file.write_all(&compressed)
            .with_context(|| format!("unable to write {}", temp_path.display()))?;

        std::fs::rename(&temp_path, &object_path)
            .with_context(|| format!("unable to finalize {}", object_path.display()))?;

        Ok(())
    }

    /// Load and parse an object by identity
    pub fn load(&self, oid: &ObjectId) -> Result<ObjectKind> {
        let (object_type, payload) = self.load_raw(oid)?;
        ObjectKind::parse(object_type, &payload)
    }

    /// Load an object's type and payload without parsing it
    pub fn load_raw(&self, oid: &ObjectId) -> Result<(ObjectType, Bytes)> {
        let object_path = self.path.join(oid.to_path());
        if object_path.exists() {
            let compressed = std::fs::read(&object_path)
                .with_context(|| format!("unable to read {}", object_path.display()))?;
            let data = Self::decompress(&compressed)?;
            let (object_type, payload) = split_header(&data)
                .with_context(|| format!("object {oid} has a malformed header"))?;
            return Ok((object_type, Bytes::copy_from_slice(payload)));
        }

        self.load_from_packs(oid)?
            .ok_or_else(|| anyhow!(GitError::ObjectNotFound(oid.to_string())))
    }

    pub fn load_commit(&self, oid: &ObjectId) -> Result<Commit> {
        Ok(self.load(oid)?.into_commit()?)
    }

    pub fn load_tree(&self, oid: &ObjectId) -> Result<Tree> {
        Ok(self.load(oid)?.into_tree()?)
    }

    pub fn load_blob(&self, oid: &ObjectId) -> Result<Blob> {
        Ok(self.load(oid)?.into_blob()?)
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        if self.path.join(oid.to_path()).exists() {
            return true;
        }
        matches!(self.load_from_packs(oid), Ok(Some(_)))
    }

    fn load_from_packs(&self, oid: &ObjectId) -> Result<Option<(ObjectType, Bytes)>> {
        let pack_dir = self.pack_dir();
        if !pack_dir.is_dir() {
            return Ok(None);
        }

        for entry in std::fs::read_dir(&pack_dir)? {
            let entry = entry?;
            let idx_path = entry.path();
            if idx_path.extension().and_then(|e| e.to_str()) != Some("idx") {
                continue;
            }
            let pack_path = idx_path.with_extension("pack");
            if !pack_path.exists() {
                continue;
            }

            let index = PackIndex::open(&idx_path)
                .with_context(|| format!("unable to read {}", idx_path.display()))?;
            if let Some(offset) = index.lookup(oid)? {
                let object = pack_file::read_object_at(&pack_path, offset, self)
                    .with_context(|| format!("unable to read {} from pack", oid))?;
                return Ok(Some(object));
            }
        }

        Ok(None)
    }

    /// Expand a hex prefix against the loose store.
    ///
    /// Objects living only inside packs are not considered; this mirrors
    /// the reference client's short-hash resolution.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        let mut matches = Vec::new();
        if prefix.len() < 2 {
            return Ok(matches);
        }

        let (bucket, rest) = prefix.split_at(2);
        let bucket_path = self.path.join(bucket);
        if !bucket_path.is_dir() {
            return Ok(matches);
        }

        for entry in std::fs::read_dir(&bucket_path)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.starts_with(rest) {
                if let Ok(oid) = ObjectId::try_parse(format!("{bucket}{file_name}")) {
                    matches.push(oid);
                }
            }
        }

        Ok(matches)
    }

    /// Flatten a tree into `path -> (mode, oid)` for every file entry
    pub fn flatten_tree(&self, root: &ObjectId) -> Result<BTreeMap<String, (EntryMode, ObjectId)>> {
        let mut files = BTreeMap::new();
        self.flatten_tree_into(root, "", &mut files)?;
        Ok(files)
    }

    fn flatten_tree_into(
        &self,
        tree_oid: &ObjectId,
        prefix: &str,
        files: &mut BTreeMap<String, (EntryMode, ObjectId)>,
    ) -> Result<()> {
        let tree = self.load_tree(tree_oid)?;
        for entry in tree.entries() {
            let path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{prefix}/{}", entry.name)
            };

            if entry.mode.is_tree() {
                self.flatten_tree_into(&entry.oid, &path, files)?;
            } else {
                files.insert(path, (entry.mode, entry.oid.clone()));
            }
        }
        Ok(())
    }

    fn compress(data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(data)
            .context("unable to compress object content")?;
        encoder
            .finish()
            .context("unable to finish compressing object content")
    }

    fn decompress(data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .context("unable to decompress object content")?;
        Ok(decompressed)
    }

    fn temp_name() -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        format!("tmp-obj-{}-{nanos}", std::process::id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::tree::TreeEntry;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn database() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());
        (dir, database)
    }

    #[test]
    fn store_then_load_round_trips() {
        let (_dir, database) = database();
        let blob = Blob::from_slice(b"Hello World");
        let oid = database.store(&blob).unwrap();
        assert_eq!(oid.as_ref(), "5e1c309dae7f45e0f39b1bf3ac3cd9db12e7d689");

        match database.load(&oid).unwrap() {
            ObjectKind::Blob(loaded) => assert_eq!(loaded, blob),
            other => panic!("expected blob, got {:?}", other.object_type()),
        }
    }

    #[test]
    fn storing_twice_is_idempotent() {
        let (_dir, database) = database();
        let blob = Blob::from_slice(b"same bytes");
        let first = database.store(&blob).unwrap();
        let second = database.store(&blob).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn store_raw_preserves_identity() {
        let (_dir, database) = database();
        let oid = database.store_raw(ObjectType::Blob, b"Hello World").unwrap();
        assert_eq!(oid.as_ref(), "5e1c309dae7f45e0f39b1bf3ac3cd9db12e7d689");

        let (object_type, payload) = database.load_raw(&oid).unwrap();
        assert_eq!(object_type, ObjectType::Blob);
        assert_eq!(&payload[..], b"Hello World");
    }

    #[test]
    fn missing_object_reports_not_found() {
        let (_dir, database) = database();
        let oid = ObjectId::try_parse("a".repeat(40)).unwrap();
        let err = database.load(&oid).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn prefix_search_scans_loose_bucket() {
        let (_dir, database) = database();
        let oid = database.store(&Blob::from_slice(b"Hello World")).unwrap();
        let matches = database.find_by_prefix(&oid.as_ref()[..6]).unwrap();
        assert_eq!(matches, vec![oid]);
        assert!(database.find_by_prefix("ffff").unwrap().is_empty());
    }

    #[test]
    fn flatten_tree_walks_subtrees() {
        let (_dir, database) = database();
        let blob_oid = database.store(&Blob::from_slice(b"content")).unwrap();

        let subtree = Tree::from_entries(vec![TreeEntry::new(
            EntryMode::Regular,
            "inner.txt".to_string(),
            blob_oid.clone(),
        )]);
        let subtree_oid = database.store(&subtree).unwrap();

        let root = Tree::from_entries(vec![
            TreeEntry::new(EntryMode::Regular, "top.txt".to_string(), blob_oid.clone()),
            TreeEntry::new(EntryMode::Directory, "dir".to_string(), subtree_oid),
        ]);
        let root_oid = database.store(&root).unwrap();

        let files = database.flatten_tree(&root_oid).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files["top.txt"].1, blob_oid);
        assert_eq!(files["dir/inner.txt"].1, blob_oid);
    }
}
