//! Repository facade
//!
//! Coordinates the database, index, refs and workspace areas. Commands
//! are implemented as `impl Repository` blocks in `commands::porcelain`
//! and `commands::plumbing`, writing user-facing output through the
//! injected writer.

use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::GitError;
use anyhow::Result;
use log::warn;
use std::cell::{RefCell, RefMut};
use std::path::{Path, PathBuf};

const GIT_DIR: &str = ".git";
const OBJECTS_DIR: &str = "objects";
const INDEX_FILE: &str = "index";

pub struct Repository {
    path: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    database: Database,
    index: RefCell<Index>,
    refs: Refs,
    workspace: Workspace,
}

impl Repository {
    pub fn new(path: PathBuf, writer: Box<dyn std::io::Write>) -> Result<Self> {
        let git_path = path.join(GIT_DIR);

        Ok(Repository {
            database: Database::new(git_path.join(OBJECTS_DIR).into_boxed_path()),
            index: RefCell::new(Index::new(git_path.join(INDEX_FILE).into_boxed_path())),
            refs: Refs::new(git_path.clone().into_boxed_path()),
            workspace: Workspace::new(path.clone().into_boxed_path()),
            writer: RefCell::new(writer),
            path: path.into_boxed_path(),
        })
    }

    /// Open the repository containing `start`, walking parent directories
    /// until a `.git` directory is found.
    pub fn discover(start: &Path, writer: Box<dyn std::io::Write>) -> Result<Self> {
        let mut current = start.canonicalize()?;
        loop {
            if current.join(GIT_DIR).is_dir() {
                return Self::new(current, writer);
            }
            if !current.pop() {
                return Err(GitError::NotARepository.into());
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_path(&self) -> PathBuf {
        self.path.join(GIT_DIR)
    }

    pub fn exists(&self) -> bool {
        self.git_path().is_dir()
    }

    pub fn writer(&self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn index(&self) -> RefMut<'_, Index> {
        self.index.borrow_mut()
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Materialize a tree into the worktree and index.
    ///
    /// With `skip_missing`, blobs absent from the store are skipped with a
    /// warning instead of failing; a thin fetch can leave the worktree
    /// consistent without re-sending unchanged blobs.
    pub fn materialize_tree(
        &self,
        tree_oid: &ObjectId,
        index: &mut Index,
        skip_missing: bool,
    ) -> Result<Vec<String>> {
        let files = self.database.flatten_tree(tree_oid)?;
        let mut updated = Vec::new();

        for (path, (mode, oid)) in files {
            if mode == EntryMode::Symlink {
                warn!("skipping symlink entry {path}: symlinks are not materialized");
                continue;
            }

            let blob = match self.database.load_blob(&oid) {
                Ok(blob) => blob,
                Err(err) if skip_missing => {
                    warn!("skipping {path}: blob {oid} unavailable ({err})");
                    continue;
                }
                Err(err) => return Err(err),
            };

            self.workspace.write_file(&path, blob.content(), mode)?;
            let stat = self.workspace.stat_file(&path)?;
            index.add(IndexEntry::new(path.clone(), oid, stat))?;
            updated.push(path);
        }

        Ok(updated)
    }

    /// Rebuild the index from a tree without touching the worktree
    pub fn read_tree_into_index(&self, tree_oid: &ObjectId, index: &mut Index) -> Result<()> {
        index.clear();
        for (path, (mode, oid)) in self.database.flatten_tree(tree_oid)? {
            let blob_size = self
                .database
                .load_blob(&oid)
                .map(|blob| blob.len() as i64)
                .unwrap_or(0);

            let mut entry = IndexEntry::new(path, oid, Default::default());
            entry.metadata.mode = mode;
            entry.metadata.size = blob_size;
            index.add(entry)?;
        }
        Ok(())
    }
}
