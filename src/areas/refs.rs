//! Reference store (HEAD, branches, tags, remote-tracking refs)
//!
//! References are text files under `.git/`: `refs/heads/<branch>`,
//! `refs/tags/<tag>` and `refs/remotes/<remote>/<branch>` each hold one
//! 40-hex hash and a newline. `HEAD` holds either `ref: <refname>` or a
//! detached hash. Reads trim trailing whitespace before validating.

use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::GitError;
use anyhow::{Context, Result};
use derive_new::new;
use file_guard::Lock;
use std::collections::BTreeMap;
use std::io::Write;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SYMREF_PREFIX: &str = "ref: ";

/// Where HEAD currently points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadState {
    /// `ref: refs/heads/<name>`, possibly an unborn branch
    Symbolic(String),
    /// A raw commit hash
    Detached(ObjectId),
}

/// Reference manager rooted at `.git`
#[derive(Debug, new)]
pub struct Refs {
    path: Box<Path>,
}

impl Refs {
    pub fn head_path(&self) -> PathBuf {
        self.path.join("HEAD")
    }

    pub fn refs_path(&self) -> PathBuf {
        self.path.join("refs")
    }

    pub fn heads_path(&self) -> PathBuf {
        self.refs_path().join("heads")
    }

    pub fn tags_path(&self) -> PathBuf {
        self.refs_path().join("tags")
    }

    pub fn remotes_path(&self) -> PathBuf {
        self.refs_path().join("remotes")
    }

    /// Parse HEAD, canonicalizing whitespace
    pub fn head_state(&self) -> Result<HeadState> {
        let head_path = self.head_path();
        let content = std::fs::read_to_string(&head_path)
            .with_context(|| format!("unable to read {}", head_path.display()))?;
        let content = content.trim_end();

        if let Some(refname) = content.strip_prefix(SYMREF_PREFIX) {
            return Ok(HeadState::Symbolic(refname.trim().to_string()));
        }

        let oid = ObjectId::try_parse(content)
            .map_err(|_| GitError::InvalidReference(content.to_string()))?;
        Ok(HeadState::Detached(oid))
    }

    /// The commit HEAD resolves to, if any. A symbolic HEAD pointing at a
    /// branch with no commits yet resolves to `None`.
    pub fn read_head(&self) -> Result<Option<ObjectId>> {
        match self.head_state()? {
            HeadState::Detached(oid) => Ok(Some(oid)),
            HeadState::Symbolic(refname) => self.read_ref(&refname),
        }
    }

    /// Branch name when HEAD is symbolic under `refs/heads/`
    pub fn current_branch(&self) -> Result<Option<String>> {
        match self.head_state()? {
            HeadState::Symbolic(refname) => {
                Ok(refname.strip_prefix("refs/heads/").map(|s| s.to_string()))
            }
            HeadState::Detached(_) => Ok(None),
        }
    }

    /// Read a ref by its full name (e.g. `refs/heads/main`)
    pub fn read_ref(&self, refname: &str) -> Result<Option<ObjectId>> {
        let ref_path = self.path.join(refname);
        if !ref_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&ref_path)
            .with_context(|| format!("unable to read {}", ref_path.display()))?;
        let content = content.trim_end();
        if content.is_empty() {
            return Ok(None);
        }

        let oid = ObjectId::try_parse(content)
            .map_err(|_| GitError::InvalidReference(refname.to_string()))?;
        Ok(Some(oid))
    }

    /// Write a ref by its full name, creating parent directories
    pub fn update_ref(&self, refname: &str, oid: &ObjectId) -> Result<()> {
        let ref_path = self.path.join(refname);
        self.write_ref_file(&ref_path, &format!("{oid}\n"))
    }

    /// Point HEAD at a branch name (symbolic)
    pub fn set_head_symbolic(&self, refname: &str) -> Result<()> {
        self.write_ref_file(&self.head_path(), &format!("{SYMREF_PREFIX}{refname}\n"))
    }

    /// Move the commit HEAD resolves to. A symbolic HEAD moves its branch;
    /// a detached HEAD is rewritten in place.
    pub fn update_head(&self, oid: &ObjectId) -> Result<()> {
        match self.head_state()? {
            HeadState::Symbolic(refname) => self.update_ref(&refname, oid),
            HeadState::Detached(_) => {
                self.write_ref_file(&self.head_path(), &format!("{oid}\n"))
            }
        }
    }

    fn write_ref_file(&self, path: &Path, content: &str) -> Result<()> {
        let parent = path
            .parent()
            .with_context(|| format!("invalid ref path {}", path.display()))?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("unable to create {}", parent.display()))?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("unable to open {}", path.display()))?;
        let mut lock = file_guard::lock(&mut file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(content.as_bytes())?;
        Ok(())
    }

    /// All branch names under `refs/heads/`
    pub fn list_branches(&self) -> Result<Vec<String>> {
        self.list_under(&self.heads_path())
    }

    /// All tag names under `refs/tags/`
    pub fn list_tags(&self) -> Result<Vec<String>> {
        self.list_under(&self.tags_path())
    }

    fn list_under(&self, root: &Path) -> Result<Vec<String>> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(root)
                    .ok()
                    .map(|rel| rel.to_string_lossy().to_string())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// Tag name -> hash for every local tag
    pub fn tag_targets(&self) -> Result<BTreeMap<String, ObjectId>> {
        let mut targets = BTreeMap::new();
        for tag in self.list_tags()? {
            if let Some(oid) = self.read_ref(&format!("refs/tags/{tag}"))? {
                targets.insert(tag, oid);
            }
        }
        Ok(targets)
    }

    /// Record the remote-tracking tip for `refs/remotes/<remote>/<branch>`
    pub fn update_remote_ref(&self, remote: &str, branch: &str, oid: &ObjectId) -> Result<()> {
        self.update_ref(&format!("refs/remotes/{remote}/{branch}"), oid)
    }
}
