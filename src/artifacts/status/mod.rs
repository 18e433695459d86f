//! Working-tree status
//!
//! Three-way comparison of the HEAD tree, the index, and the worktree.
//! Each path gets two states: index-vs-HEAD (what a commit would record)
//! and worktree-vs-index (what is not yet staged). Untracked detection
//! honours the ignore predicate.

use crate::areas::repository::Repository;
use crate::artifacts::ignore::IgnoreRules;
use crate::artifacts::objects::object::object_hash;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Result;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Untracked,
    Added,
    Modified,
    Deleted,
    Unmodified,
}

impl FileState {
    pub fn short_code(&self) -> &'static str {
        match self {
            FileState::Untracked => "??",
            FileState::Added => "A ",
            FileState::Modified => "M ",
            FileState::Deleted => "D ",
            FileState::Unmodified => "  ",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub path: String,
    /// HEAD vs index
    pub index_state: FileState,
    /// index vs worktree
    pub work_state: FileState,
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub branch: String,
    pub is_initial: bool,
    pub entries: Vec<StatusEntry>,
}

impl StatusReport {
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn staged(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.index_state != FileState::Unmodified)
    }

    pub fn unstaged(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter().filter(|entry| {
            entry.work_state != FileState::Unmodified && entry.work_state != FileState::Untracked
        })
    }

    pub fn untracked(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.work_state == FileState::Untracked)
    }
}

/// Compute the status of the repository
pub fn compute(repository: &Repository) -> Result<StatusReport> {
    let branch = repository
        .refs()
        .current_branch()?
        .unwrap_or_else(|| "HEAD".to_string());

    let head = repository.refs().read_head()?;
    let is_initial = head.is_none();

    let head_files: BTreeMap<String, ObjectId> = match &head {
        Some(head) => {
            let commit = repository.database().load_commit(head)?;
            repository
                .database()
                .flatten_tree(commit.tree())?
                .into_iter()
                .map(|(path, (_, oid))| (path, oid))
                .collect()
        }
        None => BTreeMap::new(),
    };

    let mut index = repository.index();
    index.load()?;
    let index_files: BTreeMap<String, ObjectId> = index
        .entries()
        .map(|entry| (entry.path.clone(), entry.oid.clone()))
        .collect();

    let ignore = IgnoreRules::load(repository.workspace().path())?;
    let mut working_files: BTreeMap<String, ObjectId> = BTreeMap::new();
    for path in repository.workspace().list_files(None, &ignore) {
        let content = repository.workspace().read_file(&path)?;
        working_files.insert(path, object_hash(ObjectType::Blob, &content));
    }

    let mut all_paths: Vec<&String> = head_files
        .keys()
        .chain(index_files.keys())
        .chain(working_files.keys())
        .collect();
    all_paths.sort();
    all_paths.dedup();

    let mut entries = Vec::new();
    for path in all_paths {
        let in_head = head_files.get(path);
        let in_index = index_files.get(path);
        let in_work = working_files.get(path);

        let index_state = match (in_head, in_index) {
            (None, Some(_)) => FileState::Added,
            (Some(_), None) => FileState::Deleted,
            (Some(head_oid), Some(index_oid)) if head_oid != index_oid => FileState::Modified,
            _ => FileState::Unmodified,
        };

        let work_state = match (in_index, in_work) {
            (None, Some(_)) => FileState::Untracked,
            (Some(_), None) => FileState::Deleted,
            (Some(index_oid), Some(work_oid)) if index_oid != work_oid => FileState::Modified,
            _ => FileState::Unmodified,
        };

        if index_state != FileState::Unmodified || work_state != FileState::Unmodified {
            entries.push(StatusEntry {
                path: path.clone(),
                index_state,
                work_state,
            });
        }
    }

    Ok(StatusReport {
        branch,
        is_initial,
        entries,
    })
}
