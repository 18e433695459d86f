//! Commit history walk
//!
//! Depth-first from HEAD through parent edges with a visited set, the
//! way the log command presents history. Produces structured records;
//! rendering belongs to the command layer.

use crate::areas::database::Database;
use crate::artifacts::objects::commit::Signature;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Result;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub oid: ObjectId,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
    pub parents: Vec<ObjectId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    pub max_count: Option<usize>,
}

/// Collect log entries starting at `head`
pub fn collect(database: &Database, head: &ObjectId, options: LogOptions) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut stack = vec![head.clone()];

    while let Some(current) = stack.pop() {
        if let Some(max) = options.max_count {
            if entries.len() >= max {
                break;
            }
        }
        if !visited.insert(current.clone()) {
            continue;
        }

        let commit = database.load_commit(&current)?;
        entries.push(LogEntry {
            oid: current,
            author: commit.author().clone(),
            committer: commit.committer().clone(),
            message: commit.message().to_string(),
            parents: commit.parents().to_vec(),
        });

        // push in reverse so the first parent is walked first
        for parent in commit.parents().iter().rev() {
            if !visited.contains(parent) {
                stack.push(parent.clone());
            }
        }
    }

    Ok(entries)
}
