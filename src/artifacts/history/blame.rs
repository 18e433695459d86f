//! Line-level blame
//!
//! For each line of the file at the starting commit, climb first-parent
//! history while a plausibly corresponding parent line carries the same
//! content; the commit where the climb stops introduced (or last
//! altered) the line. Line correspondence is a content match scored by a
//! small context window to disambiguate repeated lines. A visited set
//! guards against cyclic histories.

use crate::areas::database::Database;
use crate::artifacts::history::diff::split_lines;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::GitError;
use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset};
use std::collections::HashSet;

/// Lines matched within ± this many positions of the expected spot
const CONTEXT_WINDOW: i64 = 3;

#[derive(Debug, Clone)]
pub struct BlameLine {
    pub line_number: usize,
    pub content: String,
    pub oid: ObjectId,
    pub author: String,
    pub author_time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct BlameResult {
    pub path: String,
    pub lines: Vec<BlameLine>,
}

/// Blame `path` as of `start` (normally HEAD's commit)
pub fn blame_file(database: &Database, start: &ObjectId, path: &str) -> Result<BlameResult> {
    let content = file_at_commit(database, start, path)?
        .ok_or_else(|| anyhow!(GitError::ObjectNotFound(path.to_string())))
        .map_err(|err| err.context(format!("'{path}' does not exist at {start}")))?;
    let lines = split_lines(&content);

    let mut blame_lines = Vec::with_capacity(lines.len());
    for (index, content) in lines.iter().enumerate() {
        let commit_oid = find_introducing_commit(database, start, path, index + 1)?;
        let commit = database.load_commit(&commit_oid)?;

        blame_lines.push(BlameLine {
            line_number: index + 1,
            content: content.clone(),
            author: commit.author().name.clone(),
            author_time: commit.author().timestamp,
            oid: commit_oid,
        });
    }

    Ok(BlameResult {
        path: path.to_string(),
        lines: blame_lines,
    })
}

/// Walk first-parent history while the line survives unchanged
fn find_introducing_commit(
    database: &Database,
    start: &ObjectId,
    path: &str,
    line_number: usize,
) -> Result<ObjectId> {
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut current = start.clone();
    let mut current_line = line_number;

    loop {
        if !visited.insert(current.clone()) {
            // cyclic history; credit where the walk stopped
            return Ok(current);
        }

        let commit = database.load_commit(&current)?;
        let Some(parent) = commit.parents().first() else {
            return Ok(current);
        };

        let Some(content) = file_at_commit(database, &current, path)? else {
            return Ok(current);
        };
        let lines = split_lines(&content);
        if current_line > lines.len() {
            return Ok(current);
        }

        let Some(parent_content) = file_at_commit(database, parent, path)? else {
            // parent lacks the file; this commit introduced it
            return Ok(current);
        };
        let parent_lines = split_lines(&parent_content);

        match corresponding_line(&lines, &parent_lines, current_line) {
            Some(parent_line)
                if parent_lines[parent_line - 1] == lines[current_line - 1] =>
            {
                current = parent.clone();
                current_line = parent_line;
            }
            _ => return Ok(current),
        }
    }
}

/// Find the parent line matching `line_number`'s content, preferring the
/// candidate whose surrounding lines agree the most.
fn corresponding_line(
    lines: &[String],
    parent_lines: &[String],
    line_number: usize,
) -> Option<usize> {
    let target = &lines[line_number - 1];

    let first_match = parent_lines.iter().position(|line| line == target)?;

    let mut best_index = first_match;
    let mut best_score = -1i64;

    for offset in -CONTEXT_WINDOW..=CONTEXT_WINDOW {
        let candidate = first_match as i64 + offset;
        if candidate < 0 || candidate >= parent_lines.len() as i64 {
            continue;
        }
        let candidate = candidate as usize;
        if parent_lines[candidate] != *target {
            continue;
        }

        let score = context_score(lines, parent_lines, line_number - 1, candidate);
        if score > best_score {
            best_score = score;
            best_index = candidate;
        }
    }

    Some(best_index + 1)
}

fn context_score(
    lines: &[String],
    parent_lines: &[String],
    index: usize,
    parent_index: usize,
) -> i64 {
    let mut score = 0;
    for offset in -CONTEXT_WINDOW..=CONTEXT_WINDOW {
        let a = index as i64 + offset;
        let b = parent_index as i64 + offset;
        if a < 0 || b < 0 || a >= lines.len() as i64 || b >= parent_lines.len() as i64 {
            continue;
        }
        if lines[a as usize] == parent_lines[b as usize] {
            score += 1;
        }
    }
    score
}

/// Content of `path` (slash-separated) in the commit's tree, descending
/// through subtrees.
pub fn file_at_commit(
    database: &Database,
    commit_oid: &ObjectId,
    path: &str,
) -> Result<Option<Vec<u8>>> {
    let commit: Commit = database.load_commit(commit_oid)?;
    let mut tree_oid = commit.tree().clone();

    let mut segments = path.split('/').peekable();
    while let Some(segment) = segments.next() {
        let tree = database.load_tree(&tree_oid)?;
        let Some(entry) = tree.find(segment) else {
            return Ok(None);
        };

        if segments.peek().is_none() {
            if entry.mode.is_tree() {
                return Ok(None);
            }
            let blob = database.load_blob(&entry.oid)?;
            return Ok(Some(blob.content().to_vec()));
        }

        if !entry.mode.is_tree() {
            return Ok(None);
        }
        tree_oid = entry.oid.clone();
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::blob::Blob;
    use crate::artifacts::objects::commit::Signature;
    use crate::artifacts::objects::entry_mode::EntryMode;
    use crate::artifacts::objects::tree::{Tree, TreeEntry};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        database: Database,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let database = Database::new(dir.path().join("objects").into_boxed_path());
            Fixture {
                _dir: dir,
                database,
            }
        }

        fn commit_file(
            &self,
            author: &str,
            content: &str,
            parent: Option<&ObjectId>,
        ) -> ObjectId {
            let blob = self
                .database
                .store(&Blob::from_slice(content.as_bytes()))
                .unwrap();
            let tree = Tree::from_entries(vec![TreeEntry::new(
                EntryMode::Regular,
                "file.txt".to_string(),
                blob,
            )]);
            let tree_oid = self.database.store(&tree).unwrap();

            let offset = FixedOffset::east_opt(0).unwrap();
            let signature = Signature::new_with_timestamp(
                author.to_string(),
                format!("{author}@x"),
                offset.timestamp_opt(1_700_000_000, 0).single().unwrap(),
            );
            let commit = Commit::new(
                tree_oid,
                parent.cloned().into_iter().collect(),
                signature.clone(),
                signature,
                format!("by {author}"),
            );
            self.database.store(&commit).unwrap()
        }
    }

    #[test]
    fn initial_commit_owns_every_line() {
        let fixture = Fixture::new();
        let commit = fixture.commit_file("alice", "one\ntwo\nthree\n", None);

        let result = blame_file(&fixture.database, &commit, "file.txt").unwrap();
        assert_eq!(result.lines.len(), 3);
        for (index, line) in result.lines.iter().enumerate() {
            assert_eq!(line.line_number, index + 1);
            assert_eq!(line.oid, commit);
            assert_eq!(line.author, "alice");
        }
        assert_eq!(result.lines[1].content, "two");
    }

    #[test]
    fn modified_line_is_credited_to_the_modifier() {
        let fixture = Fixture::new();
        let first = fixture.commit_file("alice", "one\ntwo\nthree\n", None);
        let second =
            fixture.commit_file("bob", "one\nTWO CHANGED\nthree\n", Some(&first));

        let result = blame_file(&fixture.database, &second, "file.txt").unwrap();
        assert_eq!(result.lines[0].oid, first);
        assert_eq!(result.lines[0].author, "alice");
        assert_eq!(result.lines[1].oid, second);
        assert_eq!(result.lines[1].author, "bob");
        assert_eq!(result.lines[2].oid, first);
    }

    #[test]
    fn inserted_line_shifts_surviving_lines() {
        let fixture = Fixture::new();
        let first = fixture.commit_file("alice", "alpha\nomega\n", None);
        let second =
            fixture.commit_file("bob", "alpha\ninserted\nomega\n", Some(&first));

        let result = blame_file(&fixture.database, &second, "file.txt").unwrap();
        assert_eq!(result.lines[0].author, "alice");
        assert_eq!(result.lines[1].author, "bob");
        assert_eq!(result.lines[2].author, "alice");
    }

    #[test]
    fn missing_file_is_an_error() {
        let fixture = Fixture::new();
        let commit = fixture.commit_file("alice", "x\n", None);
        assert!(blame_file(&fixture.database, &commit, "ghost.txt").is_err());
    }

    #[test]
    fn nested_path_lookup_descends_trees() {
        let fixture = Fixture::new();
        let blob = fixture.database.store(&Blob::from_slice(b"deep\n")).unwrap();
        let inner = Tree::from_entries(vec![TreeEntry::new(
            EntryMode::Regular,
            "inner.txt".to_string(),
            blob,
        )]);
        let inner_oid = fixture.database.store(&inner).unwrap();
        let root = Tree::from_entries(vec![TreeEntry::new(
            EntryMode::Directory,
            "dir".to_string(),
            inner_oid,
        )]);
        let root_oid = fixture.database.store(&root).unwrap();

        let offset = FixedOffset::east_opt(0).unwrap();
        let signature = Signature::new_with_timestamp(
            "a".to_string(),
            "a@x".to_string(),
            offset.timestamp_opt(1_700_000_000, 0).single().unwrap(),
        );
        let commit = Commit::new(root_oid, vec![], signature.clone(), signature, "m".into());
        let commit_oid = fixture.database.store(&commit).unwrap();

        let content = file_at_commit(&fixture.database, &commit_oid, "dir/inner.txt")
            .unwrap()
            .unwrap();
        assert_eq!(content, b"deep\n");
        assert_eq!(
            file_at_commit(&fixture.database, &commit_oid, "dir/none.txt").unwrap(),
            None
        );
        assert_eq!(
            file_at_commit(&fixture.database, &commit_oid, "dir").unwrap(),
            None
        );
    }
}
