use crate::areas::repository::Repository;
use crate::artifacts::history::revision;
use crate::artifacts::index::index_entry::IndexEntry;
use anyhow::{Context, Result};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetMode {
    Soft,
    #[default]
    Mixed,
    Hard,
}

impl Repository {
    /// Move the current branch to `target` and, depending on the mode,
    /// rebuild the index and worktree. With pathspecs, only the named
    /// index entries are restored from the target tree.
    pub fn reset(&mut self, mode: ResetMode, target: &str, paths: &[String]) -> Result<()> {
        if !paths.is_empty() {
            return self.reset_paths(target, paths);
        }

        let target_oid = revision::resolve(self.database(), self.refs(), target)
            .with_context(|| format!("git reset {target}"))?;
        let commit = self
            .database()
            .load_commit(&target_oid)
            .with_context(|| format!("git reset {target_oid}"))?;

        // tracked set before the ref moves, for hard-mode cleanup
        let previously_tracked: Vec<String> = if mode == ResetMode::Hard {
            let mut index = self.index();
            index.load()?;
            index.entries().map(|entry| entry.path.clone()).collect()
        } else {
            Vec::new()
        };

        self.refs().update_head(&target_oid)?;

        if mode != ResetMode::Soft {
            let mut index = self.index();
            self.read_tree_into_index(commit.tree(), &mut index)?;
            index.save()?;
        }

        if mode == ResetMode::Hard {
            for path in previously_tracked {
                self.workspace().remove_file(&path)?;
            }

            let mut index = self.index();
            index.clear();
            self.materialize_tree(commit.tree(), &mut index, false)?;
            index.save()?;
        }

        writeln!(self.writer(), "HEAD is now at {}", target_oid.short(7))?;
        Ok(())
    }

    /// Pathspec reset: restore the named paths from the target tree, or
    /// drop them from the index when the tree lacks them.
    fn reset_paths(&mut self, target: &str, paths: &[String]) -> Result<()> {
        let target_oid = revision::resolve(self.database(), self.refs(), target)
            .with_context(|| format!("git reset {target}"))?;
        let commit = self.database().load_commit(&target_oid)?;
        let tree_files = self.database().flatten_tree(commit.tree())?;

        let mut index = self.index();
        index.load()?;

        for path in paths {
            match tree_files.get(path) {
                Some((mode, oid)) => {
                    let size = self
                        .database()
                        .load_blob(oid)
                        .map(|blob| blob.len() as i64)
                        .unwrap_or(0);
                    let mut entry = IndexEntry::new(path.clone(), oid.clone(), Default::default());
                    entry.metadata.mode = *mode;
                    entry.metadata.size = size;
                    index.add(entry)?;
                }
                None => {
                    index
                        .remove(path)
                        .with_context(|| format!("git reset {path}"))?;
                }
            }
        }

        index.save()
    }
}
