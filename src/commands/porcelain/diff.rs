use crate::areas::repository::Repository;
use crate::artifacts::history::diff::{self, FileDiff, DEFAULT_CONTEXT};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::GitError;
use anyhow::Result;
use std::collections::BTreeMap;
use std::io::Write;

impl Repository {
    /// Show changes: worktree vs index by default, index vs HEAD with
    /// `cached`. Optional paths restrict the output.
    pub fn diff(&mut self, cached: bool, paths: &[String]) -> Result<()> {
        if !self.exists() {
            return Err(GitError::NotARepository.into());
        }

        if cached {
            self.diff_cached(paths)
        } else {
            self.diff_worktree(paths)
        }
    }

    fn diff_worktree(&mut self, paths: &[String]) -> Result<()> {
        let mut index = self.index();
        index.load()?;

        let entries: Vec<(String, ObjectId)> = index
            .entries()
            .map(|entry| (entry.path.clone(), entry.oid.clone()))
            .collect();
        drop(index);

        for (path, oid) in entries {
            if !selected(paths, &path) {
                continue;
            }
            if !self.workspace().exists(&path) {
                continue;
            }

            let staged_content = self.database().load_blob(&oid)?;
            let working_content = self.workspace().read_file(&path)?;
            if staged_content.content().as_ref() == working_content.as_ref() {
                continue;
            }

            let file_diff =
                diff::diff_files(staged_content.content(), &working_content, &path, &path);
            self.render_diff(&file_diff)?;
        }

        Ok(())
    }

    fn diff_cached(&mut self, paths: &[String]) -> Result<()> {
        let mut index = self.index();
        index.load()?;

        let head_files: BTreeMap<String, _> = match self.refs().read_head()? {
            Some(head) => {
                let commit = self.database().load_commit(&head)?;
                self.database()
                    .flatten_tree(commit.tree())?
                    .into_iter()
                    .map(|(path, (_, oid))| (path, oid))
                    .collect()
            }
            None => BTreeMap::new(),
        };

        let staged: Vec<(String, ObjectId)> = index
            .entries()
            .map(|entry| (entry.path.clone(), entry.oid.clone()))
            .collect();
        drop(index);

        for (path, oid) in staged {
            if !selected(paths, &path) {
                continue;
            }

            match head_files.get(&path) {
                None => {
                    writeln!(self.writer(), "new file: {path}")?;
                }
                Some(head_oid) if *head_oid != oid => {
                    let old = self.database().load_blob(head_oid)?;
                    let new = self.database().load_blob(&oid)?;
                    let file_diff =
                        diff::diff_files(old.content(), new.content(), &path, &path);
                    self.render_diff(&file_diff)?;
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    fn render_diff(&self, file_diff: &FileDiff) -> Result<()> {
        if !file_diff.has_changes() {
            return Ok(());
        }

        let mut writer = self.writer();
        writeln!(
            writer,
            "diff --git a/{} b/{}",
            file_diff.old_path, file_diff.new_path
        )?;
        writeln!(writer, "--- a/{}", file_diff.old_path)?;
        writeln!(writer, "+++ b/{}", file_diff.new_path)?;

        for hunk in file_diff.hunks(DEFAULT_CONTEXT) {
            writeln!(writer, "{}", hunk.header())?;
            for line in &hunk.lines {
                writeln!(writer, "{}{}", line.kind.sigil(), line.content)?;
            }
        }

        Ok(())
    }
}

fn selected(paths: &[String], path: &str) -> bool {
    paths.is_empty() || paths.iter().any(|p| p == path)
}
