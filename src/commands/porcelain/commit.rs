use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::{Commit, Signature};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::GitError;
use anyhow::{Context, Result};
use std::io::Write;

impl Repository {
    /// Build the tree from the index, create the commit, and advance the
    /// current branch.
    pub fn commit(
        &mut self,
        message: &str,
        author_name: Option<String>,
        author_email: Option<String>,
    ) -> Result<ObjectId> {
        if !self.exists() {
            return Err(GitError::NotARepository.into());
        }
        if message.trim().is_empty() {
            return Err(GitError::NothingToCommit).context("git commit: empty commit message");
        }

        let mut index = self.index();
        index.load().context("git commit: unable to load index")?;

        let tree_oid = index.write_tree(self.database())?;

        let parent = self.refs().read_head()?;
        let signature = Signature::resolve(author_name, author_email);
        let commit = Commit::new(
            tree_oid,
            parent.clone().into_iter().collect(),
            signature.clone(),
            signature,
            message.to_string(),
        );

        let commit_oid = self.database().store(&commit)?;
        self.refs().update_head(&commit_oid)?;

        let branch = self
            .refs()
            .current_branch()?
            .unwrap_or_else(|| "HEAD".to_string());
        let label = if parent.is_none() {
            format!("{branch} (root-commit)")
        } else {
            branch
        };
        writeln!(
            self.writer(),
            "[{label} {}] {}",
            commit_oid.short(7),
            commit.title_line()
        )?;

        Ok(commit_oid)
    }
}
