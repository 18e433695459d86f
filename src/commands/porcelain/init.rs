use crate::areas::repository::Repository;
use crate::errors::GitError;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;

const DEFAULT_BRANCH: &str = "main";

impl Repository {
    /// Create the `.git` skeleton: object store, ref hierarchy, and a
    /// symbolic HEAD on the unborn default branch.
    pub fn init(&mut self) -> Result<()> {
        if self.exists() {
            return Err(GitError::RepositoryExists)
                .with_context(|| format!("git init {}", self.path().display()));
        }

        let git_path = self.git_path();
        for dir in [
            git_path.clone(),
            git_path.join("objects"),
            git_path.join("refs"),
            git_path.join("refs/heads"),
            git_path.join("refs/tags"),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("unable to create {}", dir.display()))?;
        }

        self.refs()
            .set_head_symbolic(&format!("refs/heads/{DEFAULT_BRANCH}"))?;

        writeln!(
            self.writer(),
            "Initialized empty Git repository in {}",
            git_path.display()
        )?;
        Ok(())
    }
}
