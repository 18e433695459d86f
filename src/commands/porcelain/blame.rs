use crate::areas::repository::Repository;
use crate::artifacts::history::blame;
use crate::errors::GitError;
use anyhow::{Context, Result};
use std::io::Write;

impl Repository {
    /// Credit each line of `path` to the commit that introduced it
    pub fn blame(&mut self, path: &str) -> Result<()> {
        if !self.exists() {
            return Err(GitError::NotARepository.into());
        }

        let head = self
            .refs()
            .read_head()?
            .ok_or(GitError::ReferenceNotFound("HEAD".to_string()))
            .with_context(|| format!("git blame {path}: no commits yet"))?;

        let result = blame::blame_file(self.database(), &head, path)
            .with_context(|| format!("git blame {path}"))?;

        let mut writer = self.writer();
        for line in &result.lines {
            writeln!(
                writer,
                "{} ({} {} {}) {}",
                line.oid.short(8),
                line.author,
                line.author_time.format("%Y-%m-%d %H:%M:%S"),
                line.line_number,
                line.content
            )?;
        }

        Ok(())
    }
}
