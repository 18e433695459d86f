use crate::areas::repository::Repository;
use crate::artifacts::status;
use crate::errors::GitError;
use anyhow::Result;
use std::io::Write;

impl Repository {
    /// Render the three-way status report
    pub fn status(&mut self) -> Result<()> {
        if !self.exists() {
            return Err(GitError::NotARepository.into());
        }

        let report = status::compute(self)?;
        let mut writer = self.writer();

        writeln!(writer, "On branch {}", report.branch)?;
        if report.is_initial {
            writeln!(writer, "\nNo commits yet")?;
        }
        writeln!(writer)?;

        let staged: Vec<_> = report.staged().collect();
        let unstaged: Vec<_> = report.unstaged().collect();
        let untracked: Vec<_> = report.untracked().collect();

        if !staged.is_empty() {
            writeln!(writer, "Changes to be committed:")?;
            writeln!(writer, "  (use \"git reset HEAD <file>...\" to unstage)\n")?;
            for entry in &staged {
                writeln!(writer, "\t{}{}", entry.index_state.short_code(), entry.path)?;
            }
            writeln!(writer)?;
        }

        if !unstaged.is_empty() {
            writeln!(writer, "Changes not staged for commit:")?;
            writeln!(
                writer,
                "  (use \"git add <file>...\" to update what will be committed)\n"
            )?;
            for entry in &unstaged {
                writeln!(writer, "\t{}{}", entry.work_state.short_code(), entry.path)?;
            }
            writeln!(writer)?;
        }

        if !untracked.is_empty() {
            writeln!(writer, "Untracked files:")?;
            writeln!(
                writer,
                "  (use \"git add <file>...\" to include in what will be committed)\n"
            )?;
            for entry in &untracked {
                writeln!(writer, "\t{}", entry.path)?;
            }
            writeln!(writer)?;
        }

        if report.is_clean() {
            writeln!(writer, "nothing to commit, working tree clean")?;
        }

        Ok(())
    }
}
