use crate::areas::repository::Repository;
use crate::artifacts::history::log::{self, LogOptions};
use crate::errors::GitError;
use anyhow::Result;
use std::io::Write;

impl Repository {
    /// Show history from HEAD, newest first
    pub fn log(&mut self, oneline: bool, max_count: Option<usize>) -> Result<()> {
        if !self.exists() {
            return Err(GitError::NotARepository.into());
        }

        let Some(head) = self.refs().read_head()? else {
            writeln!(self.writer(), "No commits yet")?;
            return Ok(());
        };

        let entries = log::collect(self.database(), &head, LogOptions { max_count })?;
        let mut writer = self.writer();

        for (position, entry) in entries.iter().enumerate() {
            if oneline {
                let title = entry.message.lines().next().unwrap_or("");
                writeln!(writer, "{} {}", entry.oid.short(7), title)?;
                continue;
            }

            writeln!(writer, "commit {}", entry.oid)?;
            writeln!(writer, "Author: {}", entry.author)?;
            writeln!(
                writer,
                "Date:   {}",
                entry.author.timestamp.format("%a %b %-d %H:%M:%S %Y %z")
            )?;
            writeln!(writer)?;
            for line in entry.message.lines() {
                if line.is_empty() {
                    writeln!(writer)?;
                } else {
                    writeln!(writer, "    {line}")?;
                }
            }
            if position + 1 < entries.len() {
                writeln!(writer)?;
            }
        }

        Ok(())
    }
}
