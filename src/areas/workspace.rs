//! Working tree access
//!
//! The worktree belongs to the user: the core only reads it (add, status)
//! or overwrites paths it has decided to materialize (checkout, hard
//! reset). All paths exchanged with callers are forward-slash relative.

use crate::artifacts::ignore::IgnoreRules;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::artifacts::objects::entry_mode::EntryMode;
use anyhow::{Context, Result};
use bytes::Bytes;
use derive_new::new;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, new)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// Relative forward-slash form of an absolute path inside the worktree
    pub fn relativize(&self, absolute: &Path) -> Result<String> {
        let relative = absolute
            .strip_prefix(&self.path)
            .with_context(|| format!("{} is outside the worktree", absolute.display()))?;
        Ok(relative.to_string_lossy().replace('\\', "/"))
    }

    /// List files under `start` (or the whole worktree), skipping `.git`,
    /// ignored paths, and hidden files other than `.gitignore`.
    pub fn list_files(&self, start: Option<&Path>, ignore: &IgnoreRules) -> Vec<String> {
        let root = start.unwrap_or(&self.path);
        let mut files = Vec::new();

        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_dir() {
                if name == ".git" {
                    return false;
                }
                if let Ok(relative) = self.relativize(entry.path()) {
                    if !relative.is_empty() && ignore.is_ignored(&relative, true) {
                        return false;
                    }
                }
            }
            true
        });

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') && name != ".gitignore" {
                continue;
            }
            let Ok(relative) = self.relativize(entry.path()) else {
                continue;
            };
            if ignore.is_ignored(&relative, false) {
                continue;
            }
            files.push(relative);
        }

        files.sort();
        files
    }

    pub fn read_file(&self, relative: &str) -> Result<Bytes> {
        let path = self.absolute(relative);
        let content =
            std::fs::read(&path).with_context(|| format!("unable to read {}", path.display()))?;
        Ok(Bytes::from(content))
    }

    pub fn stat_file(&self, relative: &str) -> Result<EntryMetadata> {
        let path = self.absolute(relative);
        let metadata = std::fs::metadata(&path)
            .with_context(|| format!("unable to stat {}", path.display()))?;
        Ok(EntryMetadata::from_fs(&path, &metadata))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.absolute(relative).is_file()
    }

    /// Write file content with the permissions implied by its mode
    pub fn write_file(&self, relative: &str, content: &[u8], mode: EntryMode) -> Result<()> {
        let path = self.absolute(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("unable to create {}", parent.display()))?;
        }
        std::fs::write(&path, content)
            .with_context(|| format!("unable to write {}", path.display()))?;

        let unix_mode = match mode {
            EntryMode::Executable => 0o755,
            _ => 0o644,
        };
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(unix_mode))
            .with_context(|| format!("unable to set permissions on {}", path.display()))?;
        Ok(())
    }

    /// Remove a file and any directories the removal leaves empty
    pub fn remove_file(&self, relative: &str) -> Result<()> {
        let path = self.absolute(relative);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("unable to remove {}", path.display()))
            }
        }

        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir == &*self.path {
                break;
            }
            if dir.read_dir().map(|mut d| d.next().is_some()).unwrap_or(true) {
                break;
            }
            if std::fs::remove_dir(dir).is_err() {
                break;
            }
            parent = dir.parent();
        }

        Ok(())
    }
}
