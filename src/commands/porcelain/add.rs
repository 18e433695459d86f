use crate::areas::repository::Repository;
use crate::artifacts::ignore::IgnoreRules;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::blob::Blob;
use crate::errors::GitError;
use anyhow::{Context, Result};
use std::path::Path;

impl Repository {
    /// Stage the given pathspecs: hash each file into a blob, store it,
    /// and upsert the index entry. Ignored paths are skipped.
    pub fn add(&mut self, pathspecs: &[String]) -> Result<()> {
        if !self.exists() {
            return Err(GitError::NotARepository.into());
        }

        let ignore = IgnoreRules::load(self.workspace().path())?;
        let mut index = self.index();
        index.load().context("git add: unable to load index")?;

        for pathspec in pathspecs {
            let files = if pathspec == "." {
                self.workspace().list_files(None, &ignore)
            } else {
                let absolute = self.workspace().absolute(pathspec);
                if absolute.is_dir() {
                    self.workspace().list_files(Some(&absolute), &ignore)
                } else if absolute.is_file() {
                    self.collect_single_file(pathspec, &ignore)?
                } else {
                    return Err(GitError::FileNotStaged(pathspec.clone())).with_context(|| {
                        format!("git add {pathspec}: pathspec did not match any files")
                    });
                }
            };

            for path in files {
                let content = self.workspace().read_file(&path)?;
                let stat = self.workspace().stat_file(&path)?;

                let blob = Blob::new(content);
                let oid = self.database().store(&blob)?;
                index.add(IndexEntry::new(path, oid, stat))?;
            }
        }

        index.save().context("git add: unable to save index")
    }

    fn collect_single_file(&self, pathspec: &str, ignore: &IgnoreRules) -> Result<Vec<String>> {
        let relative = if Path::new(pathspec).is_absolute() {
            self.workspace().relativize(Path::new(pathspec))?
        } else {
            pathspec.trim_start_matches("./").to_string()
        };

        if ignore.is_ignored(&relative, false) {
            return Ok(Vec::new());
        }
        Ok(vec![relative])
    }
}
