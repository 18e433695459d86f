//! Remote definitions in `.git/config`
//!
//! Parses and rewrites the `[remote "<name>"]` sections of the INI-style
//! config, supplying the `name -> (fetch_url, push_url)` mapping the
//! transport layer consumes. Sections this module does not own (for
//! example `[branch "<name>"]` upstream records) are preserved verbatim.

use crate::errors::GitError;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub name: String,
    pub url: String,
    pub fetch_url: String,
    pub push_url: String,
}

impl Remote {
    fn new(name: &str, url: &str) -> Self {
        Remote {
            name: name.to_string(),
            url: url.to_string(),
            fetch_url: url.to_string(),
            push_url: url.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct RemoteConfig {
    git_path: PathBuf,
    remotes: BTreeMap<String, Remote>,
    /// Config lines outside `[remote]` sections, kept as-is on save
    foreign_lines: Vec<String>,
}

impl RemoteConfig {
    pub fn new(git_path: &Path) -> Self {
        RemoteConfig {
            git_path: git_path.to_path_buf(),
            remotes: BTreeMap::new(),
            foreign_lines: Vec::new(),
        }
    }

    fn config_path(&self) -> PathBuf {
        self.git_path.join(CONFIG_FILE)
    }

    /// Load remotes from `.git/config`; a missing file is empty config
    pub fn load(&mut self) -> Result<()> {
        self.remotes.clear();
        self.foreign_lines.clear();

        let config_path = self.config_path();
        let content = match std::fs::read_to_string(&config_path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("unable to read {}", config_path.display()))
            }
        };

        let mut current: Option<String> = None;
        for raw_line in content.lines() {
            let line = raw_line.trim();

            if line.starts_with('[') {
                if let Some(name) = parse_remote_section(line) {
                    current = Some(name.clone());
                    self.remotes
                        .entry(name.clone())
                        .or_insert_with(|| Remote::new(&name, ""));
                    continue;
                }
                current = None;
                self.foreign_lines.push(raw_line.to_string());
                continue;
            }

            match &current {
                Some(name) => {
                    let Some((key, value)) = line.split_once('=') else {
                        continue;
                    };
                    let key = key.trim();
                    let value = value.trim();
                    let remote = self.remotes.get_mut(name).expect("section was inserted");

                    match key {
                        "url" => {
                            remote.url = value.to_string();
                            if remote.fetch_url.is_empty() {
                                remote.fetch_url = value.to_string();
                            }
                            if remote.push_url.is_empty() {
                                remote.push_url = value.to_string();
                            }
                        }
                        "pushurl" => remote.push_url = value.to_string(),
                        // the +refs fetch refspec is boilerplate we regenerate
                        "fetch" if !value.starts_with('+') => {
                            remote.fetch_url = value.to_string()
                        }
                        _ => {}
                    }
                }
                None => {
                    if !line.is_empty() {
                        self.foreign_lines.push(raw_line.to_string());
                    }
                }
            }
        }

        Ok(())
    }

    /// Rewrite `.git/config` with the current remotes, preserving
    /// sections owned by other subsystems.
    pub fn save(&self) -> Result<()> {
        let mut content = String::new();

        for remote in self.remotes.values() {
            writeln!(content, "[remote \"{}\"]", remote.name)?;
            writeln!(content, "\turl = {}", remote.url)?;
            if remote.fetch_url != remote.url {
                writeln!(content, "\tfetch = {}", remote.fetch_url)?;
            }
            if remote.push_url != remote.url {
                writeln!(content, "\tpushurl = {}", remote.push_url)?;
            }
            writeln!(
                content,
                "\tfetch = +refs/heads/*:refs/remotes/{}/*",
                remote.name
            )?;
        }

        for line in &self.foreign_lines {
            writeln!(content, "{line}")?;
        }

        let config_path = self.config_path();
        std::fs::write(&config_path, content)
            .with_context(|| format!("unable to write {}", config_path.display()))?;
        Ok(())
    }

    pub fn add(&mut self, name: &str, url: &str) -> Result<()> {
        if self.remotes.contains_key(name) {
            return Err(GitError::RemoteAlreadyExists(name.to_string()).into());
        }
        self.remotes.insert(name.to_string(), Remote::new(name, url));
        self.save()
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        if self.remotes.remove(name).is_none() {
            return Err(GitError::RemoteNotFound(name.to_string()).into());
        }
        self.save()
    }

    pub fn get(&self, name: &str) -> Result<&Remote> {
        self.remotes
            .get(name)
            .ok_or_else(|| GitError::RemoteNotFound(name.to_string()).into())
    }

    pub fn list(&self) -> impl Iterator<Item = &Remote> {
        self.remotes.values()
    }

    /// `origin` when configured, otherwise the first remote
    pub fn default_remote(&self) -> Result<&Remote> {
        if let Some(origin) = self.remotes.get("origin") {
            return Ok(origin);
        }
        self.remotes
            .values()
            .next()
            .ok_or_else(|| GitError::RemoteNotFound("origin".to_string()).into())
    }

    /// Append a `[branch]` upstream record (used by push --set-upstream)
    pub fn set_upstream(&self, branch: &str, remote: &str) -> Result<()> {
        let config_path = self.config_path();
        let mut content = std::fs::read_to_string(&config_path).unwrap_or_default();
        content.push_str(&format!(
            "[branch \"{branch}\"]\n\tremote = {remote}\n\tmerge = refs/heads/{branch}\n"
        ));
        std::fs::write(&config_path, content)
            .with_context(|| format!("unable to write {}", config_path.display()))
    }
}

fn parse_remote_section(line: &str) -> Option<String> {
    line.strip_prefix("[remote \"")
        .and_then(|rest| rest.strip_suffix("\"]"))
        .map(|name| name.to_string())
}
