//! Commit object
//!
//! On disk a commit is a header block (`tree`, zero or more `parent`,
//! `author`, `committer`), a blank line, then the free-form message.

use crate::artifacts::objects::object::{object_header, Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::GitError;
use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, TimeZone};
use std::io::Write;

/// Authorship stamp: `Name <email> <unix-seconds> <±HHMM>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl Signature {
    pub fn new(name: String, email: String) -> Self {
        Signature {
            name,
            email,
            timestamp: chrono::Local::now().fixed_offset(),
        }
    }

    pub fn new_with_timestamp(
        name: String,
        email: String,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Signature {
            name,
            email,
            timestamp,
        }
    }

    /// Resolve a signature from explicit values, falling back to
    /// GIT_AUTHOR_NAME / GIT_AUTHOR_EMAIL, then to anonymous defaults.
    pub fn resolve(name: Option<String>, email: Option<String>) -> Self {
        let name = name
            .or_else(|| std::env::var("GIT_AUTHOR_NAME").ok())
            .unwrap_or_else(|| "Unknown".to_string());
        let email = email
            .or_else(|| std::env::var("GIT_AUTHOR_EMAIL").ok())
            .unwrap_or_else(|| "local@localhost".to_string());
        Signature::new(name, email)
    }

    pub fn render(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    pub fn parse(value: &str) -> Result<Self> {
        let (rest, tz_str) = value
            .rsplit_once(' ')
            .ok_or(GitError::InvalidCommit)
            .context("signature missing timezone")?;
        let (rest, ts_str) = rest
            .rsplit_once(' ')
            .ok_or(GitError::InvalidCommit)
            .context("signature missing timestamp")?;

        let seconds: i64 = ts_str.parse().map_err(|_| GitError::InvalidCommit)?;
        let offset = parse_timezone(tz_str)?;
        let timestamp = offset
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or(GitError::InvalidCommit)?;

        let (name, email) = rest
            .split_once(" <")
            .ok_or(GitError::InvalidCommit)
            .context("signature missing email")?;
        let email = email
            .strip_suffix('>')
            .ok_or(GitError::InvalidCommit)
            .context("signature missing closing bracket")?;

        Ok(Signature {
            name: name.to_string(),
            email: email.to_string(),
            timestamp,
        })
    }
}

fn parse_timezone(tz: &str) -> Result<FixedOffset> {
    if tz.len() != 5 {
        return Err(GitError::InvalidCommit.into());
    }
    let sign = match &tz[..1] {
        "+" => 1,
        "-" => -1,
        _ => return Err(GitError::InvalidCommit.into()),
    };
    let hours: i32 = tz[1..3].parse().map_err(|_| GitError::InvalidCommit)?;
    let minutes: i32 = tz[3..5].parse().map_err(|_| GitError::InvalidCommit)?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| GitError::InvalidCommit.into())
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Snapshot plus history links, authorship and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    tree: ObjectId,
    parents: Vec<ObjectId>,
    author: Signature,
    committer: Signature,
    message: String,
}

impl Commit {
    pub fn new(
        tree: ObjectId,
        parents: Vec<ObjectId>,
        author: Signature,
        committer: Signature,
        message: String,
    ) -> Self {
        Commit {
            tree,
            parents,
            author,
            committer,
            message,
        }
    }

    pub fn tree(&self) -> &ObjectId {
        &self.tree
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn author(&self) -> &Signature {
        &self.author
    }

    pub fn committer(&self) -> &Signature {
        &self.committer
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn title_line(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

impl Packable for Commit {
    fn serialize(&self) -> Result<Bytes> {
        let payload = self.payload()?;
        let mut bytes = object_header(ObjectType::Commit, payload.len());
        bytes.extend_from_slice(&payload);
        Ok(Bytes::from(bytes))
    }
}

impl Unpackable for Commit {
    fn deserialize(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload).map_err(|_| GitError::InvalidCommit)?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        let mut message_lines = Vec::new();
        let mut in_message = false;

        for line in text.lines() {
            if in_message {
                message_lines.push(line);
                continue;
            }
            if line.is_empty() {
                in_message = true;
                continue;
            }

            let (key, value) = line
                .split_once(' ')
                .ok_or(GitError::InvalidCommit)
                .with_context(|| format!("malformed commit header line '{line}'"))?;

            match key {
                "tree" => tree = Some(ObjectId::try_parse(value)?),
                "parent" => parents.push(ObjectId::try_parse(value)?),
                "author" => author = Some(Signature::parse(value)?),
                "committer" => committer = Some(Signature::parse(value)?),
                // gpgsig and friends are carried by other clients; skip them
                _ => {}
            }
        }

        Ok(Commit {
            tree: tree.ok_or(GitError::InvalidCommit)?,
            parents,
            author: author.ok_or(GitError::InvalidCommit)?,
            committer: committer.ok_or(GitError::InvalidCommit)?,
            message: message_lines.join("\n"),
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn payload(&self) -> Result<Bytes> {
        let mut bytes = Vec::new();
        writeln!(bytes, "tree {}", self.tree)?;
        for parent in &self.parents {
            writeln!(bytes, "parent {parent}")?;
        }
        writeln!(bytes, "author {}", self.author.render())?;
        writeln!(bytes, "committer {}", self.committer.render())?;
        writeln!(bytes)?;
        write!(bytes, "{}", self.message)?;
        Ok(Bytes::from(bytes))
    }
}
