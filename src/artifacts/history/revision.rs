//! Revision target resolution
//!
//! Resolution order: empty or `HEAD` resolves to the current HEAD; an
//! exact 40-hex string names itself; a unique loose-object prefix of at
//! least 4 characters expands; `refs/heads/<name>` resolves a branch;
//! anything else is an error.

use crate::areas::database::Database;
use crate::areas::refs::Refs;
use crate::artifacts::objects::object_id::{validate_hash, ObjectId};
use crate::errors::GitError;
use anyhow::{anyhow, Result};

const MIN_PREFIX_LEN: usize = 4;

pub fn resolve(database: &Database, refs: &Refs, target: &str) -> Result<ObjectId> {
    if target.is_empty() || target == "HEAD" {
        return refs
            .read_head()?
            .ok_or_else(|| GitError::ReferenceNotFound("HEAD".to_string()).into());
    }

    if validate_hash(target) {
        return Ok(ObjectId::try_parse(target)?);
    }

    if target.len() >= MIN_PREFIX_LEN
        && target.len() < 40
        && target.chars().all(|c| c.is_ascii_hexdigit())
    {
        let matches = database.find_by_prefix(target)?;
        match matches.len() {
            1 => return Ok(matches.into_iter().next().unwrap()),
            0 => {}
            _ => {
                return Err(anyhow!(GitError::InvalidReference(target.to_string()))
                    .context(format!("short hash '{target}' is ambiguous")))
            }
        }
    }

    if let Some(oid) = refs.read_ref(&format!("refs/heads/{target}"))? {
        return Ok(oid);
    }

    Err(anyhow!(GitError::InvalidReference(target.to_string()))
        .context(format!("unable to resolve target '{target}'")))
}
