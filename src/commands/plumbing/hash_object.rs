use crate::areas::repository::Repository;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::Object;
use anyhow::{Context, Result};
use std::io::Write;

impl Repository {
    /// Hash a file as a blob, optionally writing it to the store
    pub fn hash_object(&mut self, file: &str, write: bool) -> Result<()> {
        let content = std::fs::read(file)
            .with_context(|| format!("git hash-object {file}"))?;
        let blob = Blob::from_slice(&content);

        let oid = if write {
            self.database().store(&blob)?
        } else {
            blob.object_id()?
        };

        writeln!(self.writer(), "{oid}")?;
        Ok(())
    }
}
