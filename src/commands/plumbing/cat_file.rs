use crate::areas::repository::Repository;
use crate::artifacts::history::revision;
use crate::artifacts::objects::object::ObjectKind;
use anyhow::{Context, Result};
use std::io::Write;

impl Repository {
    /// Pretty-print an object's content by hash or prefix
    pub fn cat_file(&mut self, target: &str) -> Result<()> {
        let oid = revision::resolve(self.database(), self.refs(), target)
            .with_context(|| format!("git cat-file {target}"))?;
        let object = self
            .database()
            .load(&oid)
            .with_context(|| format!("git cat-file {oid}"))?;

        let mut writer = self.writer();
        match object {
            ObjectKind::Blob(blob) => {
                writer.write_all(blob.content())?;
            }
            ObjectKind::Tree(tree) => {
                for entry in tree.entries() {
                    let kind = if entry.mode.is_tree() { "tree" } else { "blob" };
                    writeln!(
                        writer,
                        "{:0>6} {kind} {}\t{}",
                        entry.mode.as_octal(),
                        entry.oid,
                        entry.name
                    )?;
                }
            }
            ObjectKind::Commit(commit) => {
                writeln!(writer, "tree {}", commit.tree())?;
                for parent in commit.parents() {
                    writeln!(writer, "parent {parent}")?;
                }
                writeln!(writer, "author {}", commit.author().render())?;
                writeln!(writer, "committer {}", commit.committer().render())?;
                writeln!(writer)?;
                writeln!(writer, "{}", commit.message())?;
            }
            ObjectKind::Tag(payload) => {
                writer.write_all(&payload)?;
            }
        }

        Ok(())
    }
}
