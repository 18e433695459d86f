//! Command implementations
//!
//! `porcelain` holds the user-facing workflows (init, add, commit,
//! status, log, diff, blame, reset, remote, clone, pull, push);
//! `plumbing` holds low-level object inspection (cat-file, hash-object).
//! Commands are `impl Repository` blocks writing through the injected
//! writer; `clone` stands alone because it creates the repository.

pub mod plumbing;
pub mod porcelain;
