//! Error taxonomy shared by every subsystem
//!
//! Each variant names the failure kind; commands attach the operation and
//! the affected path or hash via `anyhow::Context` so the surfaced message
//! reads `git <op> <path-or-hash>: <kind>: <detail>`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    // repository
    #[error("not a git repository")]
    NotARepository,
    #[error("repository already exists")]
    RepositoryExists,
    #[error("corrupted repository")]
    Corrupted,

    // hashing / identity
    #[error("invalid hash '{0}'")]
    InvalidHash(String),
    #[error("invalid object type '{0}'")]
    InvalidObjectType(String),
    #[error("invalid object format")]
    InvalidObjectFormat,

    // objects
    #[error("object {0} not found")]
    ObjectNotFound(String),
    #[error("invalid blob object")]
    InvalidBlob,
    #[error("invalid tree object")]
    InvalidTree,
    #[error("invalid commit object")]
    InvalidCommit,

    // index
    #[error("invalid index file")]
    IndexInvalid,
    #[error("nothing to commit")]
    NothingToCommit,
    #[error("file '{0}' not staged")]
    FileNotStaged(String),
    #[error("file '{0}' already staged")]
    FileAlreadyStaged(String),

    // refs
    #[error("invalid reference '{0}'")]
    InvalidReference(String),
    #[error("reference '{0}' not found")]
    ReferenceNotFound(String),

    // pack / delta
    #[error("invalid pack header")]
    InvalidPackHeader,
    #[error("unsupported pack version {0}")]
    UnsupportedPackVersion(u32),
    #[error("invalid delta: {0}")]
    InvalidDelta(String),
    #[error("missing or circular delta dependencies")]
    MissingOrCircularDelta,

    // network / protocol
    #[error("invalid url '{0}'")]
    InvalidUrl(String),
    #[error("unsupported protocol for '{0}'")]
    UnsupportedProtocol(String),
    #[error("network timeout")]
    Timeout,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("protocol framing error: {0}")]
    ProtocolFraming(String),

    // push outcomes
    #[error("non-fast-forward")]
    NonFastForward,
    #[error("push rejected: {0}")]
    Rejected(String),
    #[error("everything up-to-date")]
    PushUpToDate,

    // merge
    #[error("refusing to merge unrelated histories")]
    UnrelatedHistories,
    #[error("merge conflict")]
    MergeConflict,

    // remotes
    #[error("remote '{0}' not found")]
    RemoteNotFound(String),
    #[error("remote '{0}' already exists")]
    RemoteAlreadyExists(String),
}
