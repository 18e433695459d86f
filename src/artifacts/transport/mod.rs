//! Transports carrying the pack protocol
//!
//! Two implementations share one narrow contract: smart HTTP(S) and SSH
//! (exec of `git-upload-pack` / `git-receive-pack` on the remote host).
//! Callers supply an opaque authentication bundle; the core never
//! prompts. Every operation runs under the command's deadline.

pub mod http;
pub mod ssh;

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::protocol::advertisement::RefAdvertisement;
use crate::artifacts::protocol::request::RefUpdate;
use crate::errors::GitError;
use anyhow::Result;
use std::time::{Duration, Instant};

/// Opaque credential bundle populated by the caller
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub ssh_key: Option<std::path::PathBuf>,
}

impl AuthConfig {
    /// Populate from the conventional environment variables
    pub fn from_env() -> Self {
        let token = std::env::var("GITHUB_TOKEN")
            .or_else(|_| std::env::var("GITLAB_TOKEN"))
            .ok();

        AuthConfig {
            username: std::env::var("GIT_USERNAME").ok(),
            password: std::env::var("GIT_PASSWORD").ok(),
            token,
            ssh_key: std::env::var("GIT_SSH_KEY").ok().map(Into::into),
        }
    }
}

/// Absolute cutoff for a network command
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    cutoff: Instant,
}

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Deadline {
            cutoff: Instant::now() + duration,
        }
    }

    /// Time left, or `Timeout` once the cutoff has passed
    pub fn remaining(&self) -> Result<Duration, GitError> {
        self.cutoff
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
            .ok_or(GitError::Timeout)
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_err()
    }
}

/// The wire operations fetch and push are built from
pub trait Transport: std::fmt::Debug {
    /// Read the server's ref advertisement
    fn list_refs(&mut self, deadline: &Deadline) -> Result<RefAdvertisement>;

    /// Run want/have negotiation and return the raw protocol response
    /// (side-band framed pack stream)
    fn fetch_pack(
        &mut self,
        wants: &[ObjectId],
        haves: &[ObjectId],
        deadline: &Deadline,
    ) -> Result<Vec<u8>>;

    /// Send ref update commands plus a pack, returning the status report
    fn send_pack(
        &mut self,
        updates: &[RefUpdate],
        pack: &[u8],
        deadline: &Deadline,
    ) -> Result<Vec<u8>>;
}

/// Construct the transport matching a URL's scheme
pub fn create(url: &str, auth: &AuthConfig) -> Result<Box<dyn Transport>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(Box::new(http::HttpTransport::new(url, auth)?));
    }
    if url.starts_with("ssh://") || is_scp_like(url) {
        return Ok(Box::new(ssh::SshTransport::new(url, auth)?));
    }
    if url.starts_with("git://") {
        return Err(GitError::UnsupportedProtocol(url.to_string()).into());
    }
    Err(GitError::InvalidUrl(url.to_string()).into())
}

/// `git@host:path` style URLs
fn is_scp_like(url: &str) -> bool {
    !url.contains("://") && url.contains('@') && url.contains(':')
}
