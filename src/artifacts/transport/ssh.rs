//! SSH transport
//!
//! Executes the system `ssh` client with `git-upload-pack '<path>'` or
//! `git-receive-pack '<path>'` as the remote command and speaks the wire
//! protocol over the child's stdio. Key selection is delegated to the
//! ssh client (agent first, then default key files); a configured key
//! path is passed through with `-i`. URL forms accepted:
//! `git@host:path` and `ssh://[user@]host[:port]/path`.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::protocol::advertisement::RefAdvertisement;
use crate::artifacts::protocol::pkt_line::{Packet, PktReader, FLUSH};
use crate::artifacts::protocol::request::{self, RefUpdate};
use crate::artifacts::transport::{AuthConfig, Deadline, Transport};
use crate::errors::GitError;
use anyhow::{Context, Result};
use log::debug;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

const DEFAULT_USER: &str = "git";
const DEFAULT_PORT: u16 = 22;

#[derive(Debug)]
pub struct SshTransport {
    user: String,
    host: String,
    port: u16,
    repo_path: String,
    key_path: Option<PathBuf>,
}

impl SshTransport {
    pub fn new(url: &str, auth: &AuthConfig) -> Result<Self> {
        let (user, host, port, repo_path) = parse_ssh_url(url)?;
        Ok(SshTransport {
            user,
            host,
            port,
            repo_path,
            key_path: auth.ssh_key.clone(),
        })
    }

    fn spawn(&self, service: &str) -> Result<Child> {
        let mut command = Command::new("ssh");
        command
            .arg("-p")
            .arg(self.port.to_string())
            .arg("-o")
            .arg("BatchMode=yes");
        if let Some(key_path) = &self.key_path {
            command.arg("-i").arg(key_path);
        }
        command
            .arg(format!("{}@{}", self.user, self.host))
            .arg(format!("{service} '{}'", self.repo_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        debug!("spawning ssh for {service} on {}:{}", self.host, self.port);
        command
            .spawn()
            .with_context(|| format!("unable to spawn ssh for {service}"))
    }

    /// Read the ref advertisement the service prints on connect: every
    /// packet-line up to the first flush.
    fn read_advertisement(child: &mut Child, deadline: &Deadline) -> Result<Vec<u8>> {
        let stdout = child.stdout.as_mut().expect("stdout is piped");
        let mut buffer = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            deadline.remaining()?;
            match stdout.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => buffer.push(byte[0]),
                Err(err) => return Err(err).context("reading ssh advertisement"),
            }

            if buffer.ends_with(FLUSH.as_bytes()) && advertisement_complete(&buffer) {
                break;
            }
        }

        Ok(buffer)
    }

    fn read_to_end(child: &mut Child, deadline: &Deadline) -> Result<Vec<u8>> {
        let stdout = child.stdout.as_mut().expect("stdout is piped");
        let mut body = Vec::new();
        let mut chunk = [0u8; 64 * 1024];

        loop {
            if deadline.expired() {
                let _ = child.kill();
                return Err(GitError::Timeout.into());
            }
            match stdout.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => body.extend_from_slice(&chunk[..read]),
                Err(err) => return Err(err).context("reading ssh response"),
            }
        }

        Ok(body)
    }

    fn finish(mut child: Child) -> Result<()> {
        let status = child.wait().context("waiting for ssh")?;
        if !status.success() {
            return Err(GitError::AuthenticationFailed).context(format!(
                "ssh exited with {}",
                status.code().map_or("signal".to_string(), |c| c.to_string())
            ));
        }
        Ok(())
    }
}

/// The advertisement ends at a flush that terminates well-formed frames,
/// not four literal zeros inside a frame payload.
fn advertisement_complete(buffer: &[u8]) -> bool {
    let mut reader = PktReader::new(buffer);
    loop {
        match reader.next_packet() {
            Ok(Some(Packet::Flush)) => return reader.is_empty(),
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => return false,
        }
    }
}

fn parse_ssh_url(url: &str) -> Result<(String, String, u16, String)> {
    if let Some(rest) = url.strip_prefix("ssh://") {
        let (user, rest) = match rest.split_once('@') {
            Some((user, rest)) => (user.to_string(), rest),
            None => (DEFAULT_USER.to_string(), rest),
        };
        let (host_port, path) = rest
            .split_once('/')
            .ok_or_else(|| GitError::InvalidUrl(url.to_string()))?;
        let (host, port) = match host_port.split_once(':') {
            Some((host, port)) => (
                host.to_string(),
                port.parse()
                    .map_err(|_| GitError::InvalidUrl(url.to_string()))?,
            ),
            None => (host_port.to_string(), DEFAULT_PORT),
        };
        if host.is_empty() || path.is_empty() {
            return Err(GitError::InvalidUrl(url.to_string()).into());
        }
        return Ok((user, host, port, path.to_string()));
    }

    // scp-like: git@host:path
    let (user, rest) = url
        .split_once('@')
        .ok_or_else(|| GitError::InvalidUrl(url.to_string()))?;
    let (host, path) = rest
        .split_once(':')
        .ok_or_else(|| GitError::InvalidUrl(url.to_string()))?;
    if user.is_empty() || host.is_empty() || path.is_empty() {
        return Err(GitError::InvalidUrl(url.to_string()).into());
    }
    Ok((
        user.to_string(),
        host.to_string(),
        DEFAULT_PORT,
        path.to_string(),
    ))
}

impl Transport for SshTransport {
    fn list_refs(&mut self, deadline: &Deadline) -> Result<RefAdvertisement> {
        let mut child = self.spawn("git-upload-pack")?;
        let advertisement = Self::read_advertisement(&mut child, deadline)?;

        // terminate the session without requesting objects
        if let Some(stdin) = child.stdin.as_mut() {
            let _ = stdin.write_all(FLUSH.as_bytes());
        }
        drop(child.stdin.take());
        let _ = child.wait();

        RefAdvertisement::parse(&advertisement).context("malformed ref advertisement")
    }

    fn fetch_pack(
        &mut self,
        wants: &[ObjectId],
        haves: &[ObjectId],
        deadline: &Deadline,
    ) -> Result<Vec<u8>> {
        let mut child = self.spawn("git-upload-pack")?;
        Self::read_advertisement(&mut child, deadline)?;

        {
            let stdin = child.stdin.as_mut().expect("stdin is piped");
            stdin
                .write_all(&request::build_fetch_request(wants, haves))
                .context("sending fetch request")?;
        }
        drop(child.stdin.take());

        let body = Self::read_to_end(&mut child, deadline)?;
        Self::finish(child)?;
        Ok(body)
    }

    fn send_pack(
        &mut self,
        updates: &[RefUpdate],
        pack: &[u8],
        deadline: &Deadline,
    ) -> Result<Vec<u8>> {
        let mut child = self.spawn("git-receive-pack")?;
        Self::read_advertisement(&mut child, deadline)?;

        {
            let stdin = child.stdin.as_mut().expect("stdin is piped");
            stdin
                .write_all(&request::build_push_request(updates))
                .context("sending ref updates")?;
            stdin.write_all(pack).context("sending pack data")?;
        }
        drop(child.stdin.take());

        let body = Self::read_to_end(&mut child, deadline)?;
        Self::finish(child)?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_scp_like_urls() {
        let (user, host, port, path) = parse_ssh_url("git@github.com:user/repo.git").unwrap();
        assert_eq!(user, "git");
        assert_eq!(host, "github.com");
        assert_eq!(port, 22);
        assert_eq!(path, "user/repo.git");
    }

    #[test]
    fn parses_ssh_scheme_urls() {
        let (user, host, port, path) =
            parse_ssh_url("ssh://deploy@host.example:2222/srv/repo.git").unwrap();
        assert_eq!(user, "deploy");
        assert_eq!(host, "host.example");
        assert_eq!(port, 2222);
        assert_eq!(path, "srv/repo.git");
    }

    #[test]
    fn ssh_scheme_defaults_user_and_port() {
        let (user, host, port, path) = parse_ssh_url("ssh://host/repo.git").unwrap();
        assert_eq!(user, "git");
        assert_eq!(host, "host");
        assert_eq!(port, 22);
        assert_eq!(path, "repo.git");
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(parse_ssh_url("ssh://host-only").is_err());
        assert!(parse_ssh_url("no-at-or-colon").is_err());
        assert!(parse_ssh_url("ssh://host:notaport/x").is_err());
    }

    #[test]
    fn advertisement_end_detection() {
        use crate::artifacts::protocol::pkt_line::encode;
        let mut buffer = Vec::new();
        buffer.extend_from_slice(encode("00aa refs/heads/x\n").as_bytes());
        assert!(!advertisement_complete(&buffer));
        buffer.extend_from_slice(FLUSH.as_bytes());
        assert!(advertisement_complete(&buffer));
    }
}
