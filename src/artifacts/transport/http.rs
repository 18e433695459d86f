//! Smart HTTP(S) transport
//!
//! Discovery is `GET <base>/info/refs?service=git-upload-pack`; fetch and
//! push POST to `<base>/git-upload-pack` and `<base>/git-receive-pack`
//! with the matching `application/x-git-*-request` content types. Basic
//! auth comes from a token (token as username, `x-oauth-basic` as
//! password) or an explicit username/password pair.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::protocol::advertisement::RefAdvertisement;
use crate::artifacts::protocol::request::{self, RefUpdate};
use crate::artifacts::transport::{AuthConfig, Deadline, Transport};
use crate::errors::GitError;
use anyhow::{Context, Result};
use base64::Engine as _;
use std::io::Read;
use std::time::Duration;

const UPLOAD_PACK_SERVICE: &str = "git-upload-pack";
const RECEIVE_PACK_SERVICE: &str = "git-receive-pack";

#[derive(Debug)]
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    authorization: Option<String>,
}

impl HttpTransport {
    pub fn new(url: &str, auth: &AuthConfig) -> Result<Self> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(GitError::InvalidUrl(url.to_string()).into());
        }

        let authorization = match (&auth.token, &auth.username, &auth.password) {
            (Some(token), _, _) => Some(basic(token, "x-oauth-basic")),
            (None, Some(username), Some(password)) => Some(basic(username, password)),
            _ => None,
        };

        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .build();

        Ok(HttpTransport {
            agent,
            base_url: url.trim_end_matches('/').to_string(),
            authorization,
        })
    }

    fn get(&self, url: &str, deadline: &Deadline) -> Result<Vec<u8>> {
        let mut request = self.agent.get(url).timeout(deadline.remaining()?);
        if let Some(authorization) = &self.authorization {
            request = request.set("Authorization", authorization);
        }
        Self::read_response(request.call(), deadline)
    }

    fn post(
        &self,
        url: &str,
        content_type: &str,
        body: &[u8],
        deadline: &Deadline,
    ) -> Result<Vec<u8>> {
        let mut request = self
            .agent
            .post(url)
            .timeout(deadline.remaining()?)
            .set("Content-Type", content_type);
        if let Some(authorization) = &self.authorization {
            request = request.set("Authorization", authorization);
        }
        Self::read_response(request.send_bytes(body), deadline)
    }

    fn read_response(
        result: Result<ureq::Response, ureq::Error>,
        deadline: &Deadline,
    ) -> Result<Vec<u8>> {
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(401 | 403, _)) => {
                return Err(GitError::AuthenticationFailed.into())
            }
            Err(ureq::Error::Status(code, _)) => return Err(GitError::HttpStatus(code).into()),
            Err(ureq::Error::Transport(transport)) => {
                let message = transport.to_string();
                if message.contains("timed out") || message.contains("timeout") {
                    return Err(GitError::Timeout.into());
                }
                return Err(anyhow::Error::new(transport)).context("transport failure");
            }
        };

        let mut reader = response.into_reader();
        let mut body = Vec::new();
        let mut chunk = [0u8; 64 * 1024];
        loop {
            deadline.remaining()?;
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => body.extend_from_slice(&chunk[..read]),
                Err(err) if err.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(GitError::Timeout.into())
                }
                Err(err) => return Err(err).context("reading response body"),
            }
        }
        Ok(body)
    }
}

fn basic(username: &str, password: &str) -> String {
    let credentials =
        base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {credentials}")
}

impl Transport for HttpTransport {
    fn list_refs(&mut self, deadline: &Deadline) -> Result<RefAdvertisement> {
        let url = format!("{}/info/refs?service={UPLOAD_PACK_SERVICE}", self.base_url);
        let body = self.get(&url, deadline)?;
        RefAdvertisement::parse(&body).context("malformed ref advertisement")
    }

    fn fetch_pack(
        &mut self,
        wants: &[ObjectId],
        haves: &[ObjectId],
        deadline: &Deadline,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/{UPLOAD_PACK_SERVICE}", self.base_url);
        let body = request::build_fetch_request(wants, haves);
        self.post(
            &url,
            "application/x-git-upload-pack-request",
            &body,
            deadline,
        )
    }

    fn send_pack(
        &mut self,
        updates: &[RefUpdate],
        pack: &[u8],
        deadline: &Deadline,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/{RECEIVE_PACK_SERVICE}", self.base_url);
        let mut body = request::build_push_request(updates);
        body.extend_from_slice(pack);
        self.post(
            &url,
            "application/x-git-receive-pack-request",
            &body,
            deadline,
        )
    }
}
