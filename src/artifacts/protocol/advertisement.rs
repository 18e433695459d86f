//! Reference advertisement parsing
//!
//! Discovery responses carry a sequence of packet-lines. The optional
//! `# service=` announcement comes first, then ref lines of the form
//! `<hash> <refname>`, the first of which appends a NUL and the server's
//! capability list (including `symref=HEAD:refs/heads/<name>`).

use crate::artifacts::objects::object_id::{validate_hash, ObjectId};
use crate::artifacts::protocol::pkt_line::{Packet, PktReader};
use anyhow::Result;
use std::collections::BTreeMap;

/// Branch names tried, in order, when the server does not say which
/// branch HEAD points at.
const PREFERRED_BRANCHES: [&str; 4] = ["main", "master", "develop", "trunk"];

#[derive(Debug, Default, Clone)]
pub struct RefAdvertisement {
    pub refs: BTreeMap<String, ObjectId>,
    pub capabilities: Vec<String>,
    /// Branch refname from a `symref=HEAD:<refname>` capability
    pub symref_head: Option<String>,
}

impl RefAdvertisement {
    pub fn parse(response: &[u8]) -> Result<Self> {
        let mut advertisement = RefAdvertisement::default();
        let mut reader = PktReader::new(response);
        let mut first_ref_seen = false;

        while let Some(packet) = reader.next_packet()? {
            let payload = match packet {
                Packet::Flush => continue,
                Packet::Data(payload) => payload,
            };

            if payload.starts_with(b"# service=") {
                continue;
            }

            let (line, capabilities) = match payload.iter().position(|&b| b == 0) {
                Some(nul) => (&payload[..nul], Some(&payload[nul + 1..])),
                None => (payload, None),
            };

            if let Some(capabilities) = capabilities {
                if !first_ref_seen {
                    advertisement.read_capabilities(capabilities);
                }
            }
            first_ref_seen = true;

            let line = String::from_utf8_lossy(line);
            let line = line.trim_end_matches('\n');
            let Some((hash, refname)) = line.split_once(' ') else {
                continue;
            };
            if !validate_hash(hash) {
                continue;
            }

            advertisement
                .refs
                .insert(refname.trim().to_string(), ObjectId::try_parse(hash)?);
        }

        Ok(advertisement)
    }

    fn read_capabilities(&mut self, capabilities: &[u8]) {
        let capabilities = String::from_utf8_lossy(capabilities);
        for capability in capabilities.trim_end().split(' ') {
            if let Some(target) = capability.strip_prefix("symref=HEAD:") {
                self.symref_head = Some(target.to_string());
            }
            self.capabilities.push(capability.to_string());
        }
    }

    pub fn head(&self) -> Option<&ObjectId> {
        self.refs.get("HEAD")
    }

    pub fn branch_tip(&self, branch: &str) -> Option<&ObjectId> {
        self.refs.get(&format!("refs/heads/{branch}"))
    }

    pub fn branches(&self) -> impl Iterator<Item = (&str, &ObjectId)> {
        self.refs.iter().filter_map(|(refname, oid)| {
            refname
                .strip_prefix("refs/heads/")
                .map(|branch| (branch, oid))
        })
    }

    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Decide which branch a clone should check out.
    ///
    /// Preference order: the caller's explicit choice, the `symref=HEAD`
    /// capability, a branch whose tip equals HEAD's hash, the common
    /// default names, then any branch at all.
    pub fn default_branch(&self, preferred: Option<&str>) -> Option<String> {
        if let Some(preferred) = preferred {
            return self
                .branch_tip(preferred)
                .map(|_| preferred.to_string());
        }

        if let Some(symref) = &self.symref_head {
            if let Some(branch) = symref.strip_prefix("refs/heads/") {
                return Some(branch.to_string());
            }
        }

        if let Some(head_oid) = self.head() {
            if let Some((branch, _)) = self.branches().find(|(_, oid)| *oid == head_oid) {
                return Some(branch.to_string());
            }
        }

        for candidate in PREFERRED_BRANCHES {
            if self.branch_tip(candidate).is_some() {
                return Some(candidate.to_string());
            }
        }

        self.branches().next().map(|(branch, _)| branch.to_string())
    }
}
