use crate::areas::repository::Repository;
use crate::artifacts::history::merge_base;
use crate::artifacts::objects::commit::{Commit, Signature};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::pack::processor::PackProcessor;
use crate::artifacts::protocol::advertisement::RefAdvertisement;
use crate::artifacts::remote::RemoteConfig;
use crate::artifacts::transport::{self, AuthConfig, Deadline};
use crate::errors::GitError;
use anyhow::{Context, Result};
use std::io::Write;
use std::time::Duration;

const PULL_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub ff_only: bool,
    pub rebase: bool,
}

impl Repository {
    /// Fetch the remote branch and integrate it: fast-forward when legal,
    /// otherwise adopt the local tree under a merge commit.
    pub fn pull(&mut self, options: PullOptions) -> Result<()> {
        if !self.exists() {
            return Err(GitError::NotARepository.into());
        }
        if options.rebase {
            anyhow::bail!("git pull --rebase: rebase strategy is not implemented");
        }

        let mut config = RemoteConfig::new(&self.git_path());
        config.load()?;
        let remote = match &options.remote {
            Some(name) => config.get(name).context("git pull")?.clone(),
            None => config.default_remote().context("git pull")?.clone(),
        };

        let branch = match &options.branch {
            Some(branch) => branch.clone(),
            None => self
                .refs()
                .current_branch()?
                .ok_or(GitError::InvalidReference("HEAD".to_string()))
                .context("git pull: HEAD is detached")?,
        };

        let auth = AuthConfig::from_env();
        let mut transport = transport::create(&remote.fetch_url, &auth)
            .with_context(|| format!("git pull {}", remote.name))?;
        let deadline = Deadline::after(PULL_TIMEOUT);

        let advertisement = transport
            .list_refs(&deadline)
            .with_context(|| format!("git pull {}", remote.name))?;
        let remote_tip = advertisement
            .branch_tip(&branch)
            .cloned()
            .ok_or_else(|| GitError::ReferenceNotFound(format!("refs/heads/{branch}")))
            .with_context(|| format!("git pull: remote branch '{branch}' not found"))?;

        let local_tip = self.refs().read_head()?;

        if local_tip.as_ref() == Some(&remote_tip) {
            writeln!(self.writer(), "Already up to date.")?;
            return Ok(());
        }

        // fetch whatever the remote tip needs beyond our history
        let haves: Vec<_> = local_tip.clone().into_iter().collect();
        let response = transport
            .fetch_pack(&[remote_tip.clone()], &haves, &deadline)
            .with_context(|| format!("git pull {}", remote.name))?;
        let summary = PackProcessor::new(self.database())
            .process(&response)
            .context("git pull: pack processing failed")?;
        writeln!(
            self.writer(),
            "Received {} objects ({} deltas)",
            summary.object_count,
            summary.delta_count
        )?;

        self.track_remote_branches(&remote.name, &advertisement)?;

        let Some(local_tip) = local_tip else {
            // unborn branch: adopt the remote tip outright
            self.refs()
                .update_ref(&format!("refs/heads/{branch}"), &remote_tip)?;
            self.checkout_commit(&remote_tip)?;
            writeln!(self.writer(), "Fast-forward to {}", remote_tip.short(7))?;
            return Ok(());
        };

        let base = merge_base::merge_base(self.database(), &local_tip, &remote_tip);

        if base.as_ref() == Some(&local_tip) {
            self.refs().update_head(&remote_tip)?;
            self.checkout_commit(&remote_tip)?;
            writeln!(
                self.writer(),
                "Updating {}..{}\nFast-forward",
                local_tip.short(7),
                remote_tip.short(7)
            )?;
            return Ok(());
        }

        if base.as_ref() == Some(&remote_tip) {
            writeln!(self.writer(), "Already up to date.")?;
            return Ok(());
        }

        if options.ff_only {
            return Err(GitError::NonFastForward)
                .context("git pull --ff-only: branches have diverged");
        }

        if base.is_none() {
            return Err(GitError::UnrelatedHistories).context("git pull");
        }

        self.merge_remote(&branch, &local_tip, &remote_tip)
    }

    fn track_remote_branches(
        &self,
        remote_name: &str,
        advertisement: &RefAdvertisement,
    ) -> Result<()> {
        for (branch, oid) in advertisement.branches() {
            self.refs().update_remote_ref(remote_name, branch, oid)?;
        }
        Ok(())
    }

    fn checkout_commit(&self, commit_oid: &ObjectId) -> Result<()> {
        let commit = self.database().load_commit(commit_oid)?;
        let mut index = self.index();
        index.load()?;
        index.clear();
        self.materialize_tree(commit.tree(), &mut index, true)?;
        index.save()
    }

    /// Divergent histories: record both parents under a merge commit
    /// that keeps the local tree (no content-level merge is attempted).
    fn merge_remote(
        &mut self,
        branch: &str,
        local_tip: &ObjectId,
        remote_tip: &ObjectId,
    ) -> Result<()> {
        let local_commit = self.database().load_commit(local_tip)?;
        let signature = Signature::resolve(None, None);

        let merge = Commit::new(
            local_commit.tree().clone(),
            vec![local_tip.clone(), remote_tip.clone()],
            signature.clone(),
            signature,
            format!("Merge remote-tracking branch 'origin/{branch}' into {branch}"),
        );
        let merge_oid = self.database().store(&merge)?;
        self.refs().update_head(&merge_oid)?;
        self.checkout_commit(&merge_oid)?;

        writeln!(
            self.writer(),
            "Merge made commit {} ({} + {})",
            merge_oid.short(7),
            local_tip.short(7),
            remote_tip.short(7)
        )?;
        Ok(())
    }
}
