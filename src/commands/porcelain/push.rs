use crate::areas::repository::Repository;
use crate::artifacts::history::merge_base;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::pack::writer as pack_writer;
use crate::artifacts::protocol::request::{self, RefUpdate};
use crate::artifacts::remote::RemoteConfig;
use crate::artifacts::transport::{self, AuthConfig, Deadline};
use crate::errors::GitError;
use anyhow::{Context, Result};
use std::io::Write;
use std::time::Duration;

const PUSH_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub force: bool,
    pub set_upstream: bool,
    pub all: bool,
    pub tags: bool,
    pub dry_run: bool,
}

impl Repository {
    /// Publish local commits to a remote
    pub fn push(&mut self, options: PushOptions) -> Result<()> {
        if !self.exists() {
            return Err(GitError::NotARepository.into());
        }

        let mut config = RemoteConfig::new(&self.git_path());
        config.load()?;
        let remote = match &options.remote {
            Some(name) => config.get(name).context("git push")?.clone(),
            None => config.default_remote().context("git push")?.clone(),
        };

        let auth = AuthConfig::from_env();
        let mut transport = transport::create(&remote.push_url, &auth)
            .with_context(|| format!("git push {}", remote.name))?;
        let deadline = Deadline::after(PUSH_TIMEOUT);

        let advertisement = transport
            .list_refs(&deadline)
            .with_context(|| format!("git push {}", remote.name))?;

        let branches: Vec<String> = if options.all {
            self.refs().list_branches()?
        } else {
            let branch = match &options.branch {
                Some(branch) => branch.clone(),
                None => self
                    .refs()
                    .current_branch()?
                    .ok_or(GitError::InvalidReference("HEAD".to_string()))
                    .context("git push: HEAD is detached")?,
            };
            vec![branch]
        };

        for branch in &branches {
            self.push_branch(
                &mut *transport,
                &deadline,
                &remote.name,
                branch,
                &advertisement.refs,
                &options,
            )
            .with_context(|| format!("git push {} {branch}", remote.name))?;
        }

        if options.tags {
            self.push_tags(&mut *transport, &deadline, &advertisement.refs, &options)
                .with_context(|| format!("git push {} --tags", remote.name))?;
        }

        if options.set_upstream {
            for branch in &branches {
                config.set_upstream(branch, &remote.name)?;
                writeln!(
                    self.writer(),
                    "Branch '{branch}' set up to track remote branch '{branch}' from '{}'.",
                    remote.name
                )?;
            }
        }

        Ok(())
    }

    fn push_branch(
        &self,
        transport: &mut dyn transport::Transport,
        deadline: &Deadline,
        remote_name: &str,
        branch: &str,
        remote_refs: &std::collections::BTreeMap<String, ObjectId>,
        options: &PushOptions,
    ) -> Result<()> {
        let local_tip = self
            .refs()
            .read_ref(&format!("refs/heads/{branch}"))?
            .ok_or_else(|| GitError::ReferenceNotFound(format!("refs/heads/{branch}")))
            .context("no commits to push")?;

        let refname = format!("refs/heads/{branch}");
        let remote_tip = remote_refs.get(&refname).cloned();

        if remote_tip.as_ref() == Some(&local_tip) {
            writeln!(self.writer(), "Everything up-to-date")?;
            return Ok(());
        }

        if let Some(remote_tip) = &remote_tip {
            if !options.force
                && !merge_base::can_fast_forward(self.database(), remote_tip, &local_tip)
            {
                return Err(GitError::NonFastForward).context(
                    "updates were rejected because the remote contains work you do not have",
                );
            }
        }

        if options.dry_run {
            writeln!(
                self.writer(),
                "Would push {} -> {refname} ({})",
                local_tip.short(7),
                describe_update(&remote_tip, options.force)
            )?;
            return Ok(());
        }

        let objects =
            pack_writer::select_for_push(self.database(), &local_tip, remote_tip.as_ref())?;
        let pack = pack_writer::write_pack(self.database(), &objects)?;

        let updates = [RefUpdate {
            refname: refname.clone(),
            old: remote_tip.clone(),
            new: Some(local_tip.clone()),
        }];

        writeln!(
            self.writer(),
            "Pushing {} objects ({} bytes) to {refname}",
            objects.len(),
            pack.len()
        )?;

        let report = transport.send_pack(&updates, &pack, deadline)?;
        request::parse_receive_report(&report)?;

        self.refs()
            .update_remote_ref(remote_name, branch, &local_tip)?;

        match remote_tip {
            None => writeln!(self.writer(), " * [new branch]      {branch} -> {branch}")?,
            Some(old) => writeln!(
                self.writer(),
                "   {}..{}  {branch} -> {branch}",
                old.short(7),
                local_tip.short(7)
            )?,
        }

        Ok(())
    }

    fn push_tags(
        &self,
        transport: &mut dyn transport::Transport,
        deadline: &Deadline,
        remote_refs: &std::collections::BTreeMap<String, ObjectId>,
        options: &PushOptions,
    ) -> Result<()> {
        for (tag, oid) in self.refs().tag_targets()? {
            let refname = format!("refs/tags/{tag}");
            if remote_refs.get(&refname) == Some(&oid) {
                continue;
            }
            if options.dry_run {
                writeln!(self.writer(), "Would push tag {tag}")?;
                continue;
            }

            let objects = pack_writer::select_for_push(self.database(), &oid, None)?;
            let pack = pack_writer::write_pack(self.database(), &objects)?;
            let updates = [RefUpdate {
                refname: refname.clone(),
                old: remote_refs.get(&refname).cloned(),
                new: Some(oid.clone()),
            }];

            let report = transport.send_pack(&updates, &pack, deadline)?;
            request::parse_receive_report(&report)?;
            writeln!(self.writer(), " * [new tag]         {tag} -> {tag}")?;
        }

        Ok(())
    }
}

fn describe_update(remote_tip: &Option<ObjectId>, force: bool) -> &'static str {
    match (remote_tip, force) {
        (None, _) => "new branch",
        (Some(_), true) => "forced update",
        (Some(_), false) => "fast-forward",
    }
}
