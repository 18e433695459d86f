//! Clone: the one porcelain command that creates its repository

use crate::areas::repository::Repository;
use crate::artifacts::pack::processor::PackProcessor;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::remote::RemoteConfig;
use crate::artifacts::transport::{self, AuthConfig, Deadline};
use crate::errors::GitError;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

const CLONE_TIMEOUT: Duration = Duration::from_secs(600);
const ORIGIN: &str = "origin";

/// Clone `url` into `directory` (inferred from the URL when omitted)
pub fn clone_repository(
    url: &str,
    directory: Option<&str>,
    writer: Box<dyn std::io::Write>,
) -> Result<()> {
    let target = directory
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(infer_directory_name(url)));

    if target.exists() {
        let occupied = std::fs::read_dir(&target)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(true);
        if occupied {
            return Err(GitError::RepositoryExists).with_context(|| {
                format!(
                    "git clone: destination path '{}' already exists and is not empty",
                    target.display()
                )
            });
        }
    }
    std::fs::create_dir_all(&target)
        .with_context(|| format!("unable to create {}", target.display()))?;

    let mut repository = Repository::new(target.clone(), writer)?;
    repository.init()?;

    let mut config = RemoteConfig::new(&repository.git_path());
    config.load()?;
    config.add(ORIGIN, url)?;

    let auth = AuthConfig::from_env();
    let mut transport =
        transport::create(url, &auth).with_context(|| format!("git clone {url}"))?;
    let deadline = Deadline::after(CLONE_TIMEOUT);

    let advertisement = transport
        .list_refs(&deadline)
        .with_context(|| format!("git clone {url}"))?;
    if advertisement.refs.is_empty() {
        return Err(GitError::ReferenceNotFound("HEAD".to_string()))
            .context("git clone: remote repository has no refs");
    }

    let branch = advertisement
        .default_branch(None)
        .ok_or(GitError::ReferenceNotFound("HEAD".to_string()))
        .context("git clone: could not determine default branch")?;
    let tip = advertisement
        .branch_tip(&branch)
        .cloned()
        .ok_or_else(|| GitError::ReferenceNotFound(format!("refs/heads/{branch}")))?;

    let wants: Vec<ObjectId> = advertisement
        .refs
        .values()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    writeln!(repository.writer(), "Cloning into '{}'...", target.display())?;

    let response = transport
        .fetch_pack(&wants, &[], &deadline)
        .with_context(|| format!("git clone {url}"))?;
    let summary = PackProcessor::new(repository.database())
        .process(&response)
        .context("git clone: pack processing failed")?;
    writeln!(
        repository.writer(),
        "Received {} objects ({} deltas)",
        summary.object_count,
        summary.delta_count
    )?;

    for (advertised_branch, oid) in advertisement.branches() {
        repository
            .refs()
            .update_remote_ref(ORIGIN, advertised_branch, oid)?;
    }

    repository
        .refs()
        .update_ref(&format!("refs/heads/{branch}"), &tip)?;
    repository
        .refs()
        .set_head_symbolic(&format!("refs/heads/{branch}"))?;

    let commit = repository.database().load_commit(&tip)?;
    let mut index = repository.index();
    index.load()?;
    repository.materialize_tree(commit.tree(), &mut index, true)?;
    index.save()?;
    drop(index);

    writeln!(repository.writer(), "Checked out branch '{branch}'")?;
    Ok(())
}

/// Last path segment of the URL, stripped of `.git`
fn infer_directory_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    // scp-like URLs may carry host:path with no slash
    let last = last.rsplit(':').next().unwrap_or(last);
    let name = last.trim_end_matches(".git");

    if name.is_empty() {
        "repository".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("https://example.com/user/repo.git", "repo")]
    #[case("https://example.com/user/repo", "repo")]
    #[case("https://example.com/user/repo/", "repo")]
    #[case("git@github.com:user/repo.git", "repo")]
    #[case("git@github.com:repo.git", "repo")]
    #[case("", "repository")]
    fn directory_inference(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(infer_directory_name(url), expected);
    }
}
