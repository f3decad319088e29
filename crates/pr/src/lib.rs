// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pf-pr: `PrPublisher` — force-pushes the destination branch and opens a
//! pull request via the external forge client, then stamps a checkpoint
//! tag. The forge client itself (the GitHub/GitLab API surface) is an
//! external collaborator — this crate ships the [`ForgeClient`]
//! trait, a thin GitHub implementation, and a [`FakeForgeClient`] for
//! tests.

pub mod github;

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub use github::GithubForgeClient;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("forge request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("forge returned an error: {0}")]
    Provider(String),
}

/// A reference to a forge-hosted pull request.
#[derive(Debug, Clone)]
pub struct PrHandle {
    pub url: String,
    pub number: u64,
}

/// Parameters for opening a pull request, deliberately thin: the forge
/// itself owns title/body formatting conventions.
pub struct OpenPullRequestRequest<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub head_branch: &'a str,
    pub base_branch: &'a str,
    pub title: &'a str,
    pub body: &'a str,
}

/// The external PR-creation client. Out of scope beyond this
/// contract — `pf-pr` supplies one real (GitHub) implementation and one
/// fake for tests.
#[async_trait]
pub trait ForgeClient: Send + Sync {
    async fn open_pull_request(&self, request: OpenPullRequestRequest<'_>) -> Result<PrHandle, ForgeError>;
}

/// Upper bound on a forge API call.
pub const FORGE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("git push failed: {0}")]
    Push(String),
    #[error("git tag failed: {0}")]
    Tag(String),
    #[error(transparent)]
    Forge(#[from] ForgeError),
}

/// What happened when publishing a job's result.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// The project has a remote: pushed, PR opened, checkpoint tagged.
    Published { pr: PrHandle },
    /// No remote configured: push/PR are skipped, only the checkpoint
    /// tag is created.
    LocalOnly,
}

/// Everything needed to identify the forge-hosted repository a PR targets.
pub struct RemoteTarget<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
}

pub struct PrPublisher {
    forge: Box<dyn ForgeClient>,
}

impl PrPublisher {
    pub fn new(forge: Box<dyn ForgeClient>) -> Self {
        Self { forge }
    }

    /// Force-push `destination_branch`, open a PR to `source_branch` (if
    /// `remote` is `Some`), and tag `vibe/job-<job_id>` on the
    /// destination branch either way.
    pub async fn publish(
        &self,
        worktree: &Path,
        job_id: &str,
        source_branch: &str,
        destination_branch: &str,
        remote: Option<RemoteTarget<'_>>,
        title: &str,
        body: &str,
    ) -> Result<PublishOutcome, PublishError> {
        let tag = format!("vibe/job-{job_id}");

        let Some(remote) = remote else {
            tag_checkpoint(worktree, &tag).await?;
            return Ok(PublishOutcome::LocalOnly);
        };

        push_branch(worktree, destination_branch).await?;

        let pr = tokio::time::timeout(
            FORGE_TIMEOUT,
            self.forge.open_pull_request(OpenPullRequestRequest {
                owner: remote.owner,
                repo: remote.repo,
                head_branch: destination_branch,
                base_branch: source_branch,
                title,
                body,
            }),
        )
        .await
        .map_err(|_| PublishError::Forge(ForgeError::Provider("forge request timed out".to_string())))??;

        tag_checkpoint(worktree, &tag).await?;
        Ok(PublishOutcome::Published { pr })
    }
}

async fn push_branch(worktree: &Path, branch: &str) -> Result<(), PublishError> {
    let command = format!("git push --force origin {branch}");
    let output = pf_preflight::subprocess::run_with_timeout(
        &command,
        worktree,
        Duration::from_secs(30),
        1024 * 1024,
        |_| {},
    )
    .await
    .map_err(|e| PublishError::Push(e.to_string()))?;
    if !output.success {
        return Err(PublishError::Push(output.output));
    }
    Ok(())
}

async fn tag_checkpoint(worktree: &Path, tag: &str) -> Result<(), PublishError> {
    let command = format!("git tag -f {tag}");
    let output = pf_preflight::subprocess::run_with_timeout(
        &command,
        worktree,
        Duration::from_secs(10),
        64 * 1024,
        |_| {},
    )
    .await
    .map_err(|e| PublishError::Tag(e.to_string()))?;
    if !output.success {
        return Err(PublishError::Tag(output.output));
    }
    Ok(())
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// Always succeeds, recording every request it handled.
    pub struct FakeForgeClient {
        next_number: Mutex<u64>,
        requests: Mutex<Vec<String>>,
    }

    impl Default for FakeForgeClient {
        fn default() -> Self {
            Self { next_number: Mutex::new(1), requests: Mutex::new(Vec::new()) }
        }
    }

    impl FakeForgeClient {
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl ForgeClient for FakeForgeClient {
        async fn open_pull_request(
            &self,
            request: OpenPullRequestRequest<'_>,
        ) -> Result<PrHandle, ForgeError> {
            self.requests.lock().push(format!(
                "{}/{}: {} -> {}",
                request.owner, request.repo, request.head_branch, request.base_branch
            ));
            let mut number = self.next_number.lock();
            let handle = PrHandle {
                url: format!("https://example.invalid/{}/{}/pull/{}", request.owner, request.repo, *number),
                number: *number,
            };
            *number += 1;
            Ok(handle)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeForgeClient;
