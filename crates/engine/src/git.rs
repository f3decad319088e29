//! Worktree lifecycle: clone/open, branch checkout, commit, and hard
//! reset. Every call here takes argument vectors rather than a shell
//! string — `repository_url`, branch names, and commit messages can
//! contain tenant-supplied text, so none of it is ever interpolated into
//! a `sh -c` command the way `pf-preflight::subprocess` runs operator
//! -configured commands.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::GIT_TIMEOUT;

async fn git(cwd: &Path, args: &[&str], timeout: Duration) -> Result<String, String> {
    let run = async {
        let output = Command::new("git")
            .arg("-C")
            .arg(cwd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| format!("failed to spawn git {}: {e}", args.join(" ")))?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    };

    match tokio::time::timeout(timeout, run).await {
        Ok(result) => result,
        Err(_) => Err(format!("git {} timed out after {timeout:?}", args.join(" "))),
    }
}

/// `git init -q` a fresh directory for a project with no remote.
pub async fn init(path: &Path) -> Result<(), String> {
    tokio::fs::create_dir_all(path).await.map_err(|e| e.to_string())?;
    git(path, &["init", "-q"], GIT_TIMEOUT).await.map(|_| ())
}

/// Clone `remote_url` into `destination` (which must not yet exist).
pub async fn clone(remote_url: &str, destination: &Path) -> Result<(), String> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| e.to_string())?;
    }
    let dest = destination.to_string_lossy().into_owned();
    let run = async {
        let output = Command::new("git")
            .args(["clone", remote_url, &dest])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| format!("failed to spawn git clone: {e}"))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    };
    match tokio::time::timeout(GIT_TIMEOUT, run).await {
        Ok(result) => result,
        Err(_) => Err(format!("git clone timed out after {GIT_TIMEOUT:?}")),
    }
}

pub async fn fetch_all(path: &Path) -> Result<(), String> {
    git(path, &["fetch", "--all", "--prune"], GIT_TIMEOUT).await.map(|_| ())
}

/// Set the committer identity used for every commit this engine makes
/// in `path`, per `GIT_AUTHOR_NAME`/`GIT_AUTHOR_EMAIL`.
pub async fn configure_committer(path: &Path, name: &str, email: &str) -> Result<(), String> {
    git(path, &["config", "user.name", name], GIT_TIMEOUT).await?;
    git(path, &["config", "user.email", email], GIT_TIMEOUT).await?;
    Ok(())
}

/// Checkout `branch`, creating it from `base` if it does not already
/// exist locally or on the configured remote.
pub async fn checkout_or_create_branch(path: &Path, branch: &str, base: &str) -> Result<(), String> {
    if git(path, &["checkout", branch], GIT_TIMEOUT).await.is_ok() {
        return Ok(());
    }
    if git(path, &["checkout", "-b", branch, base], GIT_TIMEOUT).await.is_ok() {
        return Ok(());
    }
    // `base` itself may not exist locally yet (fresh clone's default
    // branch has a different name); fall back to branching from HEAD.
    git(path, &["checkout", "-b", branch], GIT_TIMEOUT).await.map(|_| ())
}

pub async fn checkout_existing(path: &Path, branch: &str) -> Result<(), String> {
    git(path, &["checkout", branch], GIT_TIMEOUT).await.map(|_| ())
}

/// Discard all tracked changes and untracked files — every iteration
/// starts from a clean worktree.
pub async fn reset_hard_clean(path: &Path) -> Result<(), String> {
    git(path, &["reset", "--hard", "HEAD"], GIT_TIMEOUT).await?;
    git(path, &["clean", "-fd"], GIT_TIMEOUT).await?;
    Ok(())
}

/// Stage and commit every change in the worktree. `Ok(false)` means
/// there was nothing to commit (the diff was a no-op against the tree).
pub async fn commit_all(path: &Path, message: &str) -> Result<bool, String> {
    git(path, &["add", "-A"], GIT_TIMEOUT).await?;
    match git(path, &["commit", "-m", message], GIT_TIMEOUT).await {
        Ok(_) => Ok(true),
        Err(stderr) if stderr.contains("nothing to commit") => Ok(false),
        Err(stderr) => Err(stderr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_creates_an_empty_repo() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        init(&repo).await.unwrap();
        assert!(repo.join(".git").is_dir());
    }

    #[tokio::test]
    async fn checkout_or_create_branch_creates_from_base() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        init(&repo).await.unwrap();
        configure_committer(&repo, "Test", "test@example.com").await.unwrap();
        tokio::fs::write(repo.join("a.txt"), "one").await.unwrap();
        git(&repo, &["add", "."], GIT_TIMEOUT).await.unwrap();
        git(&repo, &["commit", "-m", "init"], GIT_TIMEOUT).await.unwrap();
        git(&repo, &["branch", "-m", "main"], GIT_TIMEOUT).await.unwrap();

        checkout_or_create_branch(&repo, "feature/x", "main").await.unwrap();
        let branch = git(&repo, &["rev-parse", "--abbrev-ref", "HEAD"], GIT_TIMEOUT).await.unwrap();
        assert_eq!(branch.trim(), "feature/x");
    }

    #[tokio::test]
    async fn commit_all_reports_false_when_nothing_changed() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        init(&repo).await.unwrap();
        configure_committer(&repo, "Test", "test@example.com").await.unwrap();
        tokio::fs::write(repo.join("a.txt"), "one").await.unwrap();
        let committed = commit_all(&repo, "first").await.unwrap();
        assert!(committed);
        let committed_again = commit_all(&repo, "again").await.unwrap();
        assert!(!committed_again);
    }
}
