//! Engine-level configuration: on-disk roots, git identity, and the
//! command wiring carried down from `pf-server`'s `ConfigRegistry`.

use std::path::PathBuf;
use std::time::Duration;

use pf_context::DEFAULT_MAX_CONTEXT_SIZE;
use pf_core::DEFAULT_MAX_ITERATIONS;
use pf_diff::DEFAULT_MAX_DIFF_SIZE;
use pf_preflight::{PreflightPlan, DEFAULT_STAGE_TIMEOUT};

/// Default `EXECUTOR_POLL_INTERVAL`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Upper bound on a git plumbing call (clone/fetch/checkout), per the
/// "git clone/fetch/apply" suspension point.
pub const GIT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub repos_base_dir: PathBuf,
    pub worktrees_base_dir: PathBuf,
    pub patches_dir: PathBuf,
    pub previews_dir: PathBuf,
    pub max_iterations: u32,
    pub poll_interval: Duration,
    pub stage_timeout: Duration,
    pub max_diff_lines: usize,
    pub max_context_size: usize,
    pub lint_command: Option<String>,
    pub typecheck_command: Option<String>,
    pub test_command: Option<String>,
    pub smoke_command: Option<String>,
    pub build_command: Option<String>,
    pub git_author_name: String,
    pub git_author_email: String,
}

impl EngineConfig {
    /// The ordered preflight plan built from the four configured stage
    /// commands (empty/unset commands are simply omitted).
    pub fn preflight_plan(&self) -> PreflightPlan {
        PreflightPlan::from_commands(
            self.lint_command.as_deref(),
            self.typecheck_command.as_deref(),
            self.test_command.as_deref(),
            self.smoke_command.as_deref(),
        )
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.repos_base_dir.join(".locks")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            repos_base_dir: PathBuf::from("data/repos"),
            worktrees_base_dir: PathBuf::from("data/worktrees"),
            patches_dir: PathBuf::from("data/patches"),
            previews_dir: PathBuf::from("data/previews"),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            max_diff_lines: DEFAULT_MAX_DIFF_SIZE,
            max_context_size: DEFAULT_MAX_CONTEXT_SIZE,
            lint_command: None,
            typecheck_command: None,
            test_command: None,
            smoke_command: None,
            build_command: None,
            git_author_name: "PatchForge".to_string(),
            git_author_email: "patchforge@example.invalid".to_string(),
        }
    }
}
