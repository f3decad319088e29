//! `ConfigRegistry` — the process-wide configuration surface,
//! read once at startup from the environment (with `.env` support via
//! `dotenvy` for local development).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Every supported environment variable, typed and defaulted.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub repos_base_dir: PathBuf,
    pub worktrees_base_dir: PathBuf,
    pub patches_dir: PathBuf,
    pub jobs_dir: PathBuf,
    pub previews_dir: PathBuf,
    pub published_dir: PathBuf,

    pub max_iterations: u32,
    pub executor_poll_interval: Duration,
    pub max_context_size: usize,
    pub max_diff_size: usize,
    pub preflight_timeout: Duration,

    pub lint_command: Option<String>,
    pub typecheck_command: Option<String>,
    pub test_command: Option<String>,
    pub smoke_command: Option<String>,
    pub build_command: Option<String>,

    pub git_author_name: String,
    pub git_author_email: String,
    pub github_token: Option<String>,

    pub anthropic_api_key: String,
    pub openai_api_key: String,

    /// Not itself a named environment variable; the address this `pf-server`
    /// binary binds to. Defaults to every interface on port 8080.
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_path: env_path("DATABASE_PATH", "data/patchforge.db"),
            repos_base_dir: env_path("REPOS_BASE_DIR", "data/repos"),
            worktrees_base_dir: env_path("WORKTREES_BASE_DIR", "data/worktrees"),
            patches_dir: env_path("PATCHES_DIR", "data/patches"),
            jobs_dir: env_path("JOBS_DIR", "data/jobs"),
            previews_dir: env_path("PREVIEWS_DIR", "data/previews"),
            published_dir: env_path("PUBLISHED_DIR", "data/published"),

            max_iterations: env_u32("MAX_ITERATIONS", pf_core::DEFAULT_MAX_ITERATIONS),
            executor_poll_interval: Duration::from_millis(env_u64("EXECUTOR_POLL_INTERVAL", 5000)),
            max_context_size: env_usize("MAX_CONTEXT_SIZE", pf_context::DEFAULT_MAX_CONTEXT_SIZE),
            max_diff_size: env_usize("MAX_DIFF_SIZE", pf_diff::DEFAULT_MAX_DIFF_SIZE),
            preflight_timeout: Duration::from_millis(env_u64("PREFLIGHT_TIMEOUT", 300_000)),

            lint_command: env_command("LINT_COMMAND"),
            typecheck_command: env_command("TYPECHECK_COMMAND"),
            test_command: env_command("TEST_COMMAND"),
            smoke_command: env_command("SMOKE_COMMAND"),
            // Unlike the other three stages, an unset BUILD_COMMAND does not
            // skip the preview/debug-agent build step; it falls back to the
            // ecosystem default.
            build_command: env_command("BUILD_COMMAND").or_else(|| Some("npm run build".to_string())),

            git_author_name: env_string("GIT_AUTHOR_NAME", "PatchForge"),
            git_author_email: env_string("GIT_AUTHOR_EMAIL", "patchforge@example.invalid"),
            github_token: env_command("GITHUB_TOKEN"),

            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .context("ANTHROPIC_API_KEY is required to route jobs to the claude model")?,
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY is required to route jobs to the gpt model")?,

            bind_addr: env_string("BIND_ADDR", "0.0.0.0:8080")
                .parse()
                .context("BIND_ADDR must be a valid socket address")?,
        })
    }

    /// Create every on-disk root this process owns, matching
    /// `ArtifactFilesystem`'s startup responsibility.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        for dir in [
            &self.repos_base_dir,
            &self.worktrees_base_dir,
            &self.patches_dir,
            &self.jobs_dir,
            &self.previews_dir,
            &self.published_dir,
        ] {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        if let Some(parent) = self.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn engine_config(&self) -> pf_engine::EngineConfig {
        pf_engine::EngineConfig {
            repos_base_dir: self.repos_base_dir.clone(),
            worktrees_base_dir: self.worktrees_base_dir.clone(),
            patches_dir: self.patches_dir.clone(),
            previews_dir: self.previews_dir.clone(),
            max_iterations: self.max_iterations,
            poll_interval: self.executor_poll_interval,
            stage_timeout: self.preflight_timeout,
            max_diff_lines: self.max_diff_size,
            max_context_size: self.max_context_size,
            lint_command: self.lint_command.clone(),
            typecheck_command: self.typecheck_command.clone(),
            test_command: self.test_command.clone(),
            smoke_command: self.smoke_command.clone(),
            build_command: self.build_command.clone(),
            git_author_name: self.git_author_name.clone(),
            git_author_email: self.git_author_email.clone(),
        }
    }
}

fn env_path(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env_string(name, default))
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Treats an empty string identically to unset, per the command-string
/// convention.
fn env_command(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
