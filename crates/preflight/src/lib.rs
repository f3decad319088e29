// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pf-preflight: the ordered quality-gate pipeline (lint, typecheck,
//! test, smoke) run in a job's worktree before the agent pipeline, plus
//! the shared subprocess wrapper every command-running crate in the
//! workspace builds on.

pub mod subprocess;

pub use subprocess::{CommandOutput, SubprocessError};

use std::path::Path;
use std::time::Duration;

/// Default per-stage timeout (`PREFLIGHT_TIMEOUT`).
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Output buffer cap per stage.
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Which quality gate a stage represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Lint,
    Typecheck,
    Test,
    Smoke,
}

impl StageKind {
    pub fn label(self) -> &'static str {
        match self {
            StageKind::Lint => "lint",
            StageKind::Typecheck => "typecheck",
            StageKind::Test => "test",
            StageKind::Smoke => "smoke",
        }
    }
}

/// A single configured stage: its kind and the shell command to run.
#[derive(Debug, Clone)]
pub struct Stage {
    pub kind: StageKind,
    pub command: String,
}

/// The ordered set of configured stages. Empty iff no stage commands were
/// configured, in which case preflight is a no-op success.
#[derive(Debug, Clone, Default)]
pub struct PreflightPlan {
    pub stages: Vec<Stage>,
}

impl PreflightPlan {
    /// Build a plan from the four optional configured commands, in fixed
    /// order (lint, typecheck, test, smoke); empty/unset commands are
    /// omitted rather than included as no-op stages.
    pub fn from_commands(
        lint: Option<&str>,
        typecheck: Option<&str>,
        test: Option<&str>,
        smoke: Option<&str>,
    ) -> Self {
        let mut stages = Vec::new();
        for (kind, command) in [
            (StageKind::Lint, lint),
            (StageKind::Typecheck, typecheck),
            (StageKind::Test, test),
            (StageKind::Smoke, smoke),
        ] {
            if let Some(command) = command {
                if !command.trim().is_empty() {
                    stages.push(Stage { kind, command: command.to_string() });
                }
            }
        }
        Self { stages }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// The outcome of a stage that ran to completion or timed out (spawn
/// failures surface as [`SubprocessError`] and are treated the same as a
/// failing stage by the caller).
#[derive(Debug, Clone)]
pub struct StageFailure {
    pub stage: StageKind,
    pub output: String,
    pub error: String,
}

/// Runs every configured stage in order in `worktree`, stopping at the
/// first failure (fail-fast). `on_output` receives every line from every
/// stage as it streams in, tagged by caller context if needed.
pub async fn run_preflight(
    plan: &PreflightPlan,
    worktree: &Path,
    timeout: Duration,
    mut on_output: impl FnMut(StageKind, &str),
) -> Result<(), StageFailure> {
    for stage in &plan.stages {
        let kind = stage.kind;
        let result =
            subprocess::run_with_timeout(&stage.command, worktree, timeout, MAX_OUTPUT_BYTES, |line| {
                on_output(kind, line);
            })
            .await;

        match result {
            Ok(output) if output.success => continue,
            Ok(output) => {
                return Err(StageFailure {
                    stage: kind,
                    output: output.output,
                    error: format!(
                        "stage `{}` failed (exit {:?})",
                        kind.label(),
                        output.exit_code
                    ),
                });
            }
            Err(err) => {
                return Err(StageFailure { stage: kind, output: String::new(), error: err.to_string() });
            }
        }
    }
    Ok(())
}
