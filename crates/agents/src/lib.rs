// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pf-agents: the post-build supplementary agent pipeline — debug, QA,
//! UX, and security — run in order after preflight passes.
//!
//! Each agent is a pure-ish async function over a worktree path, an LLM
//! client, and the diff validator; none of them hold state across calls.
//! The engine is the only caller and decides what "non-fatal" means for
//! its own event log.

pub mod debug;
pub mod qa;
pub mod security;
pub mod ux;

pub use debug::{run_debug_agent, DebugOutcome};
pub use qa::{run_qa_agent, QaOutcome};
pub use security::{scan_security, SecurityFinding, SecurityReport, Severity as SecuritySeverity};
pub use ux::{run_ux_agent, UxOutcome};

use std::path::Path;

/// Validate and apply a raw LLM diff response against `worktree`, using
/// the job's original prompt for the deletion-keyword sanity check.
/// Shared by every agent that asks the LLM for a follow-up diff.
pub(crate) fn validate_and_apply(
    worktree: &Path,
    raw_diff: &str,
    job_prompt: &str,
    max_diff_lines: usize,
) -> Result<bool, String> {
    let probe = pf_diff::FsGitProbe::new(worktree);
    match pf_diff::validate(raw_diff, job_prompt, &probe, max_diff_lines) {
        Ok(pf_diff::ValidatedDiff::NoChanges) => Ok(false),
        Ok(pf_diff::ValidatedDiff::Patch(text)) => {
            pf_diff::git_apply(worktree, &text)?;
            Ok(true)
        }
        Err(rejection) => Err(rejection.to_string()),
    }
}
