// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pf-diff: the DiffValidator — a strict unified-diff gatekeeper.
//!
//! Accepts a raw LLM output string and decides whether it is (a) a valid
//! unified diff, (b) the literal sentinel `NO_CHANGES`, or (c) garbage.
//! Stages 1-3 are pure string processing; stages 4-5 are worktree-aware
//! (existence checks, a dry-run `git apply`) via the [`WorktreeProbe`]
//! trait so the pure stages stay unit-testable without a filesystem.

mod probe;
mod sanitise;
mod structural;

pub use probe::{git_apply, FsGitProbe, WorktreeProbe};

use std::fmt;

/// Default line-count ceiling for a diff (`MAX_DIFF_SIZE`).
pub const DEFAULT_MAX_DIFF_SIZE: usize = 5000;

/// Which validator stage produced a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalise,
    Sanitise,
    Structural,
    PreApplySanity,
    ApplicabilityProbe,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Normalise => "normalise",
            Stage::Sanitise => "sanitise",
            Stage::Structural => "structural",
            Stage::PreApplySanity => "pre_apply_sanity",
            Stage::ApplicabilityProbe => "applicability_probe",
        })
    }
}

/// A structured validator rejection: `{ok:false, errors:[string]}`.
///
/// `errors` is never empty — every rejection path names the failing rule
/// so the engine can inject the exact text back into the next LLM prompt.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub stage: Stage,
    pub errors: Vec<String>,
}

impl Rejection {
    pub fn single(stage: Stage, message: impl Into<String>) -> Self {
        Self { stage, errors: vec![message.into()] }
    }

    /// Feedback text to inject into the next LLM prompt.
    pub fn feedback(&self) -> String {
        self.errors.join("\n")
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.feedback())
    }
}

impl std::error::Error for Rejection {}

/// The validator's successful output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedDiff {
    /// The LLM explicitly signalled no change is required.
    NoChanges,
    /// A normalised unified diff, guaranteed to end with exactly one `\n`
    /// and to have passed a dry-run apply against the worktree.
    Patch(String),
}

pub type ValidateResult = Result<ValidatedDiff, Rejection>;

/// Run the full five-stage validation pipeline.
///
/// `prompt` is the job's original natural-language prompt, needed by the
/// deletion-keyword sanity check in stage 4. `probe` supplies worktree
/// access for stages 4-5.
pub fn validate(raw: &str, prompt: &str, probe: &dyn WorktreeProbe, max_lines: usize) -> ValidateResult {
    let normalised = sanitise::normalise(raw)?;
    let sanitise::Normalised::Diff(text) = normalised else {
        return Ok(ValidatedDiff::NoChanges);
    };

    let text = sanitise::sanitise(&text)?;
    structural::structural_validate(&text, max_lines)?;

    let blocks = structural::parse_file_blocks(&text);
    structural::pre_apply_sanity(&blocks, prompt, probe)?;

    let final_text = structural::ensure_single_trailing_newline(&text);
    probe
        .dry_run_apply(&final_text)
        .map_err(|stderr| Rejection::single(Stage::ApplicabilityProbe, stderr))?;

    Ok(ValidatedDiff::Patch(final_text))
}

#[cfg(test)]
mod tests;
