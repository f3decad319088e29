//! UX agent: asks the LLM for a structured pass/fail report against a
//! fixed checklist, then asks for a fix diff per failed item. Entirely
//! non-fatal; a malformed LLM response is itself a non-fatal agent
//! failure, not an error the engine propagates.

use std::path::Path;

use pf_llm::{LlmClient, LlmError};
use serde::Deserialize;

/// The fixed four-item checklist.
pub const CHECKLIST: &[&str] =
    &["responsive breakpoints", "empty states", "loading states", "consistent spacing"];

#[derive(Debug, Deserialize)]
struct UxReport {
    passed: Vec<String>,
    failed: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UxOutcome {
    pub passed: Vec<String>,
    pub failed: Vec<String>,
    pub fixes_applied: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UxAgentError {
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
}

pub async fn run_ux_agent(
    job_prompt: &str,
    worktree: &Path,
    llm: &dyn LlmClient,
    max_diff_lines: usize,
) -> Result<UxOutcome, UxAgentError> {
    let system_prompt = "You are the UX agent in an autonomous code-modification pipeline. \
        Evaluate the current change against this checklist: responsive breakpoints, empty states, \
        loading states, consistent spacing. Respond with strict JSON: \
        {\"passed\": [...], \"failed\": [...]} using only checklist item names.";
    let user_prompt = format!("Original task: {job_prompt}\n\nEvaluate the checklist for this change.");

    let completion = llm.complete(system_prompt, &user_prompt).await?;

    let report: UxReport = match serde_json::from_str(&completion.text) {
        Ok(report) => report,
        Err(err) => {
            return Ok(UxOutcome {
                warnings: vec![format!("ux agent: malformed JSON report: {err}")],
                ..Default::default()
            });
        }
    };

    let mut outcome = UxOutcome { passed: report.passed, failed: report.failed, ..Default::default() };

    for item in outcome.failed.clone() {
        let fix_system_prompt = "You are the UX agent. Emit a single unified diff (or NO_CHANGES) \
            that fixes the named UX checklist failure.";
        let fix_user_prompt =
            format!("Original task: {job_prompt}\n\nFailed checklist item: {item}\n\nProduce a fix diff.");

        match llm.complete(fix_system_prompt, &fix_user_prompt).await {
            Ok(completion) => match crate::validate_and_apply(worktree, &completion.text, job_prompt, max_diff_lines) {
                Ok(true) => outcome.fixes_applied.push(item),
                Ok(false) => {}
                Err(err) => outcome.warnings.push(format!("ux agent: fix for `{item}` rejected: {err}")),
            },
            Err(err) => outcome.warnings.push(format!("ux agent: fix request for `{item}` failed: {err}")),
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_llm::{Completion, FakeLlmClient, Usage};

    #[tokio::test]
    async fn parses_a_well_formed_report_and_applies_fixes() {
        let dir = tempfile::tempdir().unwrap();
        std::process::Command::new("git").arg("init").arg("-q").current_dir(dir.path()).status().unwrap();

        let llm = FakeLlmClient::scripted(vec![
            Ok(Completion {
                text: r#"{"passed":["responsive breakpoints"],"failed":["empty states"]}"#.to_string(),
                usage: Usage::default(),
            }),
            Ok(Completion { text: "NO_CHANGES".to_string(), usage: Usage::default() }),
        ]);

        let outcome = run_ux_agent("add a list view", dir.path(), &llm, 5000).await.unwrap();
        assert_eq!(outcome.passed, vec!["responsive breakpoints".to_string()]);
        assert_eq!(outcome.failed, vec!["empty states".to_string()]);
        assert!(outcome.fixes_applied.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_a_non_fatal_warning() {
        let dir = tempfile::tempdir().unwrap();
        let llm = FakeLlmClient::responding_with("not json at all", Usage::default());

        let outcome = run_ux_agent("add a list view", dir.path(), &llm, 5000).await.unwrap();
        assert!(!outcome.warnings.is_empty());
        assert!(outcome.passed.is_empty());
    }
}
