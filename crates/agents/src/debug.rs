//! Debug agent: only invoked when the build command fails. Feeds the
//! failing build log back to the LLM, validates and applies its fix,
//! then re-runs the build — bounded to 2 consecutive attempts.

use std::path::Path;
use std::time::Duration;

use pf_llm::{LlmClient, LlmError};

/// First N characters of the failing build log included in the debug
/// prompt.
const MAX_LOG_CHARS: usize = 5000;

/// Maximum consecutive debug attempts before giving up.
pub const MAX_DEBUG_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone)]
pub enum DebugOutcome {
    /// The rebuild succeeded after one of the attempts.
    Fixed { attempts: u32 },
    /// The build is still failing after `MAX_DEBUG_ATTEMPTS` attempts.
    StillFailing { attempts: u32, last_log: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DebugAgentError {
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
}

/// Run the debug agent. `run_build` executes the configured build
/// command and returns `(success, combined_output)`; it's injected so
/// this crate never depends on a specific subprocess wrapper beyond
/// `pf-preflight`'s, which `run_build` wraps.
pub async fn run_debug_agent(
    worktree: &Path,
    job_prompt: &str,
    build_command: &str,
    build_timeout: Duration,
    failing_log: &str,
    llm: &dyn LlmClient,
    max_diff_lines: usize,
) -> Result<DebugOutcome, DebugAgentError> {
    let mut last_log = failing_log.to_string();

    for attempt in 1..=MAX_DEBUG_ATTEMPTS {
        let truncated_log: String = last_log.chars().take(MAX_LOG_CHARS).collect();
        let system_prompt = "You are the debug agent in an autonomous code-modification pipeline. \
            Given a failing build log, emit a single unified diff (or NO_CHANGES) that fixes it.";
        let user_prompt = format!(
            "Original task: {job_prompt}\n\nThe build is failing. Here is the build log:\n{truncated_log}\n\n\
             Produce a unified diff that fixes the build."
        );

        let completion = llm.complete(system_prompt, &user_prompt).await?;
        let _ = crate::validate_and_apply(worktree, &completion.text, job_prompt, max_diff_lines);

        let result = pf_preflight::subprocess::run_with_timeout(
            build_command,
            worktree,
            build_timeout,
            pf_preflight::MAX_OUTPUT_BYTES,
            |_| {},
        )
        .await;

        match result {
            Ok(output) if output.success => return Ok(DebugOutcome::Fixed { attempts: attempt }),
            Ok(output) => last_log = output.output,
            Err(err) => last_log = err.to_string(),
        }
    }

    Ok(DebugOutcome::StillFailing { attempts: MAX_DEBUG_ATTEMPTS, last_log })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_llm::{Completion, FakeLlmClient, Usage};

    #[tokio::test]
    async fn reports_fixed_once_the_rebuild_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        std::process::Command::new("git").arg("init").arg("-q").current_dir(dir.path()).status().unwrap();

        let llm = FakeLlmClient::scripted(vec![Ok(Completion {
            text: "NO_CHANGES".to_string(),
            usage: Usage::default(),
        })]);

        let outcome = run_debug_agent(
            dir.path(),
            "fix the build",
            "true",
            Duration::from_secs(5),
            "error: something broke",
            &llm,
            5000,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, DebugOutcome::Fixed { attempts: 1 }));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        std::process::Command::new("git").arg("init").arg("-q").current_dir(dir.path()).status().unwrap();

        let llm = FakeLlmClient::scripted(vec![
            Ok(Completion { text: "NO_CHANGES".to_string(), usage: Usage::default() }),
            Ok(Completion { text: "NO_CHANGES".to_string(), usage: Usage::default() }),
        ]);

        let outcome = run_debug_agent(
            dir.path(),
            "fix the build",
            "exit 1",
            Duration::from_secs(5),
            "error: still broken",
            &llm,
            5000,
        )
        .await
        .unwrap();

        match outcome {
            DebugOutcome::StillFailing { attempts, .. } => assert_eq!(attempts, MAX_DEBUG_ATTEMPTS),
            DebugOutcome::Fixed { .. } => panic!("expected still failing"),
        }
    }
}
