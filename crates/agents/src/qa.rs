//! QA agent: generates tests for the files the current iteration changed,
//! using only the language's built-in test runner. Failures are warnings,
//! never fatal.

use std::path::Path;
use std::time::Duration;

use pf_llm::{LlmClient, LlmError};

const TEST_FILE_MARKERS: &[&str] = &[".test.", ".spec.", "_test.", "test_"];

#[derive(Debug, Clone, Default)]
pub struct QaOutcome {
    pub diff_applied: bool,
    pub tests_passed: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum QaAgentError {
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
}

/// List the non-test source files changed between `HEAD~1` and `HEAD`.
pub fn changed_non_test_files(worktree: &Path) -> Result<Vec<String>, String> {
    let output = std::process::Command::new("git")
        .arg("-C")
        .arg(worktree)
        .args(["diff", "--name-only", "HEAD~1", "HEAD"])
        .output()
        .map_err(|e| e.to_string())?;
    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }
    let files = String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.is_empty())
        .filter(|line| !TEST_FILE_MARKERS.iter().any(|marker| line.contains(marker)))
        .map(|line| line.to_string())
        .collect();
    Ok(files)
}

/// Run the QA agent: discover changed files, ask for a test diff, apply
/// it, run the test command. Every failure mode is recorded as a warning
/// rather than surfaced as an error.
pub async fn run_qa_agent(
    worktree: &Path,
    job_prompt: &str,
    test_command: Option<&str>,
    test_timeout: Duration,
    llm: &dyn LlmClient,
    max_diff_lines: usize,
) -> Result<QaOutcome, QaAgentError> {
    let mut outcome = QaOutcome::default();

    let changed_files = match changed_non_test_files(worktree) {
        Ok(files) => files,
        Err(err) => {
            outcome.warnings.push(format!("qa agent: could not list changed files: {err}"));
            return Ok(outcome);
        }
    };
    if changed_files.is_empty() {
        outcome.warnings.push("qa agent: no non-test source files changed, nothing to cover".to_string());
        return Ok(outcome);
    }

    let system_prompt = "You are the QA agent in an autonomous code-modification pipeline. \
        Given a list of changed source files, emit a single unified diff (or NO_CHANGES) adding \
        tests that use only the language's built-in test runner (no new test framework dependency).";
    let user_prompt = format!(
        "Original task: {job_prompt}\n\nFiles changed this iteration:\n{}\n\nProduce a test diff.",
        changed_files.join("\n")
    );

    let completion = llm.complete(system_prompt, &user_prompt).await?;
    match crate::validate_and_apply(worktree, &completion.text, job_prompt, max_diff_lines) {
        Ok(applied) => outcome.diff_applied = applied,
        Err(err) => {
            outcome.warnings.push(format!("qa agent: test diff rejected: {err}"));
            return Ok(outcome);
        }
    }

    let Some(test_command) = test_command else {
        return Ok(outcome);
    };

    match pf_preflight::subprocess::run_with_timeout(
        test_command,
        worktree,
        test_timeout,
        pf_preflight::MAX_OUTPUT_BYTES,
        |_| {},
    )
    .await
    {
        Ok(output) => {
            outcome.tests_passed = output.success;
            if !output.success {
                outcome.warnings.push(format!("qa agent: tests failed after adding coverage: {}", output.output));
            }
        }
        Err(err) => outcome.warnings.push(format!("qa agent: test command error: {err}")),
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_llm::{Completion, FakeLlmClient, Usage};

    fn init_repo_with_commit(dir: &Path) {
        let run = |args: &[&str]| {
            std::process::Command::new("git").arg("-C").arg(dir).args(args).status().unwrap();
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "Test"]);
        std::fs::write(dir.join("a.txt"), "one").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "init"]);
        std::fs::write(dir.join("a.txt"), "two").unwrap();
        run(&["commit", "-a", "-q", "-m", "change"]);
    }

    #[test]
    fn lists_changed_files_excluding_tests() {
        let dir = tempfile::tempdir().unwrap();
        init_repo_with_commit(dir.path());
        let files = changed_non_test_files(dir.path()).unwrap();
        assert_eq!(files, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn warns_instead_of_failing_when_no_files_changed() {
        let dir = tempfile::tempdir().unwrap();
        let run = |args: &[&str]| {
            std::process::Command::new("git").arg("-C").arg(dir.path()).args(args).status().unwrap();
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "Test"]);
        std::fs::write(dir.path().join("a.txt"), "one").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "init"]);

        let llm = FakeLlmClient::responding_with("NO_CHANGES", Usage::default());
        let outcome =
            run_qa_agent(dir.path(), "prompt", None, Duration::from_secs(5), &llm, 5000).await.unwrap();
        assert!(!outcome.warnings.is_empty());
        assert!(!outcome.diff_applied);
    }
}
