//! Shared subprocess wrapper: run a shell command with a timeout, a
//! capped output buffer, and line-by-line progress streaming.
//!
//! Every preflight stage (and, by extension, the build command used by
//! `pf-preview` and the debug agent's rebuild in `pf-agents`) goes through
//! this one helper so timeout/streaming/truncation behaviour is uniform.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn { command: String, #[source] source: std::io::Error },
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("failed to wait on `{command}`: {source}")]
    Wait { command: String, #[source] source: std::io::Error },
}

/// The result of a completed (non-timed-out) subprocess run.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Combined stdout+stderr, interleaved by arrival order, truncated to
    /// the configured byte cap (a `"... output truncated"` marker is
    /// appended when truncation occurred).
    pub output: String,
}

/// Run `command` via `sh -c` in `cwd`, streaming each output line to
/// `on_line` as it arrives, bounded by `timeout` and `max_output_bytes`.
pub async fn run_with_timeout(
    command: &str,
    cwd: &Path,
    timeout: Duration,
    max_output_bytes: usize,
    mut on_line: impl FnMut(&str),
) -> Result<CommandOutput, SubprocessError> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SubprocessError::Spawn { command: command.to_string(), source })?;

    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let stdout_tx = tx.clone();
    let stderr_tx = tx;

    let stdout_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if stdout_tx.send(line).is_err() {
                break;
            }
        }
    });
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if stderr_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut combined = String::new();
    let mut truncated = false;

    let run = async {
        while let Some(line) = rx.recv().await {
            on_line(&line);
            if !truncated {
                if combined.len() + line.len() + 1 > max_output_bytes {
                    truncated = true;
                } else {
                    combined.push_str(&line);
                    combined.push('\n');
                }
            }
        }
        let _ = stdout_task.await;
        let _ = stderr_task.await;
        child.wait().await
    };

    let status = match tokio::time::timeout(timeout, run).await {
        Ok(Ok(status)) => status,
        Ok(Err(source)) => return Err(SubprocessError::Wait { command: command.to_string(), source }),
        Err(_) => {
            let _ = child.start_kill();
            return Err(SubprocessError::Timeout { command: command.to_string(), timeout });
        }
    };

    if truncated {
        combined.push_str("... output truncated\n");
    }

    Ok(CommandOutput { success: status.success(), exit_code: status.code(), output: combined })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_reports_success() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_with_timeout("echo hello", dir.path(), Duration::from_secs(5), 1024, |_| {})
            .await
            .unwrap();
        assert!(output.success);
        assert!(output.output.contains("hello"));
    }

    #[tokio::test]
    async fn reports_failure_on_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_with_timeout("exit 1", dir.path(), Duration::from_secs(5), 1024, |_| {})
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(1));
    }

    #[tokio::test]
    async fn times_out_long_running_commands() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            run_with_timeout("sleep 5", dir.path(), Duration::from_millis(50), 1024, |_| {}).await;
        assert!(matches!(result, Err(SubprocessError::Timeout { .. })));
    }

    #[tokio::test]
    async fn truncates_output_past_the_byte_cap() {
        let dir = tempfile::tempdir().unwrap();
        let output =
            run_with_timeout("echo aaaaaaaaaa", dir.path(), Duration::from_secs(5), 5, |_| {})
                .await
                .unwrap();
        assert!(output.output.contains("truncated"));
    }
}
