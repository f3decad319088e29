//! Worktree-aware stages 4-5: file existence checks and a dry-run apply.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Abstracts the filesystem/git operations stages 4-5 need, so the pure
/// stages above can be tested without a checkout on disk.
pub trait WorktreeProbe {
    /// Does `relative_path` already exist in the worktree?
    fn file_exists(&self, relative_path: &str) -> bool;

    /// Dry-run apply `diff_text` against the worktree (`git apply --check`).
    /// `Err` carries the captured stderr for injection back into the next
    /// LLM prompt.
    fn dry_run_apply(&self, diff_text: &str) -> Result<(), String>;
}

/// A [`WorktreeProbe`] backed by a real checkout on disk.
pub struct FsGitProbe {
    root: PathBuf,
}

impl FsGitProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl WorktreeProbe for FsGitProbe {
    fn file_exists(&self, relative_path: &str) -> bool {
        self.root.join(relative_path).is_file()
    }

    fn dry_run_apply(&self, diff_text: &str) -> Result<(), String> {
        let mut child = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(["apply", "--check", "--whitespace=nowarn", "-"])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to spawn git apply --check: {e}"))?;

        {
            use std::io::Write;
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| "git apply --check: no stdin handle".to_string())?;
            stdin
                .write_all(diff_text.as_bytes())
                .map_err(|e| format!("failed writing diff to git apply --check: {e}"))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| format!("failed waiting on git apply --check: {e}"))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}

impl AsRef<Path> for FsGitProbe {
    fn as_ref(&self) -> &Path {
        &self.root
    }
}

/// Apply `diff_text` for real (`git apply --whitespace=nowarn`, verbose),
/// distinct from [`WorktreeProbe::dry_run_apply`]'s `--check` probe.
/// Used by the engine's apply step and by the agent pipeline's
/// own validated diffs.
pub fn git_apply(root: &Path, diff_text: &str) -> Result<(), String> {
    let mut child = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["apply", "--whitespace=nowarn", "--verbose", "-"])
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn git apply: {e}"))?;

    {
        use std::io::Write;
        let stdin =
            child.stdin.as_mut().ok_or_else(|| "git apply: no stdin handle".to_string())?;
        stdin.write_all(diff_text.as_bytes()).map_err(|e| format!("failed writing diff to git apply: {e}"))?;
    }

    let output = child.wait_with_output().map_err(|e| format!("failed waiting on git apply: {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::WorktreeProbe;
    use std::collections::HashSet;

    /// An in-memory probe for unit tests: a fixed set of "existing" files
    /// and a scripted apply result.
    #[derive(Clone)]
    pub struct FakeProbe {
        pub existing_files: HashSet<String>,
        pub apply_result: Result<(), String>,
    }

    impl Default for FakeProbe {
        fn default() -> Self {
            Self { existing_files: HashSet::new(), apply_result: Ok(()) }
        }
    }

    impl WorktreeProbe for FakeProbe {
        fn file_exists(&self, relative_path: &str) -> bool {
            self.existing_files.contains(relative_path)
        }

        fn dry_run_apply(&self, _diff_text: &str) -> Result<(), String> {
            self.apply_result.clone()
        }
    }
}
