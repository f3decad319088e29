// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pf-preview: `PreviewBuilder` — runs the configured build command, then
//! locates and copies a build output directory into a per-job preview
//! root. Every failure is logged and non-fatal; the caller decides what
//! "logged" means (the engine forwards to `LogFanOut`).

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Priority order for locating the build's output directory.
const OUTPUT_DIR_CANDIDATES: &[&str] = &["dist", "build", "out", ".next", "public"];

#[derive(Debug, Clone)]
pub enum PreviewOutcome {
    /// Build succeeded and an output directory was found and published.
    Published { preview_url: String },
    /// Build failed, or no recognised output directory was found.
    Skipped { reason: String },
}

/// Run `build_command` in `worktree`; on success, copy the first matching
/// output directory to `previews_root/<job_id>/` and return the preview
/// URL `/previews/<job_id>/index.html`.
pub async fn build_preview(
    worktree: &Path,
    build_command: &str,
    previews_root: &Path,
    job_id: &str,
    timeout: Duration,
) -> PreviewOutcome {
    let result = pf_preflight::subprocess::run_with_timeout(
        build_command,
        worktree,
        timeout,
        pf_preflight::MAX_OUTPUT_BYTES,
        |_| {},
    )
    .await;

    let output = match result {
        Ok(output) if output.success => output,
        Ok(output) => {
            return PreviewOutcome::Skipped {
                reason: format!("build command failed (exit {:?}): {}", output.exit_code, output.output),
            };
        }
        Err(err) => return PreviewOutcome::Skipped { reason: err.to_string() },
    };
    let _ = output;

    let Some(output_dir) = locate_output_dir(worktree) else {
        return PreviewOutcome::Skipped {
            reason: "no recognised build output directory found".to_string(),
        };
    };

    let destination = previews_root.join(job_id);
    if let Err(err) = copy_recursive(&output_dir, &destination) {
        return PreviewOutcome::Skipped { reason: format!("failed to copy build output: {err}") };
    }

    PreviewOutcome::Published { preview_url: format!("/previews/{job_id}/index.html") }
}

fn locate_output_dir(worktree: &Path) -> Option<PathBuf> {
    OUTPUT_DIR_CANDIDATES
        .iter()
        .map(|name| worktree.join(name))
        .find(|path| path.is_dir())
}

fn copy_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}
