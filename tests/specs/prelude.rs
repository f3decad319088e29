//! Shared scaffolding for the integration specs.

use std::path::Path;
use std::process::Command;

/// `git init` a fresh repo at `path` with one commit containing `files`,
/// and rename the initial branch to `main` regardless of the host's
/// `init.defaultBranch` setting.
pub fn init_repo(path: &Path, files: &[(&str, &str)]) {
    run_git(path, &["init", "-q"]);
    run_git(path, &["config", "user.email", "test@example.invalid"]);
    run_git(path, &["config", "user.name", "Spec Runner"]);

    for (relative, content) in files {
        let file_path = path.join(relative);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture parent dir");
        }
        std::fs::write(&file_path, content).expect("write fixture file");
    }

    run_git(path, &["add", "-A"]);
    run_git(path, &["commit", "-q", "-m", "initial commit"]);
    run_git(path, &["branch", "-m", "main"]);
}

pub fn run_git(path: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(path)
        .args(args)
        .status()
        .unwrap_or_else(|e| panic!("failed to spawn git {args:?}: {e}"));
    assert!(status.success(), "git {args:?} failed in {}", path.display());
}

pub fn read_file(path: &Path, relative: &str) -> String {
    std::fs::read_to_string(path.join(relative)).unwrap_or_else(|e| panic!("read {relative}: {e}"))
}
