//! On-disk advisory lock keyed by `project_id`, so two engine instances
//! never resolve the same project cache concurrently.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use pf_core::ProjectId;

/// Held for the lifetime of a job's execution against a project cache;
/// released on drop.
pub struct ProjectLock {
    file: File,
    #[allow(dead_code)]
    path: PathBuf,
}

impl ProjectLock {
    /// Acquire an exclusive lock for `project_id` under `locks_dir`,
    /// blocking the calling thread until it is free. Callers on the async
    /// engine task run this inside `spawn_blocking`.
    pub fn acquire(locks_dir: &Path, project_id: &ProjectId) -> io::Result<Self> {
        fs::create_dir_all(locks_dir)?;
        let path = locks_dir.join(format!("{project_id}.lock"));
        let file = File::create(&path)?;
        file.lock_exclusive()?;
        Ok(Self { file, path })
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_blocks_until_the_first_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let project_id = ProjectId::new();

        let first = ProjectLock::acquire(dir.path(), &project_id).unwrap();
        let lock_path = dir.path().join(format!("{project_id}.lock"));
        let probe = File::open(&lock_path).unwrap();
        assert!(probe.try_lock_exclusive().is_err());

        drop(first);
        assert!(probe.try_lock_exclusive().is_ok());
    }
}
