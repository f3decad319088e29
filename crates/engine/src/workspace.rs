//! Resolve a job's working directory: a durable per-project cache under
//! `repos_base_dir`, or an ephemeral per-job clone for the deprecated
//! `repository_url` path, kept for backward compatibility with older clients.

use std::path::{Path, PathBuf};

use pf_core::{Job, Project};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::git;

/// Where on disk a job's working tree lives, and whether it is a
/// persistent project cache (reused across jobs) or an ephemeral legacy
/// checkout (deleted after the job finishes).
pub enum WorkingDirectory {
    Project { path: PathBuf },
    Legacy { path: PathBuf },
}

impl WorkingDirectory {
    pub fn path(&self) -> &Path {
        match self {
            WorkingDirectory::Project { path } | WorkingDirectory::Legacy { path } => path,
        }
    }
}

/// Resolve and prepare the working directory for `job`, cloning or
/// initialising it if this is the first time it's been touched.
pub async fn resolve(config: &EngineConfig, job: &Job, project: Option<&Project>) -> EngineResult<WorkingDirectory> {
    match (project, &job.repository_url) {
        (Some(project), _) => {
            let path = config.repos_base_dir.join(project.tenant_id.as_str()).join(project.id.to_string());
            ensure_repo(&path, project.remote_url.as_deref()).await?;
            Ok(WorkingDirectory::Project { path })
        }
        (None, Some(repository_url)) => {
            let path = config.worktrees_base_dir.join(job.id.to_string());
            git::clone(repository_url, &path).await.map_err(EngineError::Git)?;
            Ok(WorkingDirectory::Legacy { path })
        }
        (None, None) => Err(EngineError::NoWorkingDirectorySource),
    }
}

async fn ensure_repo(path: &Path, remote_url: Option<&str>) -> EngineResult<()> {
    if path.join(".git").is_dir() {
        if remote_url.is_some() {
            git::fetch_all(path).await.map_err(EngineError::Git)?;
        }
        return Ok(());
    }
    match remote_url {
        Some(url) => git::clone(url, path).await.map_err(EngineError::Git),
        None => git::init(path).await.map_err(EngineError::Git),
    }
}

/// Remove an ephemeral legacy checkout. Best-effort: failures are logged
/// by the caller, never fatal to the job's own outcome.
pub async fn cleanup_legacy(working_dir: &WorkingDirectory) -> std::io::Result<()> {
    if let WorkingDirectory::Legacy { path } = working_dir {
        tokio::fs::remove_dir_all(path).await
    } else {
        Ok(())
    }
}
