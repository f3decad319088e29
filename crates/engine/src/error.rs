//! Engine-level error taxonomy, scoped to `workspace::resolve`'s working
//! -directory setup. Everything past that point (lock contention, job
//! lookup, git plumbing during the iteration loop) is handled inline as a
//! terminal `fail_job` reason rather than a distinct `EngineError`
//! variant, since the job's own `failed` state and event log are already
//! the durable record of what went wrong — in-iteration failures (diff
//! rejection, apply failure, preflight failure) are never propagated as a
//! Rust error at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] pf_storage::StorageError),

    #[error("git operation failed: {0}")]
    Git(String),

    #[error("job has neither project_id nor repository_url")]
    NoWorkingDirectorySource,
}

pub type EngineResult<T> = Result<T, EngineError>;
