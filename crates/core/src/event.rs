//! Append-only job event log entries.

use crate::job::JobId;
use serde::{Deserialize, Serialize};

/// Severity of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

crate::simple_display! {
    Severity {
        Info => "info",
        Warning => "warning",
        Error => "error",
        Success => "success",
    }
}

/// One append-only log entry for a job.
///
/// Never mutated after insertion. Ordering for replay is
/// `(job_id, event_time_ms ascending, event_id ascending)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: i64,
    pub job_id: JobId,
    pub message: String,
    pub severity: Severity,
    pub event_time_ms: u64,
}

/// A not-yet-persisted event, before the store assigns `event_id`.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub job_id: JobId,
    pub message: String,
    pub severity: Severity,
    pub event_time_ms: u64,
}

impl NewEvent {
    pub fn new(job_id: JobId, severity: Severity, message: impl Into<String>, event_time_ms: u64) -> Self {
        Self { job_id, message: message.into(), severity, event_time_ms }
    }

    pub fn info(job_id: JobId, message: impl Into<String>, event_time_ms: u64) -> Self {
        Self::new(job_id, Severity::Info, message, event_time_ms)
    }

    pub fn warning(job_id: JobId, message: impl Into<String>, event_time_ms: u64) -> Self {
        Self::new(job_id, Severity::Warning, message, event_time_ms)
    }

    pub fn error(job_id: JobId, message: impl Into<String>, event_time_ms: u64) -> Self {
        Self::new(job_id, Severity::Error, message, event_time_ms)
    }

    pub fn success(job_id: JobId, message: impl Into<String>, event_time_ms: u64) -> Self {
        Self::new(job_id, Severity::Success, message, event_time_ms)
    }
}
