#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pf-storage: the durable job store. Projects, jobs, the append-only
//! event log, and per-tenant budgets live in one SQLite database behind
//! a single-writer mutex, with linear versioned migrations applied at
//! open.

mod billing;
mod budgets;
mod error;
mod events;
mod jobs;
mod migrations;
mod projects;

pub use billing::{ExportRow, UsageRow};
pub use error::{StorageError, StorageResult};

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::Connection;

use pf_core::{Budget, Event, Job, JobId, NewEvent, Project, ProjectId, TenantId};

/// The durable job store. Cheap to clone — internally an `Arc`-free handle
/// is not needed because callers hold one long-lived instance behind their
/// own `Arc` (see `pf-engine`'s `AppState`).
pub struct JobStore {
    conn: Mutex<Connection>,
}

impl JobStore {
    /// Open (creating if absent) the store at `path`, running schema
    /// migrations synchronously before returning.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// An in-memory store, for tests and short-lived tooling.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    // -- projects --------------------------------------------------------

    pub fn create_project(&self, project: &Project) -> StorageResult<()> {
        projects::insert(&self.conn.lock(), project)
    }

    pub fn get_project(&self, tenant_id: &TenantId, project_id: &ProjectId) -> StorageResult<Option<Project>> {
        projects::get(&self.conn.lock(), tenant_id, project_id)
    }

    pub fn require_project(&self, tenant_id: &TenantId, project_id: &ProjectId) -> StorageResult<Project> {
        projects::require(&self.conn.lock(), tenant_id, project_id)
    }

    pub fn list_projects(&self, tenant_id: &TenantId) -> StorageResult<Vec<Project>> {
        projects::list(&self.conn.lock(), tenant_id)
    }

    /// Deletes the project and cascades to its jobs and their events,
    /// atomically. Does not touch the on-disk worktree; the caller (the
    /// project-cache layer) removes that best-effort.
    pub fn delete_project(&self, tenant_id: &TenantId, project_id: &ProjectId) -> StorageResult<()> {
        projects::delete_cascade(&mut self.conn.lock(), tenant_id, project_id)
    }

    pub fn mark_project_published(
        &self,
        tenant_id: &TenantId,
        project_id: &ProjectId,
        published_url: &str,
        published_job_id: &JobId,
        at_ms: u64,
    ) -> StorageResult<()> {
        projects::mark_published(
            &self.conn.lock(),
            tenant_id,
            project_id,
            published_url,
            published_job_id.as_str(),
            at_ms,
        )
    }

    // -- jobs --------------------------------------------------------------

    pub fn create_job(&self, job: &Job) -> StorageResult<()> {
        jobs::insert(&self.conn.lock(), job)
    }

    pub fn update_job(&self, job: &Job) -> StorageResult<()> {
        jobs::update(&self.conn.lock(), job)
    }

    pub fn get_job(&self, tenant_id: &TenantId, job_id: &JobId) -> StorageResult<Option<Job>> {
        jobs::get(&self.conn.lock(), tenant_id, job_id)
    }

    pub fn require_job(&self, tenant_id: &TenantId, job_id: &JobId) -> StorageResult<Job> {
        jobs::require(&self.conn.lock(), tenant_id, job_id)
    }

    pub fn list_jobs(&self, tenant_id: &TenantId) -> StorageResult<Vec<Job>> {
        jobs::list(&self.conn.lock(), tenant_id)
    }

    pub fn list_jobs_for_project(&self, tenant_id: &TenantId, project_id: &ProjectId) -> StorageResult<Vec<Job>> {
        jobs::list_for_project(&self.conn.lock(), tenant_id, project_id)
    }

    /// The oldest queued job across all tenants, or `None` if the queue is
    /// empty. Polled by `JobEngine` at `EXECUTOR_POLL_INTERVAL`.
    pub fn next_queued_job(&self) -> StorageResult<Option<Job>> {
        jobs::next_queued(&self.conn.lock())
    }

    /// Every queued job across all tenants, oldest first.
    pub fn list_queued_jobs(&self) -> StorageResult<Vec<Job>> {
        jobs::list_queued(&self.conn.lock())
    }

    // -- events --------------------------------------------------------------

    pub fn append_event(&self, event: &NewEvent) -> StorageResult<Event> {
        events::append(&self.conn.lock(), event)
    }

    pub fn list_events(&self, tenant_id: &TenantId, job_id: &JobId) -> StorageResult<Vec<Event>> {
        events::list_for_job(&self.conn.lock(), tenant_id.as_str(), job_id)
    }

    pub fn list_events_since(&self, job_id: &JobId, after_event_id: i64) -> StorageResult<Vec<Event>> {
        events::list_since(&self.conn.lock(), job_id, after_event_id)
    }

    // -- budgets --------------------------------------------------------------

    pub fn set_budget(&self, budget: &Budget) -> StorageResult<()> {
        budgets::set(&self.conn.lock(), budget)
    }

    pub fn get_budget(&self, tenant_id: &TenantId) -> StorageResult<Option<Budget>> {
        budgets::get(&self.conn.lock(), tenant_id)
    }

    // -- billing --------------------------------------------------------------

    pub fn usage_rows(&self, tenant_id: &TenantId) -> StorageResult<Vec<billing::UsageRow>> {
        billing::usage_rows(&self.conn.lock(), tenant_id)
    }

    pub fn export_rows(&self, tenant_id: &TenantId) -> StorageResult<Vec<billing::ExportRow>> {
        billing::export_rows(&self.conn.lock(), tenant_id)
    }

    pub fn cumulative_tokens(&self, tenant_id: &TenantId) -> StorageResult<Vec<(pf_core::LlmModel, i64, i64)>> {
        billing::cumulative_tokens(&self.conn.lock(), tenant_id)
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
