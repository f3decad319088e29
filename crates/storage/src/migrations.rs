//! Linear, versioned schema migrations applied at startup in ascending
//! order. Column-level additions are idempotent (checked via
//! `pragma_table_info` before `ALTER TABLE`).

use rusqlite::Connection;

use crate::error::StorageResult;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    name TEXT NOT NULL,
    remote_url TEXT,
    local_path TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    published_url TEXT,
    published_at_ms INTEGER,
    published_job_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_projects_tenant ON projects(tenant_id);

CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    prompt TEXT NOT NULL,
    project_id TEXT,
    repository_url TEXT,
    source_branch TEXT NOT NULL,
    destination_branch TEXT NOT NULL,
    execution_state TEXT NOT NULL,
    pr_link TEXT,
    preview_url TEXT,
    iteration_count INTEGER NOT NULL DEFAULT 0,
    initiated_at_ms INTEGER NOT NULL,
    last_modified_ms INTEGER NOT NULL,
    llm_model TEXT NOT NULL,
    prompt_tokens INTEGER NOT NULL DEFAULT 0,
    completion_tokens INTEGER NOT NULL DEFAULT 0,
    total_tokens INTEGER NOT NULL DEFAULT 0,
    preflight_seconds INTEGER NOT NULL DEFAULT 0,
    total_job_seconds INTEGER NOT NULL DEFAULT 0,
    files_changed_count INTEGER NOT NULL DEFAULT 0,
    last_diff TEXT,
    error TEXT,
    FOREIGN KEY (project_id) REFERENCES projects(id)
);
CREATE INDEX IF NOT EXISTS idx_jobs_tenant ON jobs(tenant_id);
CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(execution_state);
CREATE INDEX IF NOT EXISTS idx_jobs_project ON jobs(project_id);
CREATE INDEX IF NOT EXISTS idx_jobs_initiated ON jobs(initiated_at_ms);

CREATE TABLE IF NOT EXISTS events (
    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    message TEXT NOT NULL,
    severity TEXT NOT NULL,
    event_time_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_job ON events(job_id, event_time_ms, event_id);

CREATE TABLE IF NOT EXISTS tenant_budgets (
    tenant_id TEXT PRIMARY KEY,
    limit_usd REAL NOT NULL,
    updated_at_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);
"#;

pub(crate) fn run(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    apply_versioned_migrations(conn)?;
    Ok(())
}

fn apply_versioned_migrations(conn: &Connection) -> StorageResult<()> {
    let version: i32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
        .unwrap_or(0);

    if version < 2 {
        let has_error_column: bool = conn
            .prepare("SELECT COUNT(*) FROM pragma_table_info('jobs') WHERE name = 'error'")
            .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
            .map(|c| c > 0)
            .unwrap_or(false);

        if !has_error_column {
            conn.execute_batch("ALTER TABLE jobs ADD COLUMN error TEXT;")?;
        }

        conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
    }

    Ok(())
}
