use rusqlite::{params, Connection, OptionalExtension, Row};

use pf_core::{ExecutionState, Job, JobId, JobMetrics, LlmModel, ProjectId, TenantId};

use crate::error::{StorageError, StorageResult};

pub(crate) fn insert(conn: &Connection, job: &Job) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO jobs
            (id, tenant_id, prompt, project_id, repository_url, source_branch,
             destination_branch, execution_state, pr_link, preview_url,
             iteration_count, initiated_at_ms, last_modified_ms, llm_model,
             prompt_tokens, completion_tokens, total_tokens,
             preflight_seconds, total_job_seconds, files_changed_count,
             last_diff, error)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22)",
        params![
            job.id.as_str(),
            job.tenant_id.as_str(),
            job.prompt,
            job.project_id.as_ref().map(|id| id.as_str().to_string()),
            job.repository_url,
            job.source_branch,
            job.destination_branch,
            job.execution_state.to_string(),
            job.pr_link,
            job.preview_url,
            job.iteration_count,
            job.initiated_at_ms as i64,
            job.last_modified_ms as i64,
            job.llm_model.to_string(),
            job.metrics.prompt_tokens as i64,
            job.metrics.completion_tokens as i64,
            job.metrics.total_tokens as i64,
            job.metrics.preflight_seconds,
            job.metrics.total_job_seconds,
            job.metrics.files_changed_count,
            job.last_diff,
            job.error,
        ],
    )?;
    Ok(())
}

/// Full-row update. Job state and metrics are written together so a
/// consumer never observes a state transition without its matching
/// token/timing counters.
pub(crate) fn update(conn: &Connection, job: &Job) -> StorageResult<()> {
    conn.execute(
        "UPDATE jobs SET
            prompt = ?3, project_id = ?4, repository_url = ?5, source_branch = ?6,
            destination_branch = ?7, execution_state = ?8, pr_link = ?9, preview_url = ?10,
            iteration_count = ?11, initiated_at_ms = ?12, last_modified_ms = ?13, llm_model = ?14,
            prompt_tokens = ?15, completion_tokens = ?16, total_tokens = ?17,
            preflight_seconds = ?18, total_job_seconds = ?19, files_changed_count = ?20,
            last_diff = ?21, error = ?22
         WHERE id = ?1 AND tenant_id = ?2",
        params![
            job.id.as_str(),
            job.tenant_id.as_str(),
            job.prompt,
            job.project_id.as_ref().map(|id| id.as_str().to_string()),
            job.repository_url,
            job.source_branch,
            job.destination_branch,
            job.execution_state.to_string(),
            job.pr_link,
            job.preview_url,
            job.iteration_count,
            job.initiated_at_ms as i64,
            job.last_modified_ms as i64,
            job.llm_model.to_string(),
            job.metrics.prompt_tokens as i64,
            job.metrics.completion_tokens as i64,
            job.metrics.total_tokens as i64,
            job.metrics.preflight_seconds,
            job.metrics.total_job_seconds,
            job.metrics.files_changed_count,
            job.last_diff,
            job.error,
        ],
    )?;
    Ok(())
}

const SELECT_COLUMNS: &str = "id, tenant_id, prompt, project_id, repository_url, source_branch,
     destination_branch, execution_state, pr_link, preview_url,
     iteration_count, initiated_at_ms, last_modified_ms, llm_model,
     prompt_tokens, completion_tokens, total_tokens,
     preflight_seconds, total_job_seconds, files_changed_count,
     last_diff, error";

pub(crate) fn get(conn: &Connection, tenant_id: &TenantId, job_id: &JobId) -> StorageResult<Option<Job>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM jobs WHERE tenant_id = ?1 AND id = ?2"),
        params![tenant_id.as_str(), job_id.as_str()],
        row_to_job,
    )
    .optional()
    .map_err(StorageError::from)
}

pub(crate) fn require(conn: &Connection, tenant_id: &TenantId, job_id: &JobId) -> StorageResult<Job> {
    get(conn, tenant_id, job_id)?.ok_or_else(|| StorageError::NotFound {
        kind: "job",
        id: job_id.as_str().to_string(),
    })
}

pub(crate) fn list(conn: &Connection, tenant_id: &TenantId) -> StorageResult<Vec<Job>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM jobs WHERE tenant_id = ?1 ORDER BY initiated_at_ms ASC"
    ))?;
    let rows = stmt
        .query_map(params![tenant_id.as_str()], row_to_job)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn list_for_project(
    conn: &Connection,
    tenant_id: &TenantId,
    project_id: &ProjectId,
) -> StorageResult<Vec<Job>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM jobs WHERE tenant_id = ?1 AND project_id = ?2 ORDER BY initiated_at_ms ASC"
    ))?;
    let rows = stmt
        .query_map(params![tenant_id.as_str(), project_id.as_str()], row_to_job)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The oldest `queued` job across all tenants. A single engine instance
/// serves one global queue.
pub(crate) fn next_queued(conn: &Connection) -> StorageResult<Option<Job>> {
    conn.query_row(
        &format!(
            "SELECT {SELECT_COLUMNS} FROM jobs WHERE execution_state = 'queued'
             ORDER BY initiated_at_ms ASC LIMIT 1"
        ),
        [],
        row_to_job,
    )
    .optional()
    .map_err(StorageError::from)
}

/// Every `queued` job across all tenants, oldest first. The engine walks
/// this list to find the oldest job whose tenant is not over budget,
/// leaving jobs for over-budget tenants queued rather than dequeuing them.
pub(crate) fn list_queued(conn: &Connection) -> StorageResult<Vec<Job>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM jobs WHERE execution_state = 'queued' ORDER BY initiated_at_ms ASC"
    ))?;
    let rows = stmt.query_map([], row_to_job)?.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<Job> {
    let execution_state = parse_execution_state(&row.get::<_, String>(7)?);
    let llm_model = LlmModel::parse(&row.get::<_, String>(13)?).unwrap_or_default();

    Ok(Job {
        id: JobId::from_string(row.get::<_, String>(0)?),
        tenant_id: TenantId::from(row.get::<_, String>(1)?),
        prompt: row.get(2)?,
        project_id: row.get::<_, Option<String>>(3)?.map(ProjectId::from_string),
        repository_url: row.get(4)?,
        source_branch: row.get(5)?,
        destination_branch: row.get(6)?,
        execution_state,
        pr_link: row.get(8)?,
        preview_url: row.get(9)?,
        iteration_count: row.get::<_, i64>(10)? as u32,
        initiated_at_ms: row.get::<_, i64>(11)? as u64,
        last_modified_ms: row.get::<_, i64>(12)? as u64,
        llm_model,
        metrics: JobMetrics {
            prompt_tokens: row.get::<_, i64>(14)? as u64,
            completion_tokens: row.get::<_, i64>(15)? as u64,
            total_tokens: row.get::<_, i64>(16)? as u64,
            preflight_seconds: row.get(17)?,
            total_job_seconds: row.get(18)?,
            files_changed_count: row.get::<_, i64>(19)? as u32,
        },
        last_diff: row.get(20)?,
        error: row.get(21)?,
    })
}

fn parse_execution_state(s: &str) -> ExecutionState {
    match s {
        "queued" => ExecutionState::Queued,
        "cloning" => ExecutionState::Cloning,
        "building_context" => ExecutionState::BuildingContext,
        "calling_llm" => ExecutionState::CallingLlm,
        "applying_diff" => ExecutionState::ApplyingDiff,
        "running_preflight" => ExecutionState::RunningPreflight,
        "creating_pr" => ExecutionState::CreatingPr,
        "completed" => ExecutionState::Completed,
        _ => ExecutionState::Failed,
    }
}
