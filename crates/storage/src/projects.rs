use rusqlite::{params, Connection, OptionalExtension, Row};

use pf_core::{Project, ProjectId, TenantId};

use crate::error::{StorageError, StorageResult};

pub(crate) fn insert(conn: &Connection, project: &Project) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO projects
            (id, tenant_id, name, remote_url, local_path, created_at_ms,
             published_url, published_at_ms, published_job_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            project.id.as_str(),
            project.tenant_id.as_str(),
            project.name,
            project.remote_url,
            project.local_path,
            project.created_at_ms as i64,
            project.published_url,
            project.published_at_ms.map(|v| v as i64),
            project.published_job_id.as_ref().map(|id| id.as_str()),
        ],
    )?;
    Ok(())
}

pub(crate) fn get(
    conn: &Connection,
    tenant_id: &TenantId,
    project_id: &ProjectId,
) -> StorageResult<Option<Project>> {
    conn.query_row(
        "SELECT id, tenant_id, name, remote_url, local_path, created_at_ms,
                published_url, published_at_ms, published_job_id
         FROM projects WHERE tenant_id = ?1 AND id = ?2",
        params![tenant_id.as_str(), project_id.as_str()],
        row_to_project,
    )
    .optional()
    .map_err(StorageError::from)
}

pub(crate) fn require(
    conn: &Connection,
    tenant_id: &TenantId,
    project_id: &ProjectId,
) -> StorageResult<Project> {
    get(conn, tenant_id, project_id)?.ok_or_else(|| StorageError::NotFound {
        kind: "project",
        id: project_id.as_str().to_string(),
    })
}

pub(crate) fn list(conn: &Connection, tenant_id: &TenantId) -> StorageResult<Vec<Project>> {
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, name, remote_url, local_path, created_at_ms,
                published_url, published_at_ms, published_job_id
         FROM projects WHERE tenant_id = ?1 ORDER BY created_at_ms ASC",
    )?;
    let rows = stmt
        .query_map(params![tenant_id.as_str()], row_to_project)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Cascading delete: removes the project's jobs, their events, then the
/// project row itself, all inside one transaction.
pub(crate) fn delete_cascade(
    conn: &mut Connection,
    tenant_id: &TenantId,
    project_id: &ProjectId,
) -> StorageResult<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM events WHERE job_id IN
            (SELECT id FROM jobs WHERE tenant_id = ?1 AND project_id = ?2)",
        params![tenant_id.as_str(), project_id.as_str()],
    )?;
    tx.execute(
        "DELETE FROM jobs WHERE tenant_id = ?1 AND project_id = ?2",
        params![tenant_id.as_str(), project_id.as_str()],
    )?;
    tx.execute(
        "DELETE FROM projects WHERE tenant_id = ?1 AND id = ?2",
        params![tenant_id.as_str(), project_id.as_str()],
    )?;
    tx.commit()?;
    Ok(())
}

pub(crate) fn mark_published(
    conn: &Connection,
    tenant_id: &TenantId,
    project_id: &ProjectId,
    published_url: &str,
    published_job_id: &str,
    at_ms: u64,
) -> StorageResult<()> {
    conn.execute(
        "UPDATE projects SET published_url = ?1, published_at_ms = ?2, published_job_id = ?3
         WHERE tenant_id = ?4 AND id = ?5",
        params![
            published_url,
            at_ms as i64,
            published_job_id,
            tenant_id.as_str(),
            project_id.as_str(),
        ],
    )?;
    Ok(())
}

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: ProjectId::from_string(row.get::<_, String>(0)?),
        tenant_id: TenantId::from(row.get::<_, String>(1)?),
        name: row.get(2)?,
        remote_url: row.get(3)?,
        local_path: row.get(4)?,
        created_at_ms: row.get::<_, i64>(5)? as u64,
        published_url: row.get(6)?,
        published_at_ms: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
        published_job_id: row
            .get::<_, Option<String>>(8)?
            .map(pf_core::JobId::from_string),
    })
}
