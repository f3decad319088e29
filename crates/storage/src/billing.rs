use rusqlite::{params, Connection, Row};

use pf_core::{JobId, LlmModel, TenantId};

use crate::error::StorageResult;

/// One row of the usage aggregation: summed tokens and job count for a
/// single `(day, model)` bucket, scoped to one tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRow {
    pub day: String,
    pub model: LlmModel,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub job_count: i64,
}

/// One per-job row for CSV export (`export(tenant)`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub job_id: JobId,
    pub day: String,
    pub model: LlmModel,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
}

/// Rows grouped by `(UTC date, model)`, restricted to rows where at least
/// one token column is non-null, and always bound to `tenant_id`.
pub(crate) fn usage_rows(conn: &Connection, tenant_id: &TenantId) -> StorageResult<Vec<UsageRow>> {
    let mut stmt = conn.prepare(
        "SELECT date(initiated_at_ms / 1000, 'unixepoch') AS day,
                llm_model,
                SUM(prompt_tokens) AS prompt_tokens,
                SUM(completion_tokens) AS completion_tokens,
                COUNT(*) AS job_count
         FROM jobs
         WHERE tenant_id = ?1 AND (prompt_tokens IS NOT NULL OR completion_tokens IS NOT NULL)
         GROUP BY day, llm_model
         ORDER BY day ASC, llm_model ASC",
    )?;
    let rows = stmt
        .query_map(params![tenant_id.as_str()], row_to_usage)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn export_rows(conn: &Connection, tenant_id: &TenantId) -> StorageResult<Vec<ExportRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, date(initiated_at_ms / 1000, 'unixepoch') AS day,
                llm_model, prompt_tokens, completion_tokens
         FROM jobs WHERE tenant_id = ?1 ORDER BY initiated_at_ms ASC",
    )?;
    let rows = stmt
        .query_map(params![tenant_id.as_str()], row_to_export)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Cumulative spend, expressed as summed tokens per model across every job
/// the tenant has ever run. `pf-billing` applies the rate table on top.
pub(crate) fn cumulative_tokens(conn: &Connection, tenant_id: &TenantId) -> StorageResult<Vec<(LlmModel, i64, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT llm_model, SUM(prompt_tokens), SUM(completion_tokens)
         FROM jobs WHERE tenant_id = ?1 GROUP BY llm_model",
    )?;
    let rows = stmt
        .query_map(params![tenant_id.as_str()], |row| {
            let model = LlmModel::parse(&row.get::<_, String>(0)?).unwrap_or_default();
            Ok((model, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_usage(row: &Row<'_>) -> rusqlite::Result<UsageRow> {
    Ok(UsageRow {
        day: row.get(0)?,
        model: LlmModel::parse(&row.get::<_, String>(1)?).unwrap_or_default(),
        prompt_tokens: row.get(2)?,
        completion_tokens: row.get(3)?,
        job_count: row.get(4)?,
    })
}

fn row_to_export(row: &Row<'_>) -> rusqlite::Result<ExportRow> {
    Ok(ExportRow {
        job_id: JobId::from_string(row.get::<_, String>(0)?),
        day: row.get(1)?,
        model: LlmModel::parse(&row.get::<_, String>(2)?).unwrap_or_default(),
        prompt_tokens: row.get(3)?,
        completion_tokens: row.get(4)?,
    })
}
