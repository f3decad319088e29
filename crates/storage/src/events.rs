use rusqlite::{params, Connection, Row};

use pf_core::{Event, JobId, NewEvent, Severity};

use crate::error::StorageResult;

pub(crate) fn append(conn: &Connection, event: &NewEvent) -> StorageResult<Event> {
    conn.execute(
        "INSERT INTO events (job_id, message, severity, event_time_ms) VALUES (?1, ?2, ?3, ?4)",
        params![
            event.job_id.as_str(),
            event.message,
            event.severity.to_string(),
            event.event_time_ms as i64,
        ],
    )?;
    let event_id = conn.last_insert_rowid();
    Ok(Event {
        event_id,
        job_id: event.job_id,
        message: event.message.clone(),
        severity: event.severity,
        event_time_ms: event.event_time_ms,
    })
}

/// All events for a job, ordered `(event_time_ms, event_id)` ascending.
/// `tenant_id` scopes the lookup via a join against `jobs` so a caller
/// can never read another tenant's log.
pub(crate) fn list_for_job(
    conn: &Connection,
    tenant_id: &str,
    job_id: &JobId,
) -> StorageResult<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT e.event_id, e.job_id, e.message, e.severity, e.event_time_ms
         FROM events e
         JOIN jobs j ON j.id = e.job_id
         WHERE j.tenant_id = ?1 AND e.job_id = ?2
         ORDER BY e.event_time_ms ASC, e.event_id ASC",
    )?;
    let rows = stmt
        .query_map(params![tenant_id, job_id.as_str()], row_to_event)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Events for a job with `event_id` greater than `after`, in replay order.
/// Used by `LogFanOut`'s polling loop to fetch only what is new.
pub(crate) fn list_since(conn: &Connection, job_id: &JobId, after: i64) -> StorageResult<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, job_id, message, severity, event_time_ms
         FROM events WHERE job_id = ?1 AND event_id > ?2
         ORDER BY event_time_ms ASC, event_id ASC",
    )?;
    let rows = stmt
        .query_map(params![job_id.as_str(), after], row_to_event)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        event_id: row.get(0)?,
        job_id: JobId::from_string(row.get::<_, String>(1)?),
        message: row.get(2)?,
        severity: parse_severity(&row.get::<_, String>(3)?),
        event_time_ms: row.get::<_, i64>(4)? as u64,
    })
}

fn parse_severity(s: &str) -> Severity {
    match s {
        "warning" => Severity::Warning,
        "error" => Severity::Error,
        "success" => Severity::Success,
        _ => Severity::Info,
    }
}
