use rusqlite::{params, Connection, OptionalExtension};

use pf_core::{Budget, TenantId};

use crate::error::{StorageError, StorageResult};

pub(crate) fn set(conn: &Connection, budget: &Budget) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO tenant_budgets (tenant_id, limit_usd, updated_at_ms) VALUES (?1, ?2, ?3)
         ON CONFLICT(tenant_id) DO UPDATE SET limit_usd = excluded.limit_usd,
                                               updated_at_ms = excluded.updated_at_ms",
        params![budget.tenant_id.as_str(), budget.limit_usd, budget.updated_at_ms as i64],
    )?;
    Ok(())
}

pub(crate) fn get(conn: &Connection, tenant_id: &TenantId) -> StorageResult<Option<Budget>> {
    conn.query_row(
        "SELECT tenant_id, limit_usd, updated_at_ms FROM tenant_budgets WHERE tenant_id = ?1",
        params![tenant_id.as_str()],
        |row| {
            Ok(Budget {
                tenant_id: TenantId::from(row.get::<_, String>(0)?),
                limit_usd: row.get(1)?,
                updated_at_ms: row.get::<_, i64>(2)? as u64,
            })
        },
    )
    .optional()
    .map_err(StorageError::from)
}
