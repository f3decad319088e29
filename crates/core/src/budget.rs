//! Per-tenant spending ceiling.

use crate::tenant::TenantId;
use serde::{Deserialize, Serialize};

/// `(tenant_id -> limit_usd, updated_at)`. Upsert only: a later
/// `set_budget` for a tenant replaces the prior limit in place rather
/// than appending a history row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub tenant_id: TenantId,
    pub limit_usd: f64,
    pub updated_at_ms: u64,
}
