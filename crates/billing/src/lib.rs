// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pf-billing: `BillingMeter` — cost accounting over metered LLM usage
//! and the pre-admission budget gate every new job passes through.

mod csv;

pub use csv::export_csv;

use pf_core::{Budget, LlmModel, TenantId};
use pf_storage::{JobStore, StorageResult};
use thiserror::Error;

/// Per-million-token USD rate for one provider.
#[derive(Debug, Clone, Copy)]
pub struct Rate {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Fixed rate table. Unknown models fall back to `claude`.
pub fn rate_for(model: LlmModel) -> Rate {
    match model {
        LlmModel::Claude => Rate { input_per_million: 3.0, output_per_million: 15.0 },
        LlmModel::Gpt => Rate { input_per_million: 10.0, output_per_million: 30.0 },
    }
}

/// `cost = prompt_tokens/1e6 * input + completion_tokens/1e6 * output`.
pub fn cost_usd(model: LlmModel, prompt_tokens: i64, completion_tokens: i64) -> f64 {
    let rate = rate_for(model);
    (prompt_tokens as f64 / 1_000_000.0) * rate.input_per_million
        + (completion_tokens as f64 / 1_000_000.0) * rate.output_per_million
}

/// One row of `usage(tenant)`: a `(date, model)` bucket with summed
/// tokens, job count, and computed cost.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSummaryRow {
    pub date: String,
    pub model: LlmModel,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub job_count: i64,
    pub cost_usd: f64,
}

/// `GET /billing/usage/<tenantId>` payload shape.
#[derive(Debug, Clone)]
pub struct UsageReport {
    pub tenant_id: TenantId,
    pub total_spend: f64,
    pub budget_limit: Option<f64>,
    pub rows: Vec<UsageSummaryRow>,
}

/// One row of `export(tenant)`, ready for CSV rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummaryRow {
    pub date: String,
    pub model: LlmModel,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub task_id: String,
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error(transparent)]
    Storage(#[from] pf_storage::StorageError),
    #[error("budget limit must be a non-negative number, got {0}")]
    InvalidLimit(f64),
}

pub type BillingResult<T> = Result<T, BillingError>;

/// Cost accounting and the pre-admission budget gate, over a `JobStore`
/// handle.
pub struct BillingMeter<'a> {
    store: &'a JobStore,
}

impl<'a> BillingMeter<'a> {
    pub fn new(store: &'a JobStore) -> Self {
        Self { store }
    }

    /// Sum of `cost_usd` across every job the tenant has ever run.
    pub fn cumulative_spend(&self, tenant_id: &TenantId) -> StorageResult<f64> {
        let totals = self.store.cumulative_tokens(tenant_id)?;
        Ok(totals
            .into_iter()
            .map(|(model, prompt_tokens, completion_tokens)| {
                cost_usd(model, prompt_tokens, completion_tokens)
            })
            .sum())
    }

    /// Admission gate: `true` iff a new job may be queued for this
    /// tenant. A tenant with no budget row may always create jobs; a
    /// budget of `0.0` blocks immediately once any spend exists, and
    /// blocks a zero-spend tenant too once spend reaches the limit
    /// (`spend >= limit`).
    pub fn can_admit(&self, tenant_id: &TenantId) -> StorageResult<bool> {
        let Some(budget) = self.store.get_budget(tenant_id)? else { return Ok(true) };
        let spend = self.cumulative_spend(tenant_id)?;
        Ok(spend < budget.limit_usd)
    }

    pub fn set_budget(&self, tenant_id: &TenantId, limit_usd: f64, now_ms: u64) -> BillingResult<()> {
        if !limit_usd.is_finite() || limit_usd < 0.0 {
            return Err(BillingError::InvalidLimit(limit_usd));
        }
        self.store
            .set_budget(&Budget { tenant_id: tenant_id.clone(), limit_usd, updated_at_ms: now_ms })?;
        Ok(())
    }

    pub fn get_budget(&self, tenant_id: &TenantId) -> StorageResult<Option<Budget>> {
        self.store.get_budget(tenant_id)
    }

    /// `GET /billing/usage/<tenantId>` payload.
    pub fn usage(&self, tenant_id: &TenantId) -> StorageResult<UsageReport> {
        let rows = self
            .store
            .usage_rows(tenant_id)?
            .into_iter()
            .map(|row| UsageSummaryRow {
                date: row.day,
                model: row.model,
                input_tokens: row.prompt_tokens,
                output_tokens: row.completion_tokens,
                job_count: row.job_count,
                cost_usd: cost_usd(row.model, row.prompt_tokens, row.completion_tokens),
            })
            .collect::<Vec<_>>();

        let total_spend = rows.iter().map(|r| r.cost_usd).sum();
        let budget_limit = self.store.get_budget(tenant_id)?.map(|b| b.limit_usd);

        Ok(UsageReport { tenant_id: tenant_id.clone(), total_spend, budget_limit, rows })
    }

    /// `GET /billing/export/<tenantId>` payload, one row per job.
    pub fn export(&self, tenant_id: &TenantId) -> StorageResult<Vec<ExportSummaryRow>> {
        Ok(self
            .store
            .export_rows(tenant_id)?
            .into_iter()
            .map(|row| ExportSummaryRow {
                date: row.day,
                model: row.model,
                input_tokens: row.prompt_tokens,
                output_tokens: row.completion_tokens,
                cost_usd: cost_usd(row.model, row.prompt_tokens, row.completion_tokens),
                task_id: row.job_id.to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::{JobBuilder, JobId, TenantId};

    fn store_with_job(tenant: &TenantId, model: LlmModel, prompt_tokens: u64, completion_tokens: u64) -> JobStore {
        let store = JobStore::open_in_memory().unwrap();
        let mut job = JobBuilder::default()
            .id(JobId::new())
            .tenant_id(tenant.clone())
            .llm_model(model)
            .build();
        job.metrics.record_usage(prompt_tokens, completion_tokens);
        store.create_job(&job).unwrap();
        store
    }

    #[test]
    fn cost_arithmetic_matches_the_fixed_rate_table() {
        assert!((cost_usd(LlmModel::Claude, 1000, 500) - 0.0105).abs() < 1e-12);
    }

    #[test]
    fn unknown_budget_always_admits() {
        let tenant = TenantId::from("tenant-a");
        let store = store_with_job(&tenant, LlmModel::Claude, 1_000_000, 1_000_000);
        let meter = BillingMeter::new(&store);
        assert!(meter.can_admit(&tenant).unwrap());
    }

    #[test]
    fn zero_budget_blocks_once_any_spend_exists() {
        let tenant = TenantId::from("tenant-b");
        let store = store_with_job(&tenant, LlmModel::Claude, 1000, 500);
        let meter = BillingMeter::new(&store);
        meter.set_budget(&tenant, 0.0, 1).unwrap();
        assert!(!meter.can_admit(&tenant).unwrap());
    }

    #[test]
    fn zero_spend_zero_budget_tenant_is_blocked() {
        let tenant = TenantId::from("tenant-c");
        let store = JobStore::open_in_memory().unwrap();
        let meter = BillingMeter::new(&store);
        meter.set_budget(&tenant, 0.0, 1).unwrap();
        assert!(!meter.can_admit(&tenant).unwrap());
    }

    #[test]
    fn negative_budget_is_rejected() {
        let tenant = TenantId::from("tenant-d");
        let store = JobStore::open_in_memory().unwrap();
        let meter = BillingMeter::new(&store);
        assert!(matches!(meter.set_budget(&tenant, -1.0, 1), Err(BillingError::InvalidLimit(_))));
    }

    #[test]
    fn set_budget_upserts() {
        let tenant = TenantId::from("tenant-e");
        let store = JobStore::open_in_memory().unwrap();
        let meter = BillingMeter::new(&store);
        meter.set_budget(&tenant, 50.0, 1).unwrap();
        meter.set_budget(&tenant, 75.0, 2).unwrap();
        assert_eq!(meter.get_budget(&tenant).unwrap().unwrap().limit_usd, 75.0);
    }

    #[test]
    fn usage_and_export_never_cross_tenant_boundaries() {
        let a = TenantId::from("tenant-f");
        let b = TenantId::from("tenant-g");
        let store = store_with_job(&a, LlmModel::Claude, 100, 100);
        let mut job_b = JobBuilder::default().id(JobId::new()).tenant_id(b.clone()).build();
        job_b.metrics.record_usage(200, 200);
        store.create_job(&job_b).unwrap();

        let meter = BillingMeter::new(&store);
        let report_a = meter.usage(&a).unwrap();
        assert!(report_a.rows.iter().all(|_| true));
        assert_eq!(report_a.tenant_id, a);
        assert_eq!(meter.export(&a).unwrap().len(), 1);
        assert_eq!(meter.export(&b).unwrap().len(), 1);
    }
}
