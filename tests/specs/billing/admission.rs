//! Billing admission scenarios at the level a real job-creation request
//! would exercise it: usage recorded by completed jobs changes whether the
//! *next* job may be admitted.

use pf_billing::BillingMeter;
use pf_core::{JobBuilder, JobId, LlmModel, TenantId};
use pf_storage::JobStore;

#[test]
fn admission_flips_once_recorded_spend_reaches_the_limit() {
    let store = JobStore::open_in_memory().unwrap();
    let tenant = TenantId::from("acme");
    let meter = BillingMeter::new(&store);

    meter.set_budget(&tenant, 0.02, 1).unwrap();
    assert!(meter.can_admit(&tenant).unwrap(), "no spend yet, budget not exhausted");

    let mut job = JobBuilder::default().id(JobId::new()).tenant_id(tenant.clone()).llm_model(LlmModel::Claude).build();
    job.metrics.record_usage(5_000_000, 1_000_000); // $15 + $15 = $30 way over a $0.02 cap
    store.create_job(&job).unwrap();

    assert!(!meter.can_admit(&tenant).unwrap(), "spend now exceeds the configured budget");
}

#[test]
fn raising_the_budget_re_admits_a_blocked_tenant() {
    let store = JobStore::open_in_memory().unwrap();
    let tenant = TenantId::from("acme-2");
    let meter = BillingMeter::new(&store);

    let mut job = JobBuilder::default().id(JobId::new()).tenant_id(tenant.clone()).build();
    job.metrics.record_usage(2_000_000, 0); // $6 at the claude input rate
    store.create_job(&job).unwrap();

    meter.set_budget(&tenant, 1.0, 1).unwrap();
    assert!(!meter.can_admit(&tenant).unwrap());

    meter.set_budget(&tenant, 100.0, 2).unwrap();
    assert!(meter.can_admit(&tenant).unwrap());
}
