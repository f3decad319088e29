//! A budget or blocked status set for one tenant must never leak into
//! another tenant's admission decision.

use pf_billing::BillingMeter;
use pf_core::{JobBuilder, JobId, TenantId};
use pf_storage::JobStore;

#[test]
fn one_tenants_exhausted_budget_does_not_block_another() {
    let store = JobStore::open_in_memory().unwrap();
    let blocked = TenantId::from("blocked-tenant");
    let fine = TenantId::from("fine-tenant");
    let meter = BillingMeter::new(&store);

    let mut job = JobBuilder::default().id(JobId::new()).tenant_id(blocked.clone()).build();
    job.metrics.record_usage(10_000_000, 10_000_000);
    store.create_job(&job).unwrap();
    meter.set_budget(&blocked, 1.0, 1).unwrap();

    assert!(!meter.can_admit(&blocked).unwrap());
    assert!(meter.can_admit(&fine).unwrap(), "an unrelated tenant with no budget row must still be admitted");
}
