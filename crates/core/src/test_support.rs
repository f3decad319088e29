//! Test-only builders and helpers shared across crates (feature `test-support`).

use crate::clock::FakeClock;
use crate::job::{Job, JobConfig};
use crate::tenant::TenantId;

/// Build a queued job for a throwaway tenant, using a [`FakeClock`] pinned
/// at its default epoch.
pub fn sample_job(prompt: &str) -> Job {
    let clock = FakeClock::new();
    let config = JobConfig::builder(TenantId::from("tenant-test"), prompt).build();
    Job::new(config, &clock)
}
