//! The fallback-escalation policy: three consecutive rejected patches
//! end the job as `failed` rather than looping forever.

use std::sync::Arc;

use pf_core::{ExecutionState, FakeClock, JobConfig, TenantId};
use pf_engine::{EngineConfig, JobEngine, LogFanOut};
use pf_llm::{Completion, FakeLlmClient, LlmRouter, Usage};
use pf_pr::{FakeForgeClient, PrPublisher};
use pf_storage::JobStore;

use crate::prelude::init_repo;

/// A diff whose context lines never match the checked-out file, so
/// `git apply --check` fails every time — the probe rejects it at stage 5
/// of `pf_diff::validate`, driving `handle_diff_rejection`'s escalation.
const STALE_DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs\n\
                           --- a/src/lib.rs\n\
                           +++ b/src/lib.rs\n\
                           @@ -1 +1 @@\n\
                           -fn this_never_matches() {}\n\
                           +fn new() {}\n";

#[tokio::test]
async fn three_consecutive_unapplicable_patches_fail_the_job() {
    let root = tempfile::tempdir().unwrap();
    let tenant = TenantId::from("escalation-tenant");

    let project_id = pf_core::ProjectId::new();
    let repo_path = root.path().join("repos").join(tenant.as_str()).join(project_id.to_string());
    init_repo(&repo_path, &[("src/lib.rs", "fn old() {}\n")]);

    let store = Arc::new(JobStore::open_in_memory().unwrap());
    let clock = FakeClock::new();

    let project = pf_core::Project::new(
        project_id,
        tenant.clone(),
        "demo".to_string(),
        None,
        repo_path.to_string_lossy().to_string(),
        clock.epoch_ms(),
    );
    store.create_project(&project).unwrap();

    let config = JobConfig::builder(tenant.clone(), "rename old to new").project_id(project_id).build();
    let job = pf_core::Job::new(config, &clock);
    let job_id = job.id;
    store.create_job(&job).unwrap();

    let script = vec![
        Ok(Completion { text: STALE_DIFF.to_string(), usage: Usage::default() }),
        Ok(Completion { text: STALE_DIFF.to_string(), usage: Usage::default() }),
        Ok(Completion { text: STALE_DIFF.to_string(), usage: Usage::default() }),
    ];
    let llm = LlmRouter::new(
        Box::new(FakeLlmClient::scripted(script)),
        Box::new(FakeLlmClient::responding_with("NO_CHANGES", Usage::default())),
    );
    let pr_publisher = PrPublisher::new(Box::new(FakeForgeClient::default()));
    let fanout = LogFanOut::new();

    let engine = JobEngine::new(
        store.clone(),
        Arc::new(llm),
        Arc::new(pr_publisher),
        Arc::new(fanout),
        EngineConfig { repos_base_dir: root.path().join("repos"), patches_dir: root.path().join("patches"), ..EngineConfig::default() },
        clock,
    );

    engine.run_once().await.unwrap();

    let finished = store.require_job(&tenant, &job_id).unwrap();
    assert_eq!(finished.execution_state, ExecutionState::Failed);
    let reason = finished.error.unwrap_or_default();
    assert!(reason.contains("3 consecutive"), "expected the 3-consecutive-failure reason, got: {reason}");
}
