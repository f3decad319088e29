//! End-to-end: a queued job against a real git repo runs through
//! `JobEngine::run_once` all the way to `completed`, with a scripted LLM
//! and forge client standing in for the two genuinely external
//! collaborators.

use std::sync::Arc;

use pf_core::{Clock, ExecutionState, FakeClock, JobConfig, Project, TenantId};
use pf_engine::{EngineConfig, JobEngine, LogFanOut};
use pf_llm::{FakeLlmClient, LlmRouter, Usage};
use pf_pr::{FakeForgeClient, PrPublisher};
use pf_storage::JobStore;

use crate::prelude::{init_repo, read_file};

const A_DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs\n\
                       --- a/src/lib.rs\n\
                       +++ b/src/lib.rs\n\
                       @@ -1 +1 @@\n\
                       -fn old() {}\n\
                       +fn new() {}\n";

#[tokio::test]
async fn a_queued_job_runs_to_completion_against_a_real_repo() {
    let root = tempfile::tempdir().unwrap();
    let tenant = TenantId::from("lifecycle-tenant");

    let project_id = pf_core::ProjectId::new();
    let repo_path = root.path().join("repos").join(tenant.as_str()).join(project_id.to_string());
    init_repo(&repo_path, &[("src/lib.rs", "fn old() {}\n")]);

    let store = Arc::new(JobStore::open_in_memory().unwrap());
    let clock = FakeClock::new();

    let project = Project::new(
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

    let llm = LlmRouter::new(
        Box::new(FakeLlmClient::responding_with(A_DIFF, Usage { prompt_tokens: 120, completion_tokens: 40 })),
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

    let processed = engine.run_once().await.unwrap();
    assert!(processed, "a queued job was available and should have been picked up");

    let finished = store.require_job(&tenant, &job_id).unwrap();
    assert_eq!(finished.execution_state, ExecutionState::Completed, "error: {:?}", finished.error);
    assert_eq!(read_file(&repo_path, "src/lib.rs"), "fn new() {}\n");

    let events = store.list_events(&tenant, &job_id).unwrap();
    assert!(events.iter().any(|e| e.message.contains("applied diff")));
    assert!(events.iter().any(|e| e.message.contains("job completed")));
}
