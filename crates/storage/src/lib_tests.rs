use super::*;
use pf_core::{test_support::sample_job, Budget, ExecutionState, JobConfig, LlmModel, Project, Severity};

fn store() -> JobStore {
    JobStore::open_in_memory().unwrap()
}

#[test]
fn round_trips_a_job() {
    let store = store();
    let job = sample_job("fix the bug");
    store.create_job(&job).unwrap();

    let fetched = store.require_job(&job.tenant_id, &job.id).unwrap();
    assert_eq!(fetched.prompt, "fix the bug");
    assert_eq!(fetched.execution_state, ExecutionState::Queued);
}

#[test]
fn update_job_persists_state_and_metrics_together() {
    let store = store();
    let mut job = sample_job("add a feature");
    store.create_job(&job).unwrap();

    job.metrics.record_usage(1000, 500);
    job.execution_state = ExecutionState::Completed;
    store.update_job(&job).unwrap();

    let fetched = store.require_job(&job.tenant_id, &job.id).unwrap();
    assert_eq!(fetched.execution_state, ExecutionState::Completed);
    assert_eq!(fetched.metrics.prompt_tokens, 1000);
    assert_eq!(fetched.metrics.completion_tokens, 500);
}

#[test]
fn next_queued_job_picks_the_oldest() {
    let store = store();
    let mut older = sample_job("first");
    older.initiated_at_ms = 1000;
    let mut newer = sample_job("second");
    newer.initiated_at_ms = 2000;

    store.create_job(&newer).unwrap();
    store.create_job(&older).unwrap();

    let picked = store.next_queued_job().unwrap().unwrap();
    assert_eq!(picked.id, older.id);
}

#[test]
fn events_replay_in_order() {
    let store = store();
    let job = sample_job("do something");
    store.create_job(&job).unwrap();

    store.append_event(&pf_core::NewEvent::info(job.id, "first", 10)).unwrap();
    store.append_event(&pf_core::NewEvent::info(job.id, "second", 5)).unwrap();
    store.append_event(&pf_core::NewEvent::success(job.id, "third", 10)).unwrap();

    let events = store.list_events(&job.tenant_id, &job.id).unwrap();
    let messages: Vec<&str> = events.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["second", "first", "third"]);
    assert_eq!(events[2].severity, Severity::Success);
}

#[test]
fn events_are_scoped_to_the_owning_tenant() {
    let store = store();
    let job = sample_job("tenant scoped job");
    store.create_job(&job).unwrap();
    store.append_event(&pf_core::NewEvent::info(job.id, "hello", 1)).unwrap();

    let other_tenant = pf_core::TenantId::from("someone-else");
    let leaked = store.list_events(&other_tenant, &job.id).unwrap();
    assert!(leaked.is_empty());
}

#[test]
fn budget_upsert_overwrites() {
    let store = store();
    let tenant_id = pf_core::TenantId::from("tenant-a");

    store
        .set_budget(&Budget { tenant_id: tenant_id.clone(), limit_usd: 100.0, updated_at_ms: 1 })
        .unwrap();
    assert_eq!(store.get_budget(&tenant_id).unwrap().unwrap().limit_usd, 100.0);

    store
        .set_budget(&Budget { tenant_id: tenant_id.clone(), limit_usd: 50.0, updated_at_ms: 2 })
        .unwrap();
    assert_eq!(store.get_budget(&tenant_id).unwrap().unwrap().limit_usd, 50.0);
}

#[test]
fn project_delete_cascades_to_jobs_and_events() {
    let store = store();
    let tenant_id = pf_core::TenantId::from("tenant-cascade");
    let project = Project::new(
        pf_core::ProjectId::new(),
        tenant_id.clone(),
        "demo",
        None,
        "/tmp/demo",
        1,
    );
    store.create_project(&project).unwrap();

    let job = Job::new(
        JobConfig::builder(tenant_id.clone(), "prompt").project_id(project.id).build(),
        &pf_core::FakeClock::new(),
    );
    store.create_job(&job).unwrap();
    store.append_event(&pf_core::NewEvent::info(job.id, "hi", 1)).unwrap();

    store.delete_project(&tenant_id, &project.id).unwrap();

    assert!(store.get_project(&tenant_id, &project.id).unwrap().is_none());
    assert!(store.get_job(&tenant_id, &job.id).unwrap().is_none());
    assert!(store.list_events(&tenant_id, &job.id).unwrap().is_empty());
}

#[test]
fn usage_rows_are_scoped_and_grouped_by_day_and_model() {
    let store = store();
    let tenant_id = pf_core::TenantId::from("tenant-billing");

    let mut job = sample_job("job one");
    job.tenant_id = tenant_id.clone();
    job.llm_model = LlmModel::Claude;
    job.metrics.record_usage(1000, 500);
    store.create_job(&job).unwrap();

    let rows = store.usage_rows(&tenant_id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].prompt_tokens, 1000);
    assert_eq!(rows[0].completion_tokens, 500);
    assert_eq!(rows[0].job_count, 1);

    let other_tenant = pf_core::TenantId::from("someone-else");
    assert!(store.usage_rows(&other_tenant).unwrap().is_empty());
}
