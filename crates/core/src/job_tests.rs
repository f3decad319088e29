use super::*;
use crate::clock::FakeClock;

#[test]
fn new_job_starts_queued() {
    let clock = FakeClock::new();
    let config = JobConfig::builder(TenantId::from("t1"), "do a thing").build();
    let job = Job::new(config, &clock);
    assert_eq!(job.execution_state, ExecutionState::Queued);
    assert!(!job.is_terminal());
}

#[test]
fn destination_branch_defaults_from_job_id() {
    let config = JobConfig::builder(TenantId::from("t1"), "do a thing").build();
    assert!(config.destination_branch.starts_with("vibe/"));
}

#[test]
fn transition_updates_last_modified() {
    let clock = FakeClock::new();
    let config = JobConfig::builder(TenantId::from("t1"), "x").build();
    let mut job = Job::new(config, &clock);
    let before = job.last_modified_ms;
    clock.advance(std::time::Duration::from_millis(10));
    job.transition(ExecutionState::Cloning, &clock);
    assert_eq!(job.execution_state, ExecutionState::Cloning);
    assert!(job.last_modified_ms > before);
}

#[test]
fn fail_sets_terminal_state_and_reason() {
    let clock = FakeClock::new();
    let config = JobConfig::builder(TenantId::from("t1"), "x").build();
    let mut job = Job::new(config, &clock);
    job.fail("boom", &clock);
    assert_eq!(job.execution_state, ExecutionState::Failed);
    assert_eq!(job.error.as_deref(), Some("boom"));
    assert!(job.is_terminal());
}

#[test]
fn llm_model_defaults_to_claude_and_parses() {
    assert_eq!(LlmModel::default(), LlmModel::Claude);
    assert_eq!(LlmModel::parse("gpt"), Some(LlmModel::Gpt));
    assert_eq!(LlmModel::parse("unknown"), None);
}

#[test]
fn iteration_state_tracks_global_vs_scoped_fallback() {
    let mut iter = IterationState::default();
    assert!(!iter.is_global_fallback());
    iter.fallback_files = Some(vec!["src/a.ts".to_string()]);
    assert!(!iter.is_global_fallback());
    iter.fallback_files = Some(vec![]);
    assert!(iter.is_global_fallback());
    iter.clear_fallback();
    assert!(iter.fallback_files.is_none());
}
