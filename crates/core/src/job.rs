//! Job identifier, execution state machine, and iteration metrics.

use crate::clock::Clock;
use crate::tenant::TenantId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a job instance.
    #[derive(Default)]
    pub struct JobId("job-");
}

crate::define_id! {
    /// Unique identifier for a project.
    #[derive(Default)]
    pub struct ProjectId("prj-");
}

/// Which LLM provider a job's iterations are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmModel {
    Claude,
    Gpt,
}

impl Default for LlmModel {
    fn default() -> Self {
        LlmModel::Claude
    }
}

crate::simple_display! {
    LlmModel {
        Claude => "claude",
        Gpt => "gpt",
    }
}

impl LlmModel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "claude" => Some(LlmModel::Claude),
            "gpt" => Some(LlmModel::Gpt),
            _ => None,
        }
    }
}

/// The job lifecycle state machine.
///
/// ```text
/// queued -> cloning -> building_context -> calling_llm -> applying_diff
///                                  ^----------------------------|  (retry within iteration)
/// applying_diff -> running_preflight -> creating_pr -> completed
///               \ (preflight fail)  /
/// any_non_terminal -> failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Queued,
    Cloning,
    BuildingContext,
    CallingLlm,
    ApplyingDiff,
    RunningPreflight,
    CreatingPr,
    Completed,
    Failed,
}

crate::simple_display! {
    ExecutionState {
        Queued => "queued",
        Cloning => "cloning",
        BuildingContext => "building_context",
        CallingLlm => "calling_llm",
        ApplyingDiff => "applying_diff",
        RunningPreflight => "running_preflight",
        CreatingPr => "creating_pr",
        Completed => "completed",
        Failed => "failed",
    }
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::Failed)
    }
}

/// Default maximum number of iterations a job may attempt before it is
/// forced to a terminal `failed` state (configurable via `MAX_ITERATIONS`).
pub const DEFAULT_MAX_ITERATIONS: u32 = 6;

/// Configuration used to create a new job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub prompt: String,
    pub project_id: Option<ProjectId>,
    pub repository_url: Option<String>,
    pub source_branch: String,
    pub destination_branch: String,
    pub llm_model: LlmModel,
}

impl JobConfig {
    pub fn builder(tenant_id: TenantId, prompt: impl Into<String>) -> JobConfigBuilder {
        JobConfigBuilder {
            id: JobId::new(),
            tenant_id,
            prompt: prompt.into(),
            project_id: None,
            repository_url: None,
            source_branch: "main".to_string(),
            destination_branch: String::new(),
            llm_model: LlmModel::Claude,
        }
    }
}

pub struct JobConfigBuilder {
    id: JobId,
    tenant_id: TenantId,
    prompt: String,
    project_id: Option<ProjectId>,
    repository_url: Option<String>,
    source_branch: String,
    destination_branch: String,
    llm_model: LlmModel,
}

impl JobConfigBuilder {
    crate::setters! {
        into {
            source_branch: String,
            destination_branch: String,
        }
        set {
            llm_model: LlmModel,
        }
        option {
            project_id: ProjectId,
            repository_url: String,
        }
    }

    pub fn build(mut self) -> JobConfig {
        if self.destination_branch.is_empty() {
            self.destination_branch = format!("vibe/{}", self.id.suffix());
        }
        JobConfig {
            id: self.id,
            tenant_id: self.tenant_id,
            prompt: self.prompt,
            project_id: self.project_id,
            repository_url: self.repository_url,
            source_branch: self.source_branch,
            destination_branch: self.destination_branch,
            llm_model: self.llm_model,
        }
    }
}

/// Cumulative token/timing/metrics for a job, updated after every LLM call
/// and preflight run — written even when the job ultimately fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobMetrics {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub preflight_seconds: f64,
    pub total_job_seconds: f64,
    pub files_changed_count: u32,
}

impl JobMetrics {
    pub fn record_usage(&mut self, prompt_tokens: u64, completion_tokens: u64) {
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
        self.total_tokens += prompt_tokens + completion_tokens;
    }
}

/// The unit of pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub prompt: String,
    pub project_id: Option<ProjectId>,
    pub repository_url: Option<String>,
    pub source_branch: String,
    pub destination_branch: String,
    pub execution_state: ExecutionState,
    pub pr_link: Option<String>,
    pub preview_url: Option<String>,
    pub iteration_count: u32,
    pub initiated_at_ms: u64,
    pub last_modified_ms: u64,
    pub llm_model: LlmModel,
    pub metrics: JobMetrics,
    pub last_diff: Option<String>,
    pub error: Option<String>,
}

impl Job {
    /// Create a new job in the `queued` state.
    pub fn new(config: JobConfig, clock: &impl Clock) -> Self {
        let now = clock.epoch_ms();
        Self {
            id: config.id,
            tenant_id: config.tenant_id,
            prompt: config.prompt,
            project_id: config.project_id,
            repository_url: config.repository_url,
            source_branch: config.source_branch,
            destination_branch: config.destination_branch,
            execution_state: ExecutionState::Queued,
            pr_link: None,
            preview_url: None,
            iteration_count: 0,
            initiated_at_ms: now,
            last_modified_ms: now,
            llm_model: config.llm_model,
            metrics: JobMetrics::default(),
            last_diff: None,
            error: None,
        }
    }

    /// Transition to a new state, bumping `last_modified_ms`.
    ///
    /// Debug-asserts the transition is forward-only or a terminal jump —
    /// callers (the engine) are the single source of truth for *which*
    /// transitions are legal; this only guards against resurrecting a
    /// terminal job, since `completed`/`failed` are terminal states.
    pub fn transition(&mut self, next: ExecutionState, clock: &impl Clock) {
        debug_assert!(
            !self.execution_state.is_terminal(),
            "attempted to transition a terminal job {} from {} to {}",
            self.id,
            self.execution_state,
            next
        );
        self.execution_state = next;
        self.last_modified_ms = clock.epoch_ms();
    }

    pub fn fail(&mut self, reason: impl Into<String>, clock: &impl Clock) {
        self.error = Some(reason.into());
        self.execution_state = ExecutionState::Failed;
        self.last_modified_ms = clock.epoch_ms();
    }

    pub fn complete(&mut self, clock: &impl Clock) {
        self.execution_state = ExecutionState::Completed;
        self.last_modified_ms = clock.epoch_ms();
    }

    pub fn is_terminal(&self) -> bool {
        self.execution_state.is_terminal()
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            prompt: String = "add a feature",
            source_branch: String = "main",
            destination_branch: String = "vibe/test",
        }
        set {
            tenant_id: TenantId = TenantId::from("tenant-test"),
            execution_state: ExecutionState = ExecutionState::Queued,
            iteration_count: u32 = 0,
            initiated_at_ms: u64 = 1_700_000_000_000,
            last_modified_ms: u64 = 1_700_000_000_000,
            llm_model: LlmModel = LlmModel::Claude,
            metrics: JobMetrics = JobMetrics::default(),
        }
        option {
            id: JobId = None,
            project_id: ProjectId = None,
            repository_url: String = None,
            pr_link: String = None,
            preview_url: String = None,
            last_diff: String = None,
            error: String = None,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for Job {
    fn default() -> Self {
        Job::builder().id(JobId::new()).build()
    }
}

/// Per-iteration bookkeeping kept on the engine's stack — never persisted,
/// never escapes the engine.
#[derive(Debug, Clone, Default)]
pub struct IterationState {
    pub consecutive_diff_failures: u32,
    pub consecutive_apply_failures: u32,
    pub pending_feedback: Option<String>,
    pub fallback_files: Option<Vec<String>>,
}

impl IterationState {
    /// True once global fallback mode (no specific files) is active.
    pub fn is_global_fallback(&self) -> bool {
        matches!(&self.fallback_files, Some(files) if files.is_empty())
    }

    pub fn clear_fallback(&mut self) {
        self.fallback_files = None;
    }

    pub fn clear_failure_counters(&mut self) {
        self.consecutive_diff_failures = 0;
        self.consecutive_apply_failures = 0;
        self.pending_feedback = None;
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
