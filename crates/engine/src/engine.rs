//! `JobEngine` — the iteration-loop state machine.
//!
//! One instance polls `JobStore` for the oldest queued job whose tenant is
//! not over budget, drives it through `ContextBuilder -> LlmRouter ->
//! DiffValidator -> apply ->
//! PreflightRunner -> AgentPipeline -> PreviewBuilder -> PrPublisher`,
//! bounded by `MAX_ITERATIONS` and the fallback-escalation policy, and
//! persists every state transition and event to `JobStore` before
//! fanning it out live via `LogFanOut`.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::time::Instant;

use pf_agents::{run_qa_agent, run_ux_agent, scan_security};
use pf_billing::BillingMeter;
use pf_core::{Clock, ExecutionState, IterationState, Job, JobId, NewEvent, Severity};
use pf_diff::{FsGitProbe, Rejection, ValidatedDiff};
use pf_llm::{Completion, LlmClient, LlmError, LlmRouter};
use pf_pr::{PrPublisher, PublishOutcome, RemoteTarget};
use pf_preview::{build_preview, PreviewOutcome};
use pf_storage::JobStore;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::fallback;
use crate::fanout::LogFanOut;
use crate::git;
use crate::lock::ProjectLock;
use crate::workspace::{self, WorkingDirectory};

/// Maximum characters of a rejected patch preview kept in the event log,
/// matching the debug agent's `MAX_LOG_CHARS` convention.
const MAX_PATCH_PREVIEW_CHARS: usize = 2000;

pub struct JobEngine<C: Clock> {
    store: Arc<JobStore>,
    llm: Arc<LlmRouter>,
    pr_publisher: Arc<PrPublisher>,
    fanout: Arc<LogFanOut>,
    config: EngineConfig,
    clock: C,
}

/// Adapts `LlmRouter` to the single-provider `LlmClient` trait the agent
/// pipeline expects, routing every call through the job's configured
/// model.
struct RoutedLlm<'a> {
    router: &'a LlmRouter,
    model: pf_core::LlmModel,
}

#[async_trait]
impl LlmClient for RoutedLlm<'_> {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, LlmError> {
        self.router.complete(self.model, system_prompt, user_prompt).await
    }
}

/// What the inner iteration produced, so the outer loop can decide
/// whether to retry, escalate to fallback, or stop.
enum IterationOutcome {
    /// Preflight (and, if invoked, the debug agent) succeeded: proceed to
    /// the agent pipeline, preview, and PR.
    Advance,
    /// Recoverable failure with feedback for the next LLM call; loop if
    /// iterations remain.
    Retry,
    /// A threshold was crossed; terminate the job as `failed` with the
    /// given reason.
    Fatal(String),
}

impl<C: Clock> JobEngine<C> {
    pub fn new(
        store: Arc<JobStore>,
        llm: Arc<LlmRouter>,
        pr_publisher: Arc<PrPublisher>,
        fanout: Arc<LogFanOut>,
        config: EngineConfig,
        clock: C,
    ) -> Self {
        Self { store, llm, pr_publisher, fanout, config, clock }
    }

    /// Poll forever at `EXECUTOR_POLL_INTERVAL`, running one job to
    /// completion at a time (one job at a time per engine instance).
    pub async fn run_forever(self: Arc<Self>) {
        loop {
            match self.run_once().await {
                Ok(true) => continue,
                Ok(false) => tokio::time::sleep(self.config.poll_interval).await,
                Err(err) => {
                    tracing::error!(error = %err, "engine iteration failed outside job scope");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    /// Pick up and fully execute the oldest queued job whose tenant is not
    /// over budget, if any. Jobs belonging to an over-budget tenant are
    /// left queued rather than dequeued, since spend accrues during
    /// execution and a tenant can cross its limit mid-run even though
    /// every one of its queued jobs passed the budget gate at creation
    /// time. Returns `Ok(true)` if a job was processed (so the caller
    /// polls again immediately rather than sleeping).
    pub async fn run_once(&self) -> EngineResult<bool> {
        let meter = BillingMeter::new(&self.store);
        for mut job in self.store.list_queued_jobs()? {
            if meter.can_admit(&job.tenant_id)? {
                self.run_job(&mut job).await;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn emit(&self, job_id: JobId, severity: Severity, message: impl Into<String>) {
        let event = NewEvent::new(job_id, severity, message, self.clock.epoch_ms());
        match self.store.append_event(&event) {
            Ok(persisted) => self.fanout.publish(persisted),
            Err(err) => tracing::error!(job_id = %job_id, error = %err, "failed to persist event"),
        }
    }

    fn persist(&self, job: &Job) {
        if let Err(err) = self.store.update_job(job) {
            tracing::error!(job_id = %job.id, error = %err, "failed to persist job state");
        }
    }

    async fn run_job(&self, job: &mut Job) {
        let start = Instant::now();
        tracing::info!(job_id = %job.id, tenant_id = %job.tenant_id, "starting job");

        let project = match job.project_id {
            Some(project_id) => match self.store.require_project(&job.tenant_id, &project_id) {
                Ok(project) => Some(project),
                Err(err) => return self.fail_job(job, format!("project lookup failed: {err}")),
            },
            None => None,
        };

        let _lock = if let Some(project) = &project {
            let project_id = project.id;
            let locks_dir = self.config.locks_dir();
            match tokio::task::spawn_blocking(move || ProjectLock::acquire(&locks_dir, &project_id)).await {
                Ok(Ok(lock)) => Some(lock),
                Ok(Err(err)) => return self.fail_job(job, format!("failed to acquire project lock: {err}")),
                Err(err) => return self.fail_job(job, format!("project lock task panicked: {err}")),
            }
        } else {
            None
        };

        job.transition(ExecutionState::Cloning, &self.clock);
        self.persist(job);
        self.emit(job.id, Severity::Info, "resolving working directory");

        let working_dir = match workspace::resolve(&self.config, job, project.as_ref()).await {
            Ok(working_dir) => working_dir,
            Err(err) => return self.fail_job(job, format!("failed to resolve working directory: {err}")),
        };
        let worktree = working_dir.path().to_path_buf();

        if let Err(err) =
            git::configure_committer(&worktree, &self.config.git_author_name, &self.config.git_author_email).await
        {
            return self.fail_job(job, format!("failed to configure committer identity: {err}"));
        }

        if let Err(err) = git::checkout_or_create_branch(&worktree, &job.source_branch, &job.source_branch).await {
            return self.fail_job(job, format!("failed to checkout source branch: {err}"));
        }
        if let Err(err) =
            git::checkout_or_create_branch(&worktree, &job.destination_branch, &job.source_branch).await
        {
            return self.fail_job(job, format!("failed to create destination branch: {err}"));
        }

        let mut iteration_state = IterationState::default();
        let mut terminal_reason: Option<String> = None;

        'iterations: for iteration in 1..=self.config.max_iterations {
            job.iteration_count = iteration;

            if let Err(err) = git::reset_hard_clean(&worktree).await {
                terminal_reason = Some(format!("failed to reset worktree: {err}"));
                break 'iterations;
            }
            if let Err(err) = git::checkout_existing(&worktree, &job.destination_branch).await {
                terminal_reason = Some(format!("failed to checkout destination branch: {err}"));
                break 'iterations;
            }

            match self.run_iteration(job, &worktree, &mut iteration_state).await {
                IterationOutcome::Advance => break 'iterations,
                IterationOutcome::Retry => continue 'iterations,
                IterationOutcome::Fatal(reason) => {
                    terminal_reason = Some(reason);
                    break 'iterations;
                }
            }
        }

        if let Some(reason) = terminal_reason {
            return self.fail_job(job, reason);
        }
        if job.is_terminal() {
            // run_iteration already moved the job to a terminal state
            // (e.g. a security-critical block) and recorded the reason.
            self.persist(job);
            return;
        }
        if job.iteration_count >= self.config.max_iterations && job.execution_state != ExecutionState::Completed {
            // Exhausted every iteration without ever reaching Advance.
            return self.fail_job(job, "exhausted MAX_ITERATIONS without a passing preflight run".to_string());
        }

        self.finish_job(job, &worktree, project.as_ref()).await;

        if let WorkingDirectory::Legacy { .. } = working_dir {
            if let Err(err) = workspace::cleanup_legacy(&working_dir).await {
                tracing::warn!(job_id = %job.id, error = %err, "failed to clean up legacy checkout");
            }
        }

        job.metrics.total_job_seconds = start.elapsed().as_secs_f64();
        self.persist(job);
    }

    /// Run one `building_context -> calling_llm -> applying_diff ->
    /// running_preflight` iteration.
    async fn run_iteration(
        &self,
        job: &mut Job,
        worktree: &std::path::Path,
        iteration_state: &mut IterationState,
    ) -> IterationOutcome {
        job.transition(ExecutionState::BuildingContext, &self.clock);
        let bundle = pf_context::build_context(worktree, &job.prompt, self.config.max_context_size);

        job.transition(ExecutionState::CallingLlm, &self.clock);
        let user_prompt = build_user_prompt(&job.prompt, &bundle.text, iteration_state);
        let system_prompt = SYSTEM_PROMPT;

        let llm = RoutedLlm { router: &self.llm, model: job.llm_model };
        let completion = match llm.complete(system_prompt, &user_prompt).await {
            Ok(completion) => completion,
            Err(err) => return IterationOutcome::Fatal(format!("LLM request failed: {err}")),
        };
        job.metrics.record_usage(completion.usage.prompt_tokens, completion.usage.completion_tokens);

        job.transition(ExecutionState::ApplyingDiff, &self.clock);
        let probe = FsGitProbe::new(worktree);
        let validated = pf_diff::validate(&completion.text, &job.prompt, &probe, self.config.max_diff_lines);

        let patch_text = match validated {
            Ok(ValidatedDiff::NoChanges) => None,
            Ok(ValidatedDiff::Patch(text)) => Some(text),
            Err(rejection) => return self.handle_diff_rejection(job, iteration_state, rejection),
        };

        if let Some(text) = patch_text {
            match pf_diff::git_apply(worktree, &text) {
                Ok(()) => {
                    iteration_state.clear_failure_counters();
                    iteration_state.clear_fallback();
                    job.metrics.files_changed_count += text.matches("diff --git ").count() as u32;
                    job.last_diff = Some(text.clone());
                    let message = commit_message(job.iteration_count, &job.prompt);
                    if let Err(err) = git::commit_all(worktree, &message).await {
                        self.emit(job.id, Severity::Warning, format!("commit failed: {err}"));
                    }
                    self.emit(job.id, Severity::Success, "applied diff");
                }
                Err(stderr) => return self.handle_apply_failure(job, iteration_state, &stderr),
            }
        } else {
            self.emit(job.id, Severity::Info, "LLM reported no changes needed this iteration");
        }

        self.run_preflight_stage(job, worktree, iteration_state).await
    }

    fn handle_diff_rejection(
        &self,
        job: &Job,
        iteration_state: &mut IterationState,
        rejection: Rejection,
    ) -> IterationOutcome {
        iteration_state.consecutive_diff_failures += 1;
        self.emit(job.id, Severity::Warning, format!("diff rejected: {rejection}"));

        if iteration_state.consecutive_diff_failures >= 3 {
            return IterationOutcome::Fatal(format!("diff validator rejected 3 consecutive patches: {rejection}"));
        }
        iteration_state.pending_feedback = Some(rejection.feedback());
        IterationOutcome::Retry
    }

    fn handle_apply_failure(
        &self,
        job: &Job,
        iteration_state: &mut IterationState,
        stderr: &str,
    ) -> IterationOutcome {
        iteration_state.consecutive_apply_failures += 1;
        self.persist_rejected_patch(job.id, job.iteration_count, stderr);

        let preview: String = stderr.chars().take(MAX_PATCH_PREVIEW_CHARS).collect();
        self.emit(job.id, Severity::Warning, format!("patch apply failed: {preview}"));

        if iteration_state.consecutive_apply_failures >= 3 {
            return IterationOutcome::Fatal(format!("patch apply failed 3 consecutive times: {preview}"));
        }
        if iteration_state.consecutive_apply_failures >= 2 {
            let files = fallback::extract_fallback_files(stderr);
            self.emit(job.id, Severity::Info, fallback::directive(&files));
            iteration_state.fallback_files = Some(files);
        }
        iteration_state.pending_feedback = Some(stderr.to_string());
        IterationOutcome::Retry
    }

    fn persist_rejected_patch(&self, job_id: JobId, iteration: u32, diff_or_stderr: &str) {
        let path = self.config.patches_dir.join(job_id.to_string()).join(format!("iteration-{iteration}.rejected"));
        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!(job_id = %job_id, error = %err, "failed to create patches dir");
                return;
            }
        }
        if let Err(err) = std::fs::write(&path, diff_or_stderr) {
            tracing::warn!(job_id = %job_id, error = %err, "failed to persist rejected patch");
        }
    }

    async fn run_preflight_stage(
        &self,
        job: &mut Job,
        worktree: &std::path::Path,
        iteration_state: &mut IterationState,
    ) -> IterationOutcome {
        job.transition(ExecutionState::RunningPreflight, &self.clock);
        let plan = self.config.preflight_plan();
        if plan.is_empty() {
            return IterationOutcome::Advance;
        }

        let preflight_start = Instant::now();
        let result = pf_preflight::run_preflight(&plan, worktree, self.config.stage_timeout, |kind, line| {
            self.emit(job.id, Severity::Info, format!("[{}] {}", kind.label(), line));
        })
        .await;
        job.metrics.preflight_seconds += preflight_start.elapsed().as_secs_f64();

        let Err(failure) = result else {
            return IterationOutcome::Advance;
        };

        self.emit(job.id, Severity::Warning, format!("preflight stage `{:?}` failed: {}", failure.stage, failure.error));

        let Some(build_command) =
            plan.stages.iter().find(|stage| stage.kind == failure.stage).map(|stage| stage.command.clone())
        else {
            return self.preflight_failure_outcome(job, iteration_state, failure.error);
        };

        let llm = RoutedLlm { router: &self.llm, model: job.llm_model };
        let debug_outcome = pf_agents::run_debug_agent(
            worktree,
            &job.prompt,
            &build_command,
            self.config.stage_timeout,
            &failure.output,
            &llm,
            self.config.max_diff_lines,
        )
        .await;

        match debug_outcome {
            Ok(pf_agents::DebugOutcome::Fixed { attempts }) => {
                self.emit(job.id, Severity::Success, format!("debug agent fixed the build after {attempts} attempt(s)"));
                let message = format!("patchforge: debug agent fix for job {}", job.id);
                if let Err(err) = git::commit_all(worktree, &message).await {
                    self.emit(job.id, Severity::Warning, format!("commit failed: {err}"));
                }
                IterationOutcome::Advance
            }
            Ok(pf_agents::DebugOutcome::StillFailing { last_log, .. }) => {
                self.preflight_failure_outcome(job, iteration_state, last_log)
            }
            Err(err) => self.preflight_failure_outcome(job, iteration_state, err.to_string()),
        }
    }

    fn preflight_failure_outcome(
        &self,
        job: &Job,
        iteration_state: &mut IterationState,
        feedback: String,
    ) -> IterationOutcome {
        if job.iteration_count >= self.config.max_iterations {
            return IterationOutcome::Fatal(format!("preflight still failing at the final iteration: {feedback}"));
        }
        iteration_state.pending_feedback = Some(feedback);
        IterationOutcome::Retry
    }

    /// Run the post-preflight agent pipeline, then preview + PR, then
    /// mark the job `completed`.
    async fn finish_job(&self, job: &mut Job, worktree: &std::path::Path, project: Option<&pf_core::Project>) {
        let llm = RoutedLlm { router: &self.llm, model: job.llm_model };

        match run_qa_agent(
            worktree,
            &job.prompt,
            self.config.test_command.as_deref(),
            self.config.stage_timeout,
            &llm,
            self.config.max_diff_lines,
        )
        .await
        {
            Ok(outcome) => {
                for warning in &outcome.warnings {
                    self.emit(job.id, Severity::Warning, format!("qa agent: {warning}"));
                }
            }
            Err(err) => self.emit(job.id, Severity::Warning, format!("qa agent failed: {err}")),
        }

        match run_ux_agent(&job.prompt, worktree, &llm, self.config.max_diff_lines).await {
            Ok(outcome) => {
                for warning in &outcome.warnings {
                    self.emit(job.id, Severity::Warning, format!("ux agent: {warning}"));
                }
            }
            Err(err) => self.emit(job.id, Severity::Warning, format!("ux agent failed: {err}")),
        }

        let worktree_owned = worktree.to_path_buf();
        let security_report =
            tokio::task::spawn_blocking(move || scan_security(&worktree_owned)).await.unwrap_or_default();
        self.emit(
            job.id,
            Severity::Info,
            format!(
                "security scan: {} critical, {} warning finding(s)",
                security_report.critical_count, security_report.warning_count
            ),
        );
        if security_report.blocked() {
            return self.fail_job(
                job,
                format!("security agent blocked completion: {} critical finding(s)", security_report.critical_count),
            );
        }

        job.transition(ExecutionState::CreatingPr, &self.clock);
        self.persist(job);

        if let Some(build_command) = self.config.build_command.as_deref() {
            match build_preview(worktree, build_command, &self.config.previews_dir, job.id.as_str(), self.config.stage_timeout).await
            {
                PreviewOutcome::Published { preview_url } => {
                    job.preview_url = Some(preview_url.clone());
                    self.emit(job.id, Severity::Success, format!("preview published at {preview_url}"));
                }
                PreviewOutcome::Skipped { reason } => {
                    self.emit(job.id, Severity::Info, format!("preview skipped: {reason}"));
                }
            }
        }

        let remote_url = project
            .and_then(|p| p.remote_url.clone())
            .or_else(|| job.repository_url.clone());
        let remote = remote_url.as_deref().and_then(parse_owner_repo);

        let title = format!("PatchForge: {}", truncate_title(&job.prompt));
        let body = format!("Automated change for job {}.\n\nPrompt:\n{}", job.id, job.prompt);

        let publish_result = self
            .pr_publisher
            .publish(
                worktree,
                job.id.as_str(),
                &job.source_branch,
                &job.destination_branch,
                remote.as_ref().map(|(owner, repo)| RemoteTarget { owner, repo }),
                &title,
                &body,
            )
            .await;

        match publish_result {
            Ok(PublishOutcome::Published { pr }) => {
                job.pr_link = Some(pr.url.clone());
                self.emit(job.id, Severity::Success, format!("opened pull request {}", pr.url));
            }
            Ok(PublishOutcome::LocalOnly) => {
                self.emit(job.id, Severity::Info, "no remote configured; checkpoint tag created locally");
            }
            Err(err) => {
                // Preview/PR failure for local-only projects is non-fatal
                // a configured remote that fails to publish
                // still completes the job with the checkpoint tag.
                self.emit(job.id, Severity::Warning, format!("pull request publish failed: {err}"));
            }
        }

        job.complete(&self.clock);
        self.emit(job.id, Severity::Success, "job completed");
        self.fanout.retire(&job.id);
    }

    fn fail_job(&self, job: &mut Job, reason: String) {
        tracing::warn!(job_id = %job.id, reason = %reason, "job failed");
        self.emit(job.id, Severity::Error, reason.clone());
        job.fail(reason, &self.clock);
        self.persist(job);
        self.fanout.retire(&job.id);
    }
}

const SYSTEM_PROMPT: &str = "You are the code-modification agent in an autonomous pipeline. \
    Given a task and repository context, respond with a single unified diff (git apply \
    compatible) implementing the change, or the literal text NO_CHANGES if nothing needs to \
    change. Never include explanation outside the diff.";

fn build_user_prompt(job_prompt: &str, context: &str, iteration_state: &IterationState) -> String {
    let mut prompt = String::new();
    prompt.push_str("Task: ");
    prompt.push_str(job_prompt);
    prompt.push_str("\n\nRepository context:\n");
    prompt.push_str(context);

    if let Some(files) = &iteration_state.fallback_files {
        prompt.push_str("\n\n");
        prompt.push_str(&fallback::directive(files));
    }
    if let Some(feedback) = &iteration_state.pending_feedback {
        prompt.push_str("\n\nFeedback from the previous attempt:\n");
        prompt.push_str(feedback);
    }
    prompt
}

fn truncate_title(prompt: &str) -> String {
    const MAX: usize = 72;
    if prompt.len() <= MAX {
        prompt.to_string()
    } else {
        format!("{}...", &prompt[..MAX])
    }
}

/// `VIBE iteration <i>: <first 50 chars of prompt>`.
fn commit_message(iteration: u32, prompt: &str) -> String {
    let prefix: String = prompt.chars().take(50).collect();
    format!("VIBE iteration {iteration}: {prefix}")
}

#[allow(clippy::expect_used)]
static GITHUB_REMOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"github\.com[:/]([^/]+)/([^/.]+?)(?:\.git)?/?$").expect("constant regex pattern is valid")
});

/// Parse `owner/repo` out of a GitHub remote URL (HTTPS or SSH form).
fn parse_owner_repo(remote_url: &str) -> Option<(String, String)> {
    let captures = GITHUB_REMOTE.captures(remote_url)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}
