//! The job REST surface.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use pf_billing::BillingMeter;
use pf_core::{Clock, Job, JobConfig, JobId, LlmModel, ProjectId, SystemClock};

use crate::error::ApiError;
use crate::state::AppState;
use crate::tenant::AuthenticatedTenant;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub prompt: String,
    pub project_id: Option<String>,
    pub repository_url: Option<String>,
    pub base_branch: Option<String>,
    pub target_branch: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub task_id: String,
    pub status: String,
}

/// `POST /jobs`
///
/// Preconditions: prompt present; at least one of
/// `project_id`/`repository_url`; a given project exists and is owned by
/// the tenant; the tenant's budget is not exhausted (402 otherwise).
pub async fn create_job(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Json(body): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<CreateJobResponse>), ApiError> {
    if body.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt is required".to_string()));
    }
    if body.project_id.is_none() && body.repository_url.is_none() {
        return Err(ApiError::BadRequest(
            "at least one of project_id or repository_url is required".to_string(),
        ));
    }

    let project_id = body.project_id.map(ProjectId::from_string);
    if let Some(project_id) = &project_id {
        // Existence + ownership check; 404s rather than leaking
        // cross-tenant existence.
        state.store.require_project(&tenant, project_id)?;
    }

    let meter = BillingMeter::new(&state.store);
    if !meter.can_admit(&tenant)? {
        return Err(ApiError::BudgetExceeded);
    }

    let model = body.model.as_deref().and_then(LlmModel::parse).unwrap_or_default();
    let mut builder = JobConfig::builder(tenant, body.prompt).llm_model(model);
    if let Some(project_id) = project_id {
        builder = builder.project_id(project_id);
    }
    if let Some(repository_url) = body.repository_url {
        builder = builder.repository_url(repository_url);
    }
    if let Some(base_branch) = body.base_branch {
        builder = builder.source_branch(base_branch);
    }
    if let Some(target_branch) = body.target_branch {
        builder = builder.destination_branch(target_branch);
    }

    let job = Job::new(builder.build(), &SystemClock);
    state.store.create_job(&job)?;

    Ok((StatusCode::ACCEPTED, Json(CreateJobResponse { task_id: job.id.to_string(), status: job.execution_state.to_string() })))
}

/// `GET /jobs/:id`
pub async fn get_job(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job = state.store.require_job(&tenant, &JobId::from_string(id))?;
    Ok(Json(job))
}

/// `GET /jobs`
pub async fn list_jobs(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
) -> Result<Json<Vec<Job>>, ApiError> {
    Ok(Json(state.store.list_jobs(&tenant)?))
}

/// `GET /projects/:id/jobs`
pub async fn list_jobs_for_project(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let project_id = ProjectId::from_string(project_id);
    // Ownership check before leaking which project ids have jobs.
    state.store.require_project(&tenant, &project_id)?;
    Ok(Json(state.store.list_jobs_for_project(&tenant, &project_id)?))
}
