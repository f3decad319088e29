//! Minimal project CRUD. Not itself enumerated in the core REST surface
//! list (which focuses on billing and jobs), but required to exercise
//! the Project entity: a job created against `project_id` must resolve
//! to a real, tenant-owned row.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use pf_core::{Clock, Project, ProjectId, SystemClock};

use crate::error::ApiError;
use crate::state::AppState;
use crate::tenant::AuthenticatedTenant;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub remote_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub remote_url: Option<String>,
    pub created_at: u64,
    pub published_url: Option<String>,
    pub published_at: Option<u64>,
    pub published_job_id: Option<String>,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name,
            remote_url: p.remote_url,
            created_at: p.created_at_ms,
            published_url: p.published_url,
            published_at: p.published_at_ms,
            published_job_id: p.published_job_id.map(|id| id.to_string()),
        }
    }
}

/// `POST /projects`
pub async fn create_project(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let id = ProjectId::new();
    let local_path = state.config.repos_base_dir.join(tenant.as_str()).join(id.to_string());
    let project = Project::new(
        id,
        tenant,
        body.name,
        body.remote_url,
        local_path.to_string_lossy().to_string(),
        SystemClock.epoch_ms(),
    );
    state.store.create_project(&project)?;

    Ok((StatusCode::CREATED, Json(project.into())))
}

/// `GET /projects`
pub async fn list_projects(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = state.store.list_projects(&tenant)?;
    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}

/// `GET /projects/:id`
pub async fn get_project(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let project = state.store.require_project(&tenant, &ProjectId::from_string(id))?;
    Ok(Json(project.into()))
}

/// `DELETE /projects/:id` — cascades to the project's jobs and events,
/// then best-effort removes the on-disk working tree.
pub async fn delete_project(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let project_id = ProjectId::from_string(id);
    let project = state.store.require_project(&tenant, &project_id)?;
    state.store.delete_project(&tenant, &project_id)?;

    if let Err(err) = std::fs::remove_dir_all(&project.local_path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(project_id = %project_id, error = %err, "failed to remove on-disk project tree");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
