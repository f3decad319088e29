mod billing;
mod jobs;
mod projects;
mod sse;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/billing/usage/:tenant_id", get(billing::get_usage))
        .route("/billing/export/:tenant_id", get(billing::get_export))
        .route("/billing/budget/:tenant_id", post(billing::post_budget))
        .route("/projects", post(projects::create_project).get(projects::list_projects))
        .route("/projects/:id", get(projects::get_project).delete(projects::delete_project))
        .route("/projects/:id/jobs", get(jobs::list_jobs_for_project))
        .route("/jobs", post(jobs::create_job).get(jobs::list_jobs))
        .route("/jobs/:id", get(jobs::get_job))
        .route("/jobs/:id/logs", get(sse::job_logs))
        .with_state(state)
}
