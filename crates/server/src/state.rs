//! `AppState` — the `Arc` handles every route handler shares, matching
//! the `create_router(AppState)` pattern used across the retrieved
//! `ob-poc` example's axum binaries.

use std::sync::Arc;

use pf_engine::LogFanOut;
use pf_storage::JobStore;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub fanout: Arc<LogFanOut>,
    pub config: Arc<Config>,
}
