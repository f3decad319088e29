//! `pf-server` — the binary that wires the REST/SSE surface
//! around the `pf-engine` core: loads `ConfigRegistry`, opens the durable
//! `JobStore`, spawns `JobEngine::run_forever` as a background task, and
//! serves the HTTP API with `axum`.

mod config;
mod error;
mod routes;
mod state;
mod tenant;

use std::sync::Arc;

use anyhow::Result;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pf_core::SystemClock;
use pf_engine::{EngineConfig, JobEngine, LogFanOut};
use pf_llm::{ClaudeClient, GptClient, LlmRouter};
use pf_pr::{GithubForgeClient, PrPublisher};
use pf_storage::JobStore;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::from_env()?;
    config.ensure_directories()?;

    let store = Arc::new(JobStore::open(&config.database_path)?);
    let fanout = Arc::new(LogFanOut::new());

    let llm_router = Arc::new(LlmRouter::new(
        Box::new(ClaudeClient::new(config.anthropic_api_key.clone())),
        Box::new(GptClient::new(config.openai_api_key.clone())),
    ));
    let forge_token = config.github_token.clone().unwrap_or_default();
    let pr_publisher = Arc::new(PrPublisher::new(Box::new(GithubForgeClient::new(forge_token))));

    let engine_config: EngineConfig = config.engine_config();
    let engine = Arc::new(JobEngine::new(
        store.clone(),
        llm_router.clone(),
        pr_publisher.clone(),
        fanout.clone(),
        engine_config,
        SystemClock,
    ));
    tokio::spawn(engine.run_forever());

    let bind_addr = config.bind_addr;
    let state = AppState { store, fanout, config: Arc::new(config) };

    let app = routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!(%bind_addr, "pf-server listening");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
