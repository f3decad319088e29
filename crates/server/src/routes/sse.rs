//! `GET /jobs/:id/logs` — the SSE contract: replay every
//! existing event, then the live tail, then a terminal marker once the
//! job reaches `completed`/`failed`. Cancellation is whatever dropping
//! the response body does — total and idempotent, nothing to clean up
//! explicitly.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::broadcast;

use pf_core::{Event, ExecutionState, JobId, TenantId};
use pf_storage::JobStore;

use crate::error::ApiError;
use crate::state::AppState;
use crate::tenant::AuthenticatedTenant;

#[derive(Debug, Serialize)]
struct EventFrame<'a> {
    event_id: i64,
    message: &'a str,
    severity: &'a str,
    event_time_ms: u64,
}

#[derive(Debug, Serialize)]
struct CompleteFrame {
    #[serde(rename = "type")]
    kind: &'static str,
    state: String,
}

enum Phase {
    /// Draining the store's replay snapshot before switching to the live
    /// broadcast tail.
    Replay(VecDeque<Event>),
    Live,
}

struct LogStreamState {
    store: Arc<JobStore>,
    tenant: TenantId,
    job_id: JobId,
    phase: Phase,
    rx: broadcast::Receiver<Event>,
    last_event_id: i64,
    /// Set once a forwarded event (or channel closure) reveals the job
    /// reached a terminal state; consumed by the very next poll so the
    /// terminal marker is always the last frame sent.
    terminal_pending: Option<ExecutionState>,
    done: bool,
}

/// `GET /jobs/:id/logs`
pub async fn job_logs(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let job_id = JobId::from_string(id);
    // Subscribe before reading the replay snapshot so no event published
    // in between is ever missed.
    let rx = state.fanout.subscribe(&job_id);
    state.store.require_job(&tenant, &job_id)?;
    let existing = state.store.list_events(&tenant, &job_id)?;

    let initial_state = LogStreamState {
        store: state.store.clone(),
        tenant,
        job_id,
        phase: Phase::Replay(existing.into()),
        rx,
        last_event_id: 0,
        terminal_pending: None,
        done: false,
    };

    let stream = stream::unfold(initial_state, |mut st| async move {
        loop {
            if st.done {
                return None;
            }

            if let Some(final_state) = st.terminal_pending.take() {
                st.done = true;
                return Some((Ok(complete_frame(final_state)), st));
            }

            match &mut st.phase {
                Phase::Replay(queue) => match queue.pop_front() {
                    Some(event) => {
                        st.last_event_id = st.last_event_id.max(event.event_id);
                        return Some((Ok(event_frame(&event)), st));
                    }
                    None => {
                        st.phase = Phase::Live;
                        // The replay snapshot is exhausted: if the job was
                        // already terminal by the time we subscribed, the
                        // broadcast channel may never see another send.
                        mark_terminal_if_done(&mut st);
                        continue;
                    }
                },
                Phase::Live => match st.rx.recv().await {
                    Ok(event) => {
                        if event.event_id <= st.last_event_id {
                            continue;
                        }
                        st.last_event_id = event.event_id;
                        mark_terminal_if_done(&mut st);
                        return Some((Ok(event_frame(&event)), st));
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Fell behind the broadcast buffer: resync from the
                        // durable store rather than treat this as fatal.
                        match st.store.list_events_since(&st.job_id, st.last_event_id) {
                            Ok(missed) => {
                                st.phase = Phase::Replay(missed.into());
                                continue;
                            }
                            Err(_) => {
                                st.done = true;
                                return None;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // The engine retired the channel: the job reached a
                        // terminal state and every prior subscriber left.
                        // The terminal marker must still be delivered.
                        let final_state = st
                            .store
                            .require_job(&st.tenant, &st.job_id)
                            .map(|job| job.execution_state)
                            .unwrap_or(ExecutionState::Failed);
                        st.done = true;
                        return Some((Ok(complete_frame(final_state)), st));
                    }
                },
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn mark_terminal_if_done(st: &mut LogStreamState) {
    if st.terminal_pending.is_some() || st.done {
        return;
    }
    if let Ok(job) = st.store.require_job(&st.tenant, &st.job_id) {
        if job.is_terminal() {
            st.terminal_pending = Some(job.execution_state);
        }
    }
}

fn event_frame(event: &Event) -> SseEvent {
    let frame = EventFrame {
        event_id: event.event_id,
        message: &event.message,
        severity: severity_label(event.severity),
        event_time_ms: event.event_time_ms,
    };
    SseEvent::default().data(serde_json::to_string(&frame).unwrap_or_default())
}

fn complete_frame(state: ExecutionState) -> SseEvent {
    let frame = CompleteFrame { kind: "complete", state: state.to_string() };
    SseEvent::default().data(serde_json::to_string(&frame).unwrap_or_default())
}

fn severity_label(severity: pf_core::Severity) -> &'static str {
    match severity {
        pf_core::Severity::Info => "info",
        pf_core::Severity::Warning => "warning",
        pf_core::Severity::Error => "error",
        pf_core::Severity::Success => "success",
    }
}
