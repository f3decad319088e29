//! `LogFanOut` — per-job live event fan-out on top of the durable event
//! log in `pf_storage::JobStore`.
//!
//! A `tokio::sync::broadcast` channel is created lazily the first time a
//! job is published to or subscribed against, and dropped once the job
//! has reached a terminal state and no subscriber remains. The channel
//! itself is only the *live tail*; replay of events predating a
//! subscription is the caller's job (read `JobStore::list_events` first,
//! then subscribe) since the store, not the channel, is the source of
//! truth. A lagged subscriber — one that fell behind the broadcast
//! buffer — is expected to recover by re-querying
//! `JobStore::list_events_since` rather than treat the lag as fatal;
//! this is how the terminal marker is still guaranteed to reach every
//! subscriber even past a buffer overrun.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use pf_core::{Event, JobId};

/// Bounded per-job channel capacity. A slow SSE consumer may drop oldest
/// non-terminal events past this; it recovers via `list_events_since`.
pub const CHANNEL_CAPACITY: usize = 256;

pub struct LogFanOut {
    channels: Mutex<HashMap<JobId, broadcast::Sender<Event>>>,
}

impl Default for LogFanOut {
    fn default() -> Self {
        Self::new()
    }
}

impl LogFanOut {
    pub fn new() -> Self {
        Self { channels: Mutex::new(HashMap::new()) }
    }

    fn sender(&self, job_id: &JobId) -> broadcast::Sender<Event> {
        let mut channels = self.channels.lock();
        channels.entry(*job_id).or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0).clone()
    }

    /// Publish `event` to every live subscriber of `event.job_id`. A
    /// channel with no subscribers yet is created and immediately
    /// dropped by `send`'s `Err` — that's fine, nothing was listening.
    pub fn publish(&self, event: Event) {
        let sender = self.sender(&event.job_id);
        let _ = sender.send(event);
    }

    /// Subscribe to the live tail for `job_id`.
    pub fn subscribe(&self, job_id: &JobId) -> broadcast::Receiver<Event> {
        self.sender(job_id).subscribe()
    }

    /// Drop the channel for `job_id` if nothing is currently subscribed.
    /// Called once a job reaches a terminal state; a channel that still
    /// has live subscribers is left for the server to let naturally
    /// close as those connections drop.
    pub fn retire(&self, job_id: &JobId) {
        let mut channels = self.channels.lock();
        if let Some(sender) = channels.get(job_id) {
            if sender.receiver_count() == 0 {
                channels.remove(job_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::{JobId, Severity};

    fn event(job_id: JobId, message: &str) -> Event {
        Event { event_id: 1, job_id, message: message.to_string(), severity: Severity::Info, event_time_ms: 0 }
    }

    #[tokio::test]
    async fn a_subscriber_receives_published_events() {
        let fanout = LogFanOut::new();
        let job_id = JobId::new();
        let mut rx = fanout.subscribe(&job_id);

        fanout.publish(event(job_id, "hello"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.message, "hello");
    }

    #[test]
    fn retire_drops_a_channel_with_no_subscribers() {
        let fanout = LogFanOut::new();
        let job_id = JobId::new();
        fanout.publish(event(job_id, "hello"));
        fanout.retire(&job_id);
        assert_eq!(fanout.channels.lock().len(), 0);
    }

    #[test]
    fn retire_keeps_a_channel_with_a_live_subscriber() {
        let fanout = LogFanOut::new();
        let job_id = JobId::new();
        let _rx = fanout.subscribe(&job_id);
        fanout.retire(&job_id);
        assert_eq!(fanout.channels.lock().len(), 1);
    }
}
