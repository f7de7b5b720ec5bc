// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Append-only Event Log with a globally monotonic `seq` (spec §4.10).
//! Fan-out follows the teacher's `EventBus` broadcast-channel pattern; a
//! lagging or dropped subscriber never blocks the appender.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::warn;

use crate::domain::{Event, EventPayload};

pub struct EventLog {
    seq: AtomicU64,
    all: Mutex<Vec<Event>>,
    sender: broadcast::Sender<Event>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { seq: AtomicU64::new(0), all: Mutex::new(Vec::new()), sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Appends with an atomically-assigned `seq`, then fans out. A full
    /// or closed subscriber channel never corrupts or blocks the log.
    pub fn append(&self, request_id: impl Into<String>, task_id: impl Into<String>, tool_name: Option<String>, trace_id: Option<String>, payload: EventPayload) -> Event {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let event = Event::new(seq, request_id, task_id, tool_name, trace_id, payload);
        self.all.lock().unwrap().push(event.clone());
        if let Err(err) = self.sender.send(event.clone()) {
            warn!(error = %err, "event log has no active subscribers");
        }
        event
    }

    pub fn get_all(&self) -> Vec<Event> {
        self.all.lock().unwrap().clone()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_strictly_increasing() {
        let log = EventLog::new(16);
        let a = log.append("r1", "t1", None, None, EventPayload::JobSubmitted { job_id: "j1".into() });
        let b = log.append("r1", "t1", None, None, EventPayload::JobCompleted { job_id: "j1".into() });
        assert!(b.seq > a.seq);
    }

    #[tokio::test]
    async fn subscriber_receives_appended_events() {
        let log = EventLog::new(16);
        let mut rx = log.subscribe();
        log.append("r1", "t1", Some("fs/read".into()), None, EventPayload::JobSubmitted { job_id: "j1".into() });
        let received = rx.recv().await.unwrap();
        assert_eq!(received.tool_name.as_deref(), Some("fs/read"));
    }
}
