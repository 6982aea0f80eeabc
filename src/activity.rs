//! Session activity feed.
//!
//! Every externally visible wallet action (refreshes, submissions, monitor
//! outcomes) is recorded as an [`ActivityEvent`]. Recent events are kept in
//! a bounded ring for replay and fanned out live over a broadcast channel.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Ring capacity; also the most a late subscriber can replay.
pub const ACTIVITY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub detail: Value,
}

/// Sink for wallet activity. Synchronous so executors can record from any
/// context without awaiting.
pub trait ActivitySink: Send + Sync {
    fn record(&self, action: &str, detail: Value);
}

pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityEvent>>,
    sender: broadcast::Sender<ActivityEvent>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(ACTIVITY_CAPACITY)),
            sender,
        }
    }

    /// Recent events, newest first.
    pub fn snapshot(&self) -> Vec<ActivityEvent> {
        let guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.iter().cloned().collect()
    }

    /// Live event stream. Subscribe BEFORE calling [`snapshot`] when
    /// replaying history so no event falls between the two.
    ///
    /// [`snapshot`]: ActivityLog::snapshot
    pub fn subscribe(&self) -> BroadcastStream<ActivityEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }
}

impl ActivitySink for ActivityLog {
    fn record(&self, action: &str, detail: Value) {
        let event = ActivityEvent {
            timestamp: Utc::now(),
            action: action.to_string(),
            detail,
        };
        tracing::debug!(action = %event.action, detail = %event.detail, "wallet activity");
        {
            let mut guard = match self.entries.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.push_front(event.clone());
            guard.truncate(ACTIVITY_CAPACITY);
        }
        // Nobody listening is fine; the ring still has it.
        let _ = self.sender.send(event);
    }
}
