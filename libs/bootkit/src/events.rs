//! Named event pub/sub with both asynchronous and synchronous delivery.
//!
//! `publish` dispatches each listener on its own task so listener work never
//! blocks the publisher or subscriptions. `publish_sync` runs listeners
//! sequentially on the caller's task. Listener panics are contained; delivery
//! continues.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

/// Stable event names published by the core.
pub mod topics {
    pub const APPLICATION_INITIALIZED: &str = "application.initialized";
    pub const APPLICATION_STARTED: &str = "application.started";
    pub const APPLICATION_STOPPING: &str = "application.stopping";
    pub const APPLICATION_STOPPED: &str = "application.stopped";
    pub const APPLICATION_STATE_CHANGED: &str = "application.state.changed";
    pub const HEALTH_CHECK_FAILED: &str = "application.health_check.failed";
    pub const HEALTH_CHECK_PASSED: &str = "application.health_check.passed";
    pub const COMPONENT_STOP_ERROR: &str = "component.stop.error";
}

/// Opaque listener callable: `(event name, payload)`.
pub type Listener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]; the only reliable way to
/// remove a listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionToken {
    event: String,
    id: u64,
}

#[derive(Default)]
pub struct EventBus {
    listeners: DashMap<String, Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener; the bucket is created on first subscription.
    pub fn subscribe(&self, event: &str, listener: Listener) -> SubscriptionToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        SubscriptionToken {
            event: event.to_string(),
            id,
        }
    }

    /// Remove the exact listener behind `token`. Unsubscribing a token that
    /// was never issued (or already removed) is a no-op.
    pub fn unsubscribe(&self, token: &SubscriptionToken) {
        if let Some(mut bucket) = self.listeners.get_mut(&token.event) {
            if let Some(pos) = bucket.iter().position(|(id, _)| *id == token.id) {
                bucket.remove(pos);
            }
        }
    }

    /// Fire-and-forget delivery: each listener runs on an independent task.
    /// No ordering is imposed between listeners or between events.
    pub fn publish(&self, event: &str, data: Value) {
        let snapshot = self.snapshot(event);
        if snapshot.is_empty() {
            return;
        }
        let event = event.to_string();
        for listener in snapshot {
            let event = event.clone();
            let data = data.clone();
            tokio::spawn(async move {
                invoke(&listener, &event, &data);
            });
        }
    }

    /// Sequential delivery on the caller's task; returns after every
    /// listener has returned.
    pub fn publish_sync(&self, event: &str, data: Value) {
        for listener in self.snapshot(event) {
            invoke(&listener, event, &data);
        }
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.listeners
            .get(event)
            .map(|b| !b.is_empty())
            .unwrap_or(false)
    }

    /// Wipe all listeners.
    pub fn clear(&self) {
        self.listeners.clear();
    }

    fn snapshot(&self, event: &str) -> Vec<Listener> {
        self.listeners
            .get(event)
            .map(|b| b.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }
}

fn invoke(listener: &Listener, event: &str, data: &Value) {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| listener(event, data)));
    if result.is_err() {
        tracing::warn!(event, "Event listener panicked; continuing delivery");
    }
}
