//! Periodic aggregated health checking over live components.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::events::{topics, EventBus};
use crate::registry::ComponentRegistry;

/// Result of the most recent poll. An empty `failures` map means every
/// component reported healthy.
#[derive(Clone, Debug, Default)]
pub struct HealthSnapshot {
    pub last_check: Option<DateTime<Utc>>,
    pub failures: HashMap<String, String>,
}

pub struct HealthChecker {
    registry: Arc<ComponentRegistry>,
    interval: Duration,
    stop: CancellationToken,
    status: RwLock<HealthSnapshot>,
    checks_run: AtomicU64,
    failures_seen: AtomicU64,
}

impl HealthChecker {
    pub fn new(registry: Arc<ComponentRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            interval,
            stop: CancellationToken::new(),
            status: RwLock::new(HealthSnapshot::default()),
            checks_run: AtomicU64::new(0),
            failures_seen: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn status(&self) -> HealthSnapshot {
        self.status.read().clone()
    }

    pub fn checks_run(&self) -> u64 {
        self.checks_run.load(Ordering::Relaxed)
    }

    pub fn failures_seen(&self) -> u64 {
        self.failures_seen.load(Ordering::Relaxed)
    }

    /// Signal the polling task to stop. Idempotent.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Spawn the polling task. It ticks immediately, then at the configured
    /// interval, and terminates when either the checker is stopped or the
    /// application context is cancelled. Cancellation is immediate; no
    /// in-flight check is awaited.
    pub fn spawn(
        self: &Arc<Self>,
        bus: Arc<EventBus>,
        app_cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let checker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(checker.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = checker.stop.cancelled() => break,
                    _ = app_cancel.cancelled() => break,
                    _ = ticker.tick() => checker.run_once(&bus).await,
                }
            }
            tracing::debug!("Health checker stopped");
        })
    }

    async fn run_once(&self, bus: &EventBus) {
        let failures = self.registry.health_check().await;

        {
            let mut status = self.status.write();
            status.last_check = Some(Utc::now());
            status.failures = failures.clone();
        }
        self.checks_run.fetch_add(1, Ordering::Relaxed);
        self.failures_seen
            .fetch_add(failures.len() as u64, Ordering::Relaxed);

        if failures.is_empty() {
            bus.publish(topics::HEALTH_CHECK_PASSED, serde_json::Value::Null);
        } else {
            tracing::warn!(failed = failures.len(), "Health check reported failures");
            bus.publish(
                topics::HEALTH_CHECK_FAILED,
                serde_json::to_value(&failures).unwrap_or_default(),
            );
        }
    }
}
