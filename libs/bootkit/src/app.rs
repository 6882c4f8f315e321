//! Application lifecycle: state machine and orchestration of
//! autoconfig → dependency resolution → component lifecycle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::autoconfig::AutoConfig;
use crate::contracts::{AutoConfigurer, Component, ComponentActivator, ComponentCtx};
use crate::errors::{BootError, ComponentOp};
use crate::events::{topics, EventBus};
use crate::health::HealthChecker;
use crate::registry::ComponentRegistry;
use bootkit_bootstrap::{signals, PropertySource};

/// Ordinal lifecycle states. `Failed` is a terminal sink outside the linear
/// path; comparisons go through [`AppState::ordinal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    Created,
    Initializing,
    Initialized,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl AppState {
    /// Position on the linear lifecycle path. `Failed` maps to `u8::MAX`;
    /// callers must test for it explicitly before ordinal comparison.
    pub fn ordinal(self) -> u8 {
        match self {
            AppState::Created => 0,
            AppState::Initializing => 1,
            AppState::Initialized => 2,
            AppState::Starting => 3,
            AppState::Running => 4,
            AppState::Stopping => 5,
            AppState::Stopped => 6,
            AppState::Failed => u8::MAX,
        }
    }
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AppState::Created => "Created",
            AppState::Initializing => "Initializing",
            AppState::Initialized => "Initialized",
            AppState::Starting => "Starting",
            AppState::Running => "Running",
            AppState::Stopping => "Stopping",
            AppState::Stopped => "Stopped",
            AppState::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// How the running application decides when to stop.
pub enum ShutdownOptions {
    /// Listen for OS signals (Ctrl+C / SIGTERM).
    Signals,
    /// An external `CancellationToken` controls the lifecycle.
    Token(CancellationToken),
    /// An arbitrary future; when it completes, shutdown begins.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

/// The application: owns the registry, event bus, autoconfig and health
/// checker; the property source is injected.
pub struct Application {
    name: String,
    version: String,
    state: RwLock<AppState>,
    registry: Arc<ComponentRegistry>,
    props: Arc<dyn PropertySource>,
    autoconfig: Mutex<AutoConfig>,
    events: Arc<EventBus>,
    health: Arc<HealthChecker>,
    cancel: CancellationToken,
    shutdown_timeout: Duration,
}

impl Application {
    pub fn new(props: Arc<dyn PropertySource>) -> Self {
        let registry = Arc::new(ComponentRegistry::new(props.clone()));
        let health_interval =
            Duration::from_secs(props.get_int("app.health_check_interval", 30).max(0) as u64);
        let shutdown_timeout =
            Duration::from_secs(props.get_int("app.shutdown_timeout", 30).max(0) as u64);
        Self {
            name: props.get_string("app.name", "BootkitApp"),
            version: props.get_string("app.version", "1.0.0"),
            state: RwLock::new(AppState::Created),
            health: Arc::new(HealthChecker::new(registry.clone(), health_interval)),
            registry,
            props,
            autoconfig: Mutex::new(AutoConfig::new()),
            events: Arc::new(EventBus::new()),
            cancel: CancellationToken::new(),
            shutdown_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn state(&self) -> AppState {
        *self.state.read()
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn props(&self) -> &dyn PropertySource {
        self.props.as_ref()
    }

    pub fn health(&self) -> &Arc<HealthChecker> {
        &self.health
    }

    /// Cancelled after shutdown has stopped every component.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn add_configurer(&self, configurer: Arc<dyn AutoConfigurer>) {
        self.autoconfig.lock().add_configurer(configurer);
    }

    pub fn add_activator(&self, activator: Arc<dyn ComponentActivator>) {
        self.autoconfig.lock().add_activator(activator);
    }

    pub fn register_component(&self, component: Arc<dyn Component>) -> Result<(), BootError> {
        self.registry.register_component(component)
    }

    /// Single choke point for state mutation; publishes
    /// `application.state.changed` on every successful transition.
    fn set_state(&self, new: AppState) {
        let old = {
            let mut guard = self.state.write();
            let old = *guard;
            *guard = new;
            old
        };
        if old != new {
            tracing::info!(from = %old, to = %new, "Application state changed");
            self.events.publish(
                topics::APPLICATION_STATE_CHANGED,
                json!({ "oldState": old.to_string(), "newState": new.to_string() }),
            );
        }
    }

    fn component_ctx(&self) -> ComponentCtx {
        ComponentCtx::new(
            self.props.clone(),
            self.registry.clone(),
            self.cancel.clone(),
        )
    }

    /// Configure, resolve dependencies and initialize every component in
    /// deterministic order. Any failure parks the application in `Failed`.
    pub async fn initialize(&self) -> Result<(), BootError> {
        self.set_state(AppState::Initializing);
        tracing::info!(app = %self.name, version = %self.version, "Phase: configure");

        if let Err(e) = self
            .autoconfig
            .lock()
            .configure(&self.registry, self.props.as_ref())
        {
            self.set_state(AppState::Failed);
            return Err(e);
        }

        tracing::info!("Phase: resolve");
        if let Err(e) = self.registry.resolve_dependencies() {
            self.set_state(AppState::Failed);
            return Err(e);
        }

        tracing::info!("Phase: init");
        let ctx = self.component_ctx();
        for component in self.registry.get_all_components_sorted() {
            if let Err(e) = component.initialize(&ctx).await {
                self.set_state(AppState::Failed);
                return Err(BootError::component(
                    ComponentOp::Initialize,
                    component.name(),
                    e,
                ));
            }
        }

        tracing::info!(
            components = self.registry.metrics().components_registered,
            "Application initialized"
        );
        self.set_state(AppState::Initialized);
        self.events
            .publish(topics::APPLICATION_INITIALIZED, serde_json::Value::Null);
        Ok(())
    }

    /// Initialize (if needed), start every component, run until the OS asks
    /// us to stop, then shut down.
    pub async fn run(&self) -> Result<(), BootError> {
        self.run_with(ShutdownOptions::Signals).await
    }

    /// Same as [`run`](Self::run) with an explicit shutdown strategy.
    pub async fn run_with(&self, shutdown: ShutdownOptions) -> Result<(), BootError> {
        match self.state() {
            AppState::Failed => {
                return Err(BootError::config("application is in Failed state"));
            }
            s if s.ordinal() < AppState::Initialized.ordinal() => {
                self.initialize().await?;
            }
            _ => {}
        }

        self.set_state(AppState::Starting);
        tracing::info!("Phase: start");
        let ctx = self.component_ctx();
        for component in self.registry.get_all_components_sorted() {
            if let Err(e) = component.start(&ctx).await {
                self.set_state(AppState::Failed);
                return Err(BootError::component(ComponentOp::Start, component.name(), e));
            }
        }

        let _health_task = self.health.spawn(self.events.clone(), self.cancel.clone());

        self.set_state(AppState::Running);
        self.events
            .publish(topics::APPLICATION_STARTED, serde_json::Value::Null);
        tracing::info!(app = %self.name, "Application running");

        match shutdown {
            ShutdownOptions::Signals => {
                if let Err(e) = signals::wait_for_shutdown().await {
                    tracing::warn!(error = %e, "Signal waiter failed; falling back to ctrl_c()");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
            ShutdownOptions::Token(token) => token.cancelled().await,
            ShutdownOptions::Future(fut) => fut.await,
        }

        self.shutdown().await
    }

    /// Best-effort shutdown: stop every component in reverse order within
    /// the configured grace period, collecting errors without aborting.
    /// Permitted from `Failed` as cleanup.
    pub async fn shutdown(&self) -> Result<(), BootError> {
        self.set_state(AppState::Stopping);
        self.events
            .publish_sync(topics::APPLICATION_STOPPING, serde_json::Value::Null);
        tracing::info!("Phase: stop");

        self.health.stop();

        let deadline = tokio::time::Instant::now() + self.shutdown_timeout;
        let ctx = self.component_ctx();
        let mut first_error: Option<BootError> = None;

        for component in self.registry.get_all_components_for_shutdown() {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let result = match tokio::time::timeout(remaining, component.stop(&ctx)).await {
                Ok(r) => r,
                Err(_) => Err(anyhow::anyhow!(
                    "stop did not finish within the shutdown grace period"
                )),
            };
            if let Err(e) = result {
                tracing::warn!(component = component.name(), error = %e, "Failed to stop component");
                self.events.publish_sync(
                    topics::COMPONENT_STOP_ERROR,
                    json!({ "component": component.name(), "error": e.to_string() }),
                );
                if first_error.is_none() {
                    first_error = Some(BootError::component(ComponentOp::Stop, component.name(), e));
                }
            }
        }

        self.cancel.cancel();
        self.set_state(AppState::Stopped);
        self.events
            .publish_sync(topics::APPLICATION_STOPPED, serde_json::Value::Null);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
