//! End-to-end lifecycle scenarios against the full container.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use bootkit::builtin::{self, web::WebComponent};
use bootkit::{
    AppState, Application, AutoConfigurer, BootError, Component, ComponentCtx, ComponentFactory,
    ComponentRegistry, ComponentStatus, ComponentType, ConfigSchema, ErrorKind,
    MemoryPropertySource, PropertySource, ShutdownOptions, StatusCell, topics,
};

/* --------------------------- Test fixtures ------------------------- */

#[derive(Default)]
struct Behavior {
    fail_start: bool,
    fail_stop: bool,
    fail_health: bool,
}

struct TestComponent {
    name: String,
    ty: ComponentType,
    status: StatusCell,
    behavior: Behavior,
    log: Arc<Mutex<Vec<String>>>,
}

impl TestComponent {
    fn new(name: &str, ty: ComponentType, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Self::with_behavior(name, ty, Behavior::default(), log)
    }

    fn with_behavior(
        name: &str,
        ty: ComponentType,
        behavior: Behavior,
        log: Arc<Mutex<Vec<String>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ty,
            status: StatusCell::new(),
            behavior,
            log,
        })
    }
}

#[async_trait]
impl Component for TestComponent {
    fn name(&self) -> &str {
        &self.name
    }
    fn component_type(&self) -> ComponentType {
        self.ty
    }
    fn status(&self) -> ComponentStatus {
        self.status.get()
    }
    async fn initialize(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        self.log.lock().push(format!("init:{}", self.name));
        self.status.set(ComponentStatus::Initialized);
        Ok(())
    }
    async fn start(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        self.log.lock().push(format!("start:{}", self.name));
        if self.behavior.fail_start {
            self.status.set(ComponentStatus::Failed);
            anyhow::bail!("start refused");
        }
        self.status.set(ComponentStatus::Started);
        Ok(())
    }
    async fn stop(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        self.log.lock().push(format!("stop:{}", self.name));
        if self.behavior.fail_stop {
            anyhow::bail!("stop refused");
        }
        self.status.set(ComponentStatus::Stopped);
        Ok(())
    }
    async fn health_check(&self) -> anyhow::Result<()> {
        if self.behavior.fail_health {
            anyhow::bail!("degraded")
        }
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

struct TestFactory {
    name: String,
    deps: Vec<String>,
}

impl TestFactory {
    fn new(name: &str, deps: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            deps: deps.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl ComponentFactory for TestFactory {
    fn name(&self) -> &str {
        &self.name
    }
    fn schema(&self) -> ConfigSchema {
        let mut schema = ConfigSchema::new(self.name.clone());
        for d in &self.deps {
            schema = schema.depends_on(d.clone());
        }
        schema
    }
    fn create(
        &self,
        _props: &dyn PropertySource,
    ) -> anyhow::Result<Arc<dyn Component>> {
        Ok(TestComponent::new(
            &self.name,
            ComponentType::Core,
            Arc::new(Mutex::new(Vec::new())),
        ))
    }
}

struct FactoryConfigurer {
    factories: Vec<Arc<TestFactory>>,
}

impl AutoConfigurer for FactoryConfigurer {
    fn name(&self) -> &str {
        "test-factories"
    }
    fn order(&self) -> i32 {
        bootkit::autoconfig::order::USER
    }
    fn configure(
        &self,
        registry: &ComponentRegistry,
        _props: &dyn PropertySource,
    ) -> Result<(), BootError> {
        for f in &self.factories {
            registry.register_factory(f.clone())?;
        }
        Ok(())
    }
}

fn app_with(props: MemoryPropertySource) -> Application {
    let app = Application::new(Arc::new(props));
    for configurer in builtin::builtin_configurers() {
        app.add_configurer(configurer);
    }
    app
}

async fn wait_for_state(app: &Application, state: AppState) {
    for _ in 0..500 {
        if app.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("application never reached {state}, stuck at {}", app.state());
}

fn sorted_names(app: &Application) -> Vec<String> {
    app.registry()
        .get_all_components_sorted()
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

/* ------------------------------ Scenarios -------------------------- */

#[tokio::test]
async fn minimal_run_starts_builtins_and_stops_cleanly() {
    let app = Arc::new(app_with(MemoryPropertySource::new()));
    let token = CancellationToken::new();

    let handle = {
        let app = app.clone();
        let token = token.clone();
        tokio::spawn(async move { app.run_with(ShutdownOptions::Token(token)).await })
    };

    wait_for_state(&app, AppState::Running).await;
    // Only config, logger and cache: web/database stay disabled by default.
    assert_eq!(sorted_names(&app), vec!["cache", "config", "logger"]);

    token.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run did not finish")
        .unwrap();
    assert!(result.is_ok(), "run failed: {result:?}");
    assert_eq!(app.state(), AppState::Stopped);
}

#[tokio::test]
async fn web_enabled_orders_groups_and_observes_properties() {
    let props = MemoryPropertySource::new();
    props.set_property("web.enabled", json!(true));
    props.set_property("web.port", json!(9090));

    let app = app_with(props);
    app.initialize().await.unwrap();

    assert_eq!(sorted_names(&app), vec!["cache", "config", "logger", "web"]);

    let web = app.registry().get_component("web").unwrap();
    let web = web.as_any().downcast_ref::<WebComponent>().unwrap();
    assert_eq!(web.host(), "0.0.0.0");
    assert_eq!(web.port(), 9090);
}

#[tokio::test]
async fn dependency_cycle_fails_initialize() {
    let props = MemoryPropertySource::new();
    // Keep the registry down to the cycle itself.
    props.set_property("config.enabled", json!(false));
    props.set_property("logger.enabled", json!(false));
    props.set_property("cache.enabled", json!(false));

    let app = app_with(props);
    app.add_configurer(Arc::new(FactoryConfigurer {
        factories: vec![
            TestFactory::new("a", &["b"]),
            TestFactory::new("b", &["c"]),
            TestFactory::new("c", &["a"]),
        ],
    }));

    let err = app.initialize().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Dependency);
    let chain = err.chain().unwrap();
    for name in ["a", "b", "c"] {
        assert!(chain.iter().any(|n| n == name), "missing {name} in {chain:?}");
    }
    assert_eq!(app.state(), AppState::Failed);
    assert!(app.registry().get_all_components().is_empty());
}

#[tokio::test]
async fn missing_dependency_reports_both_sides() {
    let props = MemoryPropertySource::new();
    props.set_property("logger.enabled", json!(false));
    props.set_property("config.enabled", json!(false));
    props.set_property("cache.enabled", json!(false));

    let app = app_with(props);
    app.add_configurer(Arc::new(FactoryConfigurer {
        factories: vec![TestFactory::new("x", &["logger"])],
    }));

    let err = app.initialize().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Dependency);
    assert_eq!(err.component_name(), Some("x"));
    assert_eq!(
        err.chain(),
        Some(&["x".to_string(), "logger".to_string()][..])
    );
    assert!(err.to_string().contains("dependency logger not found"));
    assert_eq!(app.state(), AppState::Failed);
}

#[tokio::test]
async fn start_failure_rolls_into_best_effort_shutdown() {
    let props = MemoryPropertySource::new();
    props.set_property("config.enabled", json!(false));
    props.set_property("logger.enabled", json!(false));
    props.set_property("cache.enabled", json!(false));

    let log = Arc::new(Mutex::new(Vec::new()));
    let app = app_with(props);
    app.register_component(TestComponent::new(
        "alpha",
        ComponentType::Infrastructure,
        log.clone(),
    ))
    .unwrap();
    app.register_component(TestComponent::with_behavior(
        "bravo",
        ComponentType::Core,
        Behavior {
            fail_start: true,
            fail_stop: true,
            ..Behavior::default()
        },
        log.clone(),
    ))
    .unwrap();

    let err = app
        .run_with(ShutdownOptions::Token(CancellationToken::new()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Component);
    assert_eq!(err.component_name(), Some("bravo"));
    assert_eq!(app.state(), AppState::Failed);

    let stop_error_seen = Arc::new(AtomicBool::new(false));
    let flag = stop_error_seen.clone();
    app.events().subscribe(
        topics::COMPONENT_STOP_ERROR,
        Arc::new(move |_, data| {
            if data.get("component").and_then(|v| v.as_str()) == Some("bravo") {
                flag.store(true, Ordering::SeqCst);
            }
        }),
    );

    // Best-effort cleanup from Failed: both components stop, reverse order.
    let err = app.shutdown().await.unwrap_err();
    assert_eq!(err.component_name(), Some("bravo"));

    let log = log.lock().clone();
    let stops: Vec<&String> = log.iter().filter(|e| e.starts_with("stop:")).collect();
    assert_eq!(stops, vec!["stop:bravo", "stop:alpha"]);
    assert!(stop_error_seen.load(Ordering::SeqCst));
    assert_eq!(app.state(), AppState::Stopped);
}

#[tokio::test]
async fn failing_component_surfaces_health_check_events() {
    let props = MemoryPropertySource::new();
    props.set_property("app.health_check_interval", json!(1));

    let app = Arc::new(app_with(props));
    app.register_component(TestComponent::with_behavior(
        "shaky",
        ComponentType::Core,
        Behavior {
            fail_health: true,
            ..Behavior::default()
        },
        Arc::new(Mutex::new(Vec::new())),
    ))
    .unwrap();

    let failed = Arc::new(AtomicBool::new(false));
    let flag = failed.clone();
    app.events().subscribe(
        topics::HEALTH_CHECK_FAILED,
        Arc::new(move |_, data| {
            if data.get("shaky").is_some() {
                flag.store(true, Ordering::SeqCst);
            }
        }),
    );

    let token = CancellationToken::new();
    let handle = {
        let app = app.clone();
        let token = token.clone();
        tokio::spawn(async move { app.run_with(ShutdownOptions::Token(token)).await })
    };

    wait_for_state(&app, AppState::Running).await;
    for _ in 0..300 {
        if failed.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(
        failed.load(Ordering::SeqCst),
        "no health_check.failed event within deadline"
    );

    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run did not finish")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn state_changes_are_published() {
    let props = MemoryPropertySource::new();
    let app = Arc::new(app_with(props));

    let transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = transitions.clone();
    app.events().subscribe(
        topics::APPLICATION_STATE_CHANGED,
        Arc::new(move |_, data| {
            let old = data["oldState"].as_str().unwrap_or_default().to_string();
            let new = data["newState"].as_str().unwrap_or_default().to_string();
            sink.lock().push((old, new));
        }),
    );

    let token = CancellationToken::new();
    let handle = {
        let app = app.clone();
        let token = token.clone();
        tokio::spawn(async move { app.run_with(ShutdownOptions::Token(token)).await })
    };
    wait_for_state(&app, AppState::Running).await;
    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run did not finish")
        .unwrap()
        .unwrap();

    // state.changed is delivered on detached tasks; give them a moment.
    let expected = [
        ("Created", "Initializing"),
        ("Initializing", "Initialized"),
        ("Initialized", "Starting"),
        ("Starting", "Running"),
        ("Running", "Stopping"),
        ("Stopping", "Stopped"),
    ];
    for _ in 0..100 {
        if transitions.lock().len() >= expected.len() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let seen = transitions.lock().clone();
    for (old, new) in expected {
        assert!(
            seen.iter().any(|(o, n)| o == old && n == new),
            "missing transition {old} -> {new} in {seen:?}"
        );
    }
}

#[tokio::test]
async fn initialize_returns_app_for_custom_steps() {
    let props = MemoryPropertySource::new();
    let app = app_with(props);
    app.initialize().await.unwrap();
    assert_eq!(app.state(), AppState::Initialized);

    // Peers are reachable through factory-backed lookup after initialize.
    assert!(app.registry().get_component("cache").is_some());
    assert!(app.registry().get_component("web").is_none());
}
