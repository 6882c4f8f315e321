//! Component registry: storage, factory-driven creation, dependency
//! resolution and aggregate health checking.
//!
//! A single reader-writer lock guards the three maps (components, factories,
//! declared dependencies); metrics live behind their own lock. The creation
//! path uses double-checked locking so a factory runs at most once even
//! under concurrent `get_component` callers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::contracts::{Component, ComponentFactory, ComponentType};
use crate::errors::{BootError, ComponentOp};
use bootkit_bootstrap::PropertySource;

#[derive(Default)]
struct Inner {
    components: HashMap<String, Arc<dyn Component>>,
    factories: HashMap<String, Arc<dyn ComponentFactory>>,
    dependencies: HashMap<String, Vec<String>>,
}

/// Counters and bookkeeping exposed for observability.
#[derive(Clone, Debug, Default)]
pub struct RegistryMetrics {
    pub components_registered: usize,
    pub factories_registered: usize,
    pub health_checks: u64,
    pub last_resolution: Option<Duration>,
    /// Names of components that failed creation or health checks, de-duplicated.
    pub failed_components: Vec<String>,
}

impl RegistryMetrics {
    fn record_failure(&mut self, name: &str) {
        if !self.failed_components.iter().any(|n| n == name) {
            self.failed_components.push(name.to_string());
        }
    }
}

pub struct ComponentRegistry {
    inner: RwLock<Inner>,
    metrics: Mutex<RegistryMetrics>,
    props: Arc<dyn PropertySource>,
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        let components: Vec<&String> = inner.components.keys().collect();
        let factories: Vec<&String> = inner.factories.keys().collect();
        f.debug_struct("ComponentRegistry")
            .field("components", &components)
            .field("factories", &factories)
            .finish()
    }
}

impl ComponentRegistry {
    pub fn new(props: Arc<dyn PropertySource>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            metrics: Mutex::new(RegistryMetrics::default()),
            props,
        }
    }

    pub fn metrics(&self) -> RegistryMetrics {
        self.metrics.lock().clone()
    }

    /// Insert a ready-made component. Fails when the name is taken; no state
    /// change occurs in that case.
    pub fn register_component(&self, component: Arc<dyn Component>) -> Result<(), BootError> {
        let name = component.name().to_string();
        {
            let mut inner = self.inner.write();
            if inner.components.contains_key(&name) {
                return Err(BootError::component_msg(
                    ComponentOp::Register,
                    &name,
                    "component already registered",
                ));
            }
            inner.components.insert(name.clone(), component);
        }
        self.metrics.lock().components_registered += 1;
        tracing::debug!(component = %name, "Component registered");
        Ok(())
    }

    /// Validate the factory's config schema, then store the factory and its
    /// declared dependencies. A factory may be registered before its
    /// dependencies exist.
    pub fn register_factory(&self, factory: Arc<dyn ComponentFactory>) -> Result<(), BootError> {
        factory.validate_config(self.props.as_ref())?;
        let name = factory.name().to_string();
        let deps = factory.dependencies();
        {
            let mut inner = self.inner.write();
            inner.factories.insert(name.clone(), factory);
            inner.dependencies.insert(name.clone(), deps);
        }
        self.metrics.lock().factories_registered += 1;
        tracing::debug!(component = %name, "Factory registered");
        Ok(())
    }

    /// Fetch a component, instantiating it from its factory on first access.
    /// The factory runs under the write lock, so concurrent callers observe
    /// at most one creation.
    pub fn get_component(&self, name: &str) -> Option<Arc<dyn Component>> {
        {
            let inner = self.inner.read();
            if let Some(c) = inner.components.get(name) {
                return Some(c.clone());
            }
            if !inner.factories.contains_key(name) {
                return None;
            }
        }

        let mut inner = self.inner.write();
        if let Some(c) = inner.components.get(name) {
            return Some(c.clone());
        }
        let factory = inner.factories.get(name)?.clone();
        match factory.create(self.props.as_ref()) {
            Ok(component) => {
                inner.components.insert(name.to_string(), component.clone());
                drop(inner);
                self.metrics.lock().components_registered += 1;
                Some(component)
            }
            Err(e) => {
                drop(inner);
                self.metrics.lock().record_failure(name);
                tracing::warn!(component = name, error = %e, "Factory creation failed");
                None
            }
        }
    }

    pub fn get_component_by_type(&self, t: ComponentType) -> Option<Arc<dyn Component>> {
        let inner = self.inner.read();
        inner
            .components
            .values()
            .find(|c| c.component_type() == t)
            .cloned()
    }

    pub fn get_components_by_type(&self, t: ComponentType) -> Vec<Arc<dyn Component>> {
        let inner = self.inner.read();
        inner
            .components
            .values()
            .filter(|c| c.component_type() == t)
            .cloned()
            .collect()
    }

    /// Shallow copy of the component map; caller mutations do not affect
    /// the registry.
    pub fn get_all_components(&self) -> HashMap<String, Arc<dyn Component>> {
        self.inner.read().components.clone()
    }

    /// Deterministic lifecycle order: grouped by type in the fixed startup
    /// order, ascending name within each group.
    pub fn get_all_components_sorted(&self) -> Vec<Arc<dyn Component>> {
        let mut components: Vec<Arc<dyn Component>> =
            self.inner.read().components.values().cloned().collect();
        components.sort_by(|a, b| {
            (a.component_type().group_rank(), a.name().to_string())
                .cmp(&(b.component_type().group_rank(), b.name().to_string()))
        });
        components
    }

    /// Reverse of [`get_all_components_sorted`](Self::get_all_components_sorted).
    pub fn get_all_components_for_shutdown(&self) -> Vec<Arc<dyn Component>> {
        let mut components = self.get_all_components_sorted();
        components.reverse();
        components
    }

    /// Detect cycles, topo-sort the factory graph and instantiate every
    /// factory in dependency order. Returns on first error; components
    /// created before the failure stay in the registry.
    pub fn resolve_dependencies(&self) -> Result<(), BootError> {
        let started = Instant::now();
        let result = self.resolve_inner();
        self.metrics.lock().last_resolution = Some(started.elapsed());
        result
    }

    fn resolve_inner(&self) -> Result<(), BootError> {
        let (names, deps, present): (Vec<String>, HashMap<String, Vec<String>>, HashSet<String>) = {
            let inner = self.inner.read();
            (
                inner.factories.keys().cloned().collect(),
                inner.dependencies.clone(),
                inner.components.keys().cloned().collect(),
            )
        };

        let idx: HashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        // Edges dep -> dependent, only among factory nodes. A dependency
        // satisfied by an already-present component contributes no edge.
        let mut adj = vec![Vec::<usize>::new(); names.len()];
        for (name, dep_list) in &deps {
            let Some(&u) = idx.get(name.as_str()) else {
                continue;
            };
            for d in dep_list {
                if present.contains(d) {
                    continue;
                }
                if let Some(&v) = idx.get(d.as_str()) {
                    adj[v].push(u);
                }
            }
        }

        if let Some(cycle) = detect_cycle_with_path(&names, &deps, &idx, &present) {
            let head = cycle.first().cloned().unwrap_or_default();
            return Err(BootError::dependency(
                head,
                "dependency cycle detected",
                cycle,
            ));
        }

        // Kahn's algorithm over the factory graph.
        let mut indeg = vec![0usize; names.len()];
        for targets in &adj {
            for &t in targets {
                indeg[t] += 1;
            }
        }
        let mut queue: VecDeque<usize> = indeg
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(names.len());
        while let Some(u) = queue.pop_front() {
            order.push(u);
            for &w in &adj[u] {
                indeg[w] -= 1;
                if indeg[w] == 0 {
                    queue.push_back(w);
                }
            }
        }
        if order.len() != names.len() {
            let residual: Vec<String> = indeg
                .iter()
                .enumerate()
                .filter(|(_, &d)| d > 0)
                .map(|(i, _)| names[i].clone())
                .collect();
            let head = residual.first().cloned().unwrap_or_default();
            return Err(BootError::dependency(
                head,
                "dependency cycle detected",
                residual,
            ));
        }

        // Instantiate in topological order.
        for i in order {
            let name = &names[i];
            if self.inner.read().components.contains_key(name) {
                continue;
            }
            if let Some(dep_list) = deps.get(name) {
                for d in dep_list {
                    if !self.inner.read().components.contains_key(d) {
                        return Err(BootError::dependency(
                            name.clone(),
                            format!("dependency {d} not found"),
                            vec![name.clone(), d.clone()],
                        ));
                    }
                }
            }

            let factory = {
                let inner = self.inner.read();
                inner.factories.get(name).cloned()
            };
            let Some(factory) = factory else { continue };
            match factory.create(self.props.as_ref()) {
                Ok(component) => {
                    self.inner
                        .write()
                        .components
                        .insert(name.clone(), component);
                    self.metrics.lock().components_registered += 1;
                    tracing::debug!(component = %name, "Component created from factory");
                }
                Err(e) => {
                    self.metrics.lock().record_failure(name);
                    return Err(BootError::component(ComponentOp::Create, name.clone(), e));
                }
            }
        }

        tracing::info!(
            components = self.inner.read().components.len(),
            "Component dependency order resolved (topo)"
        );
        Ok(())
    }

    /// Run every component's health check and collect failures as
    /// `{name: error message}`.
    pub async fn health_check(&self) -> HashMap<String, String> {
        let components: Vec<Arc<dyn Component>> =
            self.inner.read().components.values().cloned().collect();

        let mut failures = HashMap::new();
        for c in components {
            if let Err(e) = c.health_check().await {
                failures.insert(c.name().to_string(), e.to_string());
            }
        }

        let mut metrics = self.metrics.lock();
        metrics.health_checks += 1;
        for name in failures.keys() {
            metrics.record_failure(name);
        }
        failures
    }
}

/// DFS with three-color marking over the declared dependency graph of the
/// factories. Dependencies satisfied by direct-registered components are
/// skipped. Returns the closed cycle path when one exists.
fn detect_cycle_with_path(
    names: &[String],
    deps: &HashMap<String, Vec<String>>,
    idx: &HashMap<&str, usize>,
    present: &HashSet<String>,
) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White, // unvisited
        Gray,  // on the current stack
        Black, // finished
    }

    // Forward adjacency: factory -> the factory dependencies it declares.
    let mut adj = vec![Vec::<usize>::new(); names.len()];
    for (name, dep_list) in deps {
        let Some(&u) = idx.get(name.as_str()) else {
            continue;
        };
        for d in dep_list {
            if present.contains(d) {
                continue;
            }
            if let Some(&v) = idx.get(d.as_str()) {
                adj[u].push(v);
            }
        }
    }

    fn dfs(
        node: usize,
        names: &[String],
        adj: &[Vec<usize>],
        colors: &mut [Color],
        path: &mut Vec<usize>,
    ) -> Option<Vec<String>> {
        colors[node] = Color::Gray;
        path.push(node);

        for &next in &adj[node] {
            match colors[next] {
                Color::Gray => {
                    if let Some(start) = path.iter().position(|&n| n == next) {
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|&i| names[i].clone()).collect();
                        cycle.push(names[next].clone());
                        return Some(cycle);
                    }
                }
                Color::White => {
                    if let Some(cycle) = dfs(next, names, adj, colors, path) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }

        path.pop();
        colors[node] = Color::Black;
        None
    }

    let mut colors = vec![Color::White; names.len()];
    let mut path = Vec::new();
    for i in 0..names.len() {
        if colors[i] == Color::White {
            if let Some(cycle) = dfs(i, names, &adj, &mut colors, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}
