//! Core container contracts: components, factories, configurers, activators.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::errors::BootError;
use crate::registry::ComponentRegistry;
use bootkit_bootstrap::PropertySource;

/// Closed set of component categories. Startup visits the groups in the
/// order given by [`ComponentType::STARTUP_ORDER`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Infrastructure,
    DataSource,
    Core,
    Web,
}

impl ComponentType {
    pub const STARTUP_ORDER: [ComponentType; 4] = [
        ComponentType::Infrastructure,
        ComponentType::DataSource,
        ComponentType::Core,
        ComponentType::Web,
    ];

    /// Position within the fixed startup order.
    pub fn group_rank(self) -> usize {
        Self::STARTUP_ORDER
            .iter()
            .position(|t| *t == self)
            .unwrap_or(usize::MAX)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentStatus {
    Created,
    Initialized,
    Started,
    Stopped,
    Failed,
    Unknown,
}

/// Small shared cell components use to track their own lifecycle status.
#[derive(Debug)]
pub struct StatusCell(parking_lot::RwLock<ComponentStatus>);

impl StatusCell {
    pub fn new() -> Self {
        Self(parking_lot::RwLock::new(ComponentStatus::Created))
    }

    pub fn get(&self) -> ComponentStatus {
        *self.0.read()
    }

    pub fn set(&self, status: ComponentStatus) {
        *self.0.write() = status;
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call context handed to component lifecycle operations.
///
/// Carries the shared property source, the registry for peer lookup after
/// initialize, and the application's cancellation token for background work.
/// Components should clone out what they need rather than storing the whole
/// context.
#[derive(Clone)]
pub struct ComponentCtx {
    props: Arc<dyn PropertySource>,
    registry: Arc<ComponentRegistry>,
    cancel: CancellationToken,
}

impl ComponentCtx {
    pub fn new(
        props: Arc<dyn PropertySource>,
        registry: Arc<ComponentRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            props,
            registry,
            cancel,
        }
    }

    pub fn props(&self) -> &dyn PropertySource {
        self.props.as_ref()
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Look up a peer component by name, creating it from its factory if needed.
    pub fn component(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.registry.get_component(name)
    }

    /// Cancelled when the application shuts down.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// A named unit with a lifecycle and a type category.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn component_type(&self) -> ComponentType;
    fn status(&self) -> ComponentStatus;

    async fn initialize(&self, ctx: &ComponentCtx) -> anyhow::Result<()>;
    async fn start(&self, ctx: &ComponentCtx) -> anyhow::Result<()>;
    async fn stop(&self, ctx: &ComponentCtx) -> anyhow::Result<()>;

    /// `Ok(())` means healthy. Must be bounded or cheap; the health checker
    /// does not await in-flight checks on cancellation.
    async fn health_check(&self) -> anyhow::Result<()>;

    fn as_any(&self) -> &dyn std::any::Any;
}

/// Expected value kind for a declared configuration property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    String,
    Bool,
    Int,
    Float,
}

impl PropertyKind {
    /// Whether a stored value satisfies this kind, directly or as a
    /// parsable string (mirrors the typed-getter coercion rules).
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (PropertyKind::String, Value::String(_)) => true,
            (PropertyKind::String, Value::Bool(_) | Value::Number(_)) => true,
            (PropertyKind::Bool, Value::Bool(_)) => true,
            (PropertyKind::Bool, Value::String(s)) => {
                matches!(s.to_ascii_lowercase().as_str(), "true" | "false")
            }
            (PropertyKind::Int, Value::Number(n)) => n.as_i64().is_some(),
            (PropertyKind::Int, Value::String(s)) => s.trim().parse::<i64>().is_ok(),
            (PropertyKind::Float, Value::Number(_)) => true,
            (PropertyKind::Float, Value::String(s)) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        }
    }
}

/// One declared configuration property of a component.
#[derive(Clone, Debug)]
pub struct PropertySpec {
    pub key: String,
    pub kind: PropertyKind,
    pub default: Option<Value>,
    pub description: String,
    pub required: bool,
}

impl PropertySpec {
    pub fn new(key: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            key: key.into(),
            kind,
            default: None,
            description: String::new(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, v: Value) -> Self {
        self.default = Some(v);
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }
}

/// Config schema declared by a factory: properties it consumes and the
/// components it depends on.
#[derive(Clone, Debug, Default)]
pub struct ConfigSchema {
    pub component: String,
    pub properties: Vec<PropertySpec>,
    pub dependencies: Vec<String>,
}

impl ConfigSchema {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            properties: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn property(mut self, spec: PropertySpec) -> Self {
        self.properties.push(spec);
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Pure validation against a property source: required keys must be
    /// present, and present values must match their declared kind.
    pub fn validate(&self, props: &dyn PropertySource) -> Result<(), BootError> {
        for spec in &self.properties {
            match props.get_property(&spec.key) {
                None if spec.required => {
                    return Err(BootError::config_for(
                        &self.component,
                        format!("required property '{}' is not set", spec.key),
                    ));
                }
                Some(value) if !spec.kind.accepts(&value) => {
                    return Err(BootError::config_for(
                        &self.component,
                        format!(
                            "property '{}' has incompatible value {value} (expected {:?})",
                            spec.key, spec.kind
                        ),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Produces a component on demand. `create` is construction only; I/O
/// belongs in `Component::initialize`. The registry guarantees at-most-one
/// creation per name.
pub trait ComponentFactory: Send + Sync + 'static {
    /// Name of the component this factory produces.
    fn name(&self) -> &str;

    fn schema(&self) -> ConfigSchema;

    fn dependencies(&self) -> Vec<String> {
        self.schema().dependencies
    }

    fn validate_config(&self, props: &dyn PropertySource) -> Result<(), BootError> {
        self.schema().validate(props)
    }

    fn create(&self, props: &dyn PropertySource) -> anyhow::Result<Arc<dyn Component>>;
}

/// A pluggable auto-configuration step. Configurers run in ascending
/// `order()`; each reads its enabling property and registers at most one
/// factory.
pub trait AutoConfigurer: Send + Sync {
    fn name(&self) -> &str;
    fn order(&self) -> i32;
    fn configure(
        &self,
        registry: &ComponentRegistry,
        props: &dyn PropertySource,
    ) -> Result<(), BootError>;
}

/// Predicate deciding whether a conceptual class of components should be
/// present. Consulted by configurers, never by the registry itself.
pub trait ComponentActivator: Send + Sync {
    fn name(&self) -> &str;
    fn should_activate(&self, props: &dyn PropertySource) -> bool;
}

/// Register-only extension hook applied by the Boot facade before
/// dependency resolution. Failures are logged and skipped.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn register(&self, app: &crate::app::Application) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootkit_bootstrap::{MemoryPropertySource, PropertySource as _};
    use serde_json::json;

    #[test]
    fn group_rank_follows_startup_order() {
        assert_eq!(ComponentType::Infrastructure.group_rank(), 0);
        assert_eq!(ComponentType::DataSource.group_rank(), 1);
        assert_eq!(ComponentType::Core.group_rank(), 2);
        assert_eq!(ComponentType::Web.group_rank(), 3);
    }

    #[test]
    fn property_kind_accepts_coercible_strings() {
        assert!(PropertyKind::Bool.accepts(&json!("true")));
        assert!(PropertyKind::Int.accepts(&json!("42")));
        assert!(PropertyKind::Float.accepts(&json!("0.25")));
        assert!(!PropertyKind::Bool.accepts(&json!("yes")));
        assert!(!PropertyKind::Int.accepts(&json!("4.5")));
    }

    #[test]
    fn schema_validation_reports_missing_required() {
        let props = MemoryPropertySource::new();
        let schema = ConfigSchema::new("web")
            .property(PropertySpec::new("web.port", PropertyKind::Int).required());

        let err = schema.validate(&props).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Config);
        assert_eq!(err.component_name(), Some("web"));
    }

    #[test]
    fn schema_validation_checks_kinds() {
        let props = MemoryPropertySource::new();
        props.set_property("web.port", json!("not-a-port"));
        let schema = ConfigSchema::new("web")
            .property(PropertySpec::new("web.port", PropertyKind::Int));

        assert!(schema.validate(&props).is_err());

        props.set_property("web.port", json!(8080));
        assert!(schema.validate(&props).is_ok());
    }
}
