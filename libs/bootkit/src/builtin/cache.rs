//! The `cache` component: a process-local key/value cache.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::autoconfig::order;
use crate::contracts::{
    AutoConfigurer, Component, ComponentCtx, ComponentFactory, ComponentStatus, ComponentType,
    ConfigSchema, PropertyKind, PropertySpec, StatusCell,
};
use crate::errors::BootError;
use crate::registry::ComponentRegistry;
use bootkit_bootstrap::PropertySource;

pub const NAME: &str = "cache";

pub struct CacheComponent {
    status: StatusCell,
    kind: String,
    store: DashMap<String, Value>,
}

impl CacheComponent {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn put(&self, key: impl Into<String>, value: Value) {
        self.store.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(key).map(|v| v.clone())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.store.remove(key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl Component for CacheComponent {
    fn name(&self) -> &str {
        NAME
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::Infrastructure
    }

    fn status(&self) -> ComponentStatus {
        self.status.get()
    }

    async fn initialize(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        if self.kind != "memory" {
            anyhow::bail!("unsupported cache type '{}'", self.kind);
        }
        self.status.set(ComponentStatus::Initialized);
        Ok(())
    }

    async fn start(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        self.status.set(ComponentStatus::Started);
        Ok(())
    }

    async fn stop(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        self.store.clear();
        self.status.set(ComponentStatus::Stopped);
        Ok(())
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct CacheComponentFactory;

impl ComponentFactory for CacheComponentFactory {
    fn name(&self) -> &str {
        NAME
    }

    fn schema(&self) -> ConfigSchema {
        ConfigSchema::new(NAME)
            .property(PropertySpec::new("cache.enabled", PropertyKind::Bool))
            .property(
                PropertySpec::new("cache.type", PropertyKind::String)
                    .describe("cache backend; only 'memory' is bundled"),
            )
    }

    fn create(&self, props: &dyn PropertySource) -> anyhow::Result<Arc<dyn Component>> {
        Ok(Arc::new(CacheComponent {
            status: StatusCell::new(),
            kind: props.get_string("cache.type", "memory"),
            store: DashMap::new(),
        }))
    }
}

pub struct CacheAutoConfigurer;

impl AutoConfigurer for CacheAutoConfigurer {
    fn name(&self) -> &str {
        "cache"
    }

    fn order(&self) -> i32 {
        order::CACHE
    }

    fn configure(
        &self,
        registry: &ComponentRegistry,
        props: &dyn PropertySource,
    ) -> Result<(), BootError> {
        if !props.get_bool("cache.enabled", false) {
            return Ok(());
        }
        registry.register_factory(Arc::new(CacheComponentFactory))
    }
}
