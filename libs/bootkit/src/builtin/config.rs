//! The `config` component: surfaces the application's property source as a
//! first-class component so peers can depend on configuration readiness.

use std::sync::Arc;

use async_trait::async_trait;

use crate::autoconfig::order;
use crate::contracts::{
    AutoConfigurer, Component, ComponentCtx, ComponentFactory, ComponentStatus, ComponentType,
    ConfigSchema, PropertyKind, PropertySpec, StatusCell,
};
use crate::errors::BootError;
use crate::registry::ComponentRegistry;
use bootkit_bootstrap::PropertySource;

pub const NAME: &str = "config";

pub struct ConfigComponent {
    status: StatusCell,
    env: String,
}

impl ConfigComponent {
    pub fn env(&self) -> &str {
        &self.env
    }
}

#[async_trait]
impl Component for ConfigComponent {
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
        tracing::debug!(env = %self.env, "Configuration component initialized");
        self.status.set(ComponentStatus::Initialized);
        Ok(())
    }

    async fn start(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        self.status.set(ComponentStatus::Started);
        Ok(())
    }

    async fn stop(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
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

pub struct ConfigComponentFactory;

impl ComponentFactory for ConfigComponentFactory {
    fn name(&self) -> &str {
        NAME
    }

    fn schema(&self) -> ConfigSchema {
        ConfigSchema::new(NAME)
            .property(
                PropertySpec::new("app.env", PropertyKind::String)
                    .describe("environment tag (development, staging, production)"),
            )
            .property(PropertySpec::new("app.name", PropertyKind::String))
    }

    fn create(&self, props: &dyn PropertySource) -> anyhow::Result<Arc<dyn Component>> {
        Ok(Arc::new(ConfigComponent {
            status: StatusCell::new(),
            env: props.get_string("app.env", "development"),
        }))
    }
}

pub struct ConfigAutoConfigurer;

impl AutoConfigurer for ConfigAutoConfigurer {
    fn name(&self) -> &str {
        "config"
    }

    fn order(&self) -> i32 {
        order::CONFIG
    }

    fn configure(
        &self,
        registry: &ComponentRegistry,
        props: &dyn PropertySource,
    ) -> Result<(), BootError> {
        if !props.get_bool("config.enabled", true) {
            return Ok(());
        }
        registry.register_factory(Arc::new(ConfigComponentFactory))
    }
}
