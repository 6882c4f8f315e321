//! The `logger` component: initializes the global tracing subscriber from
//! the `logger.level` property.

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

pub const NAME: &str = "logger";

pub struct LoggerComponent {
    status: StatusCell,
    level: String,
}

impl LoggerComponent {
    pub fn level(&self) -> &str {
        &self.level
    }
}

#[async_trait]
impl Component for LoggerComponent {
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
        bootkit_bootstrap::logging::init_logging(&self.level);
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

pub struct LoggerComponentFactory;

impl ComponentFactory for LoggerComponentFactory {
    fn name(&self) -> &str {
        NAME
    }

    fn schema(&self) -> ConfigSchema {
        ConfigSchema::new(NAME).property(
            PropertySpec::new("logger.level", PropertyKind::String)
                .describe("minimum console log level"),
        )
    }

    fn create(&self, props: &dyn PropertySource) -> anyhow::Result<Arc<dyn Component>> {
        Ok(Arc::new(LoggerComponent {
            status: StatusCell::new(),
            level: props.get_string("logger.level", "info"),
        }))
    }
}

pub struct LoggerAutoConfigurer;

impl AutoConfigurer for LoggerAutoConfigurer {
    fn name(&self) -> &str {
        "logger"
    }

    fn order(&self) -> i32 {
        order::LOGGER
    }

    fn configure(
        &self,
        registry: &ComponentRegistry,
        props: &dyn PropertySource,
    ) -> Result<(), BootError> {
        if !props.get_bool("logger.enabled", true) {
            return Ok(());
        }
        registry.register_factory(Arc::new(LoggerComponentFactory))
    }
}
