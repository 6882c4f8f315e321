//! The `database` component: a bundled in-process store standing in for a
//! real driver. Only the sqlite/memory drivers ship with the framework.

use std::sync::atomic::{AtomicBool, Ordering};
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

pub const NAME: &str = "database";

const SUPPORTED_DRIVERS: [&str; 2] = ["sqlite", "memory"];

pub struct DatabaseComponent {
    status: StatusCell,
    driver: String,
    dsn: String,
    connected: AtomicBool,
    tables: DashMap<String, Vec<Value>>,
}

impl DatabaseComponent {
    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn insert(&self, table: &str, row: Value) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .get(table)
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Component for DatabaseComponent {
    fn name(&self) -> &str {
        NAME
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::DataSource
    }

    fn status(&self) -> ComponentStatus {
        self.status.get()
    }

    async fn initialize(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        tracing::debug!(driver = %self.driver, dsn = %self.dsn, "Database initialized");
        self.status.set(ComponentStatus::Initialized);
        Ok(())
    }

    async fn start(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        self.status.set(ComponentStatus::Started);
        Ok(())
    }

    async fn stop(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.tables.clear();
        self.status.set(ComponentStatus::Stopped);
        Ok(())
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            anyhow::bail!("database not connected")
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct DatabaseComponentFactory;

impl ComponentFactory for DatabaseComponentFactory {
    fn name(&self) -> &str {
        NAME
    }

    fn schema(&self) -> ConfigSchema {
        ConfigSchema::new(NAME)
            .property(
                PropertySpec::new("database.driver", PropertyKind::String)
                    .describe("sqlite or memory"),
            )
            .property(PropertySpec::new("database.dsn", PropertyKind::String))
    }

    fn create(&self, props: &dyn PropertySource) -> anyhow::Result<Arc<dyn Component>> {
        let driver = props.get_string("database.driver", "sqlite");
        if !SUPPORTED_DRIVERS.contains(&driver.as_str()) {
            anyhow::bail!("unsupported database driver '{driver}'");
        }
        Ok(Arc::new(DatabaseComponent {
            status: StatusCell::new(),
            driver,
            dsn: props.get_string("database.dsn", ":memory:"),
            connected: AtomicBool::new(false),
            tables: DashMap::new(),
        }))
    }
}

pub struct DatabaseAutoConfigurer;

impl AutoConfigurer for DatabaseAutoConfigurer {
    fn name(&self) -> &str {
        "database"
    }

    fn order(&self) -> i32 {
        order::DATABASE
    }

    fn configure(
        &self,
        registry: &ComponentRegistry,
        props: &dyn PropertySource,
    ) -> Result<(), BootError> {
        if !props.get_bool("database.enabled", false) {
            return Ok(());
        }
        registry.register_factory(Arc::new(DatabaseComponentFactory))
    }
}
