//! Auto-configuration engine: ordered configurer execution and default
//! property seeding.

use std::sync::Arc;

use serde_json::json;

use crate::contracts::{AutoConfigurer, ComponentActivator};
use crate::errors::BootError;
use crate::registry::ComponentRegistry;
use bootkit_bootstrap::PropertySource;

/// Order values for the built-in configurers. User configurers typically
/// slot at [`order::USER`] or above.
pub mod order {
    pub const CONFIG: i32 = 50;
    pub const LOGGER: i32 = 100;
    pub const DATABASE: i32 = 200;
    pub const CACHE: i32 = 300;
    pub const WEB: i32 = 400;
    pub const USER: i32 = 1000;
}

#[derive(Default)]
pub struct AutoConfig {
    configurers: Vec<Arc<dyn AutoConfigurer>>,
    activators: Vec<Arc<dyn ComponentActivator>>,
}

impl AutoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and keep ascending order; the sort is stable so insertion
    /// order is preserved among equal `order()` values.
    pub fn add_configurer(&mut self, configurer: Arc<dyn AutoConfigurer>) {
        self.configurers.push(configurer);
        self.configurers.sort_by_key(|c| c.order());
    }

    pub fn add_activator(&mut self, activator: Arc<dyn ComponentActivator>) {
        self.activators.push(activator);
    }

    pub fn configurers(&self) -> &[Arc<dyn AutoConfigurer>] {
        &self.configurers
    }

    pub fn activators(&self) -> &[Arc<dyn ComponentActivator>] {
        &self.activators
    }

    /// Seed defaults, then run every configurer in order. Returns on the
    /// first configurer error.
    pub fn configure(
        &self,
        registry: &ComponentRegistry,
        props: &dyn PropertySource,
    ) -> Result<(), BootError> {
        seed_default_properties(props);
        for configurer in &self.configurers {
            tracing::debug!(
                configurer = configurer.name(),
                order = configurer.order(),
                "Running auto-configurer"
            );
            configurer.configure(registry, props)?;
        }
        Ok(())
    }
}

/// Seed recognized defaults. Idempotent: a key is only set when absent.
pub fn seed_default_properties(props: &dyn PropertySource) {
    let set_if_absent = |key: &str, value: serde_json::Value| {
        if !props.has_property(key) {
            props.set_property(key, value);
        }
    };

    set_if_absent("app.name", json!("BootkitApp"));
    set_if_absent("app.version", json!("1.0.0"));
    set_if_absent("app.env", json!("development"));
    set_if_absent("logger.level", json!("info"));

    if props.get_bool("database.enabled", false) {
        set_if_absent("database.driver", json!("sqlite"));
        if props.get_string("database.driver", "sqlite") == "sqlite" {
            set_if_absent("database.dsn", json!(":memory:"));
        }
    }

    set_if_absent("cache.enabled", json!(true));
    if props.get_bool("cache.enabled", false) {
        set_if_absent("cache.type", json!("memory"));
    }

    if props.get_bool("web.enabled", false) {
        set_if_absent("web.port", json!(8080));
        set_if_absent("web.host", json!("0.0.0.0"));
    }
}
