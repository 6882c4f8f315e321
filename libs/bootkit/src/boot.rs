//! Boot facade: collects user contributions, registers the built-in
//! configurers and drives the application.

use std::path::PathBuf;
use std::sync::Arc;

use crate::app::Application;
use crate::builtin;
use crate::contracts::{AutoConfigurer, Component, ComponentActivator, Plugin};
use crate::errors::BootError;
use bootkit_bootstrap::load_property_source;

/// Chainable assembly of an application.
///
/// ```no_run
/// # async fn demo() -> Result<(), bootkit::BootError> {
/// bootkit::Boot::new()
///     .config_path("app.yaml")
///     .run()
///     .await
/// # }
/// ```
#[derive(Default)]
pub struct Boot {
    config_path: Option<PathBuf>,
    components: Vec<Arc<dyn Component>>,
    plugins: Vec<Arc<dyn Plugin>>,
    configurers: Vec<Arc<dyn AutoConfigurer>>,
    activators: Vec<Arc<dyn ComponentActivator>>,
}

impl Boot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn add_component(mut self, component: Arc<dyn Component>) -> Self {
        self.components.push(component);
        self
    }

    pub fn add_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn add_configurer(mut self, configurer: Arc<dyn AutoConfigurer>) -> Self {
        self.configurers.push(configurer);
        self
    }

    pub fn add_activator(mut self, activator: Arc<dyn ComponentActivator>) -> Self {
        self.activators.push(activator);
        self
    }

    /// Build the application, run the full lifecycle and block until an OS
    /// signal triggers graceful shutdown.
    pub async fn run(self) -> Result<(), BootError> {
        let app = self.build()?;
        app.run().await
    }

    /// Build and initialize, returning the application for custom steps
    /// before `run`.
    pub async fn initialize(self) -> Result<Application, BootError> {
        let app = self.build()?;
        app.initialize().await?;
        Ok(app)
    }

    fn build(self) -> Result<Application, BootError> {
        let props = load_property_source(self.config_path.as_deref())
            .map_err(|e| BootError::config_with("failed to load configuration", e))?;
        let app = Application::new(Arc::new(props));

        for configurer in builtin::builtin_configurers() {
            app.add_configurer(configurer);
        }
        for configurer in self.configurers {
            app.add_configurer(configurer);
        }
        for activator in self.activators {
            app.add_activator(activator);
        }
        for component in self.components {
            app.register_component(component)?;
        }
        for plugin in self.plugins {
            if let Err(e) = plugin.register(&app) {
                tracing::warn!(plugin = plugin.name(), error = %e, "Plugin registration failed; skipping");
            }
        }

        Ok(app)
    }
}
