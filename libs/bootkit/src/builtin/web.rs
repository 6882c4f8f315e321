//! The `web` component: a minimal HTTP listener exposing `/healthz`.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::get, Router};
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::autoconfig::order;
use crate::contracts::{
    AutoConfigurer, Component, ComponentCtx, ComponentFactory, ComponentStatus, ComponentType,
    ConfigSchema, PropertyKind, PropertySpec, StatusCell,
};
use crate::errors::BootError;
use crate::registry::ComponentRegistry;
use bootkit_bootstrap::PropertySource;

pub const NAME: &str = "web";

pub struct WebComponent {
    status: StatusCell,
    host: String,
    port: u16,
    stop: CancellationToken,
    bound: RwLock<Option<SocketAddr>>,
    server: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl WebComponent {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The address actually bound, available once started. Differs from
    /// `port()` when port 0 was requested.
    pub fn bound_addr(&self) -> Option<SocketAddr> {
        *self.bound.read()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[async_trait]
impl Component for WebComponent {
    fn name(&self) -> &str {
        NAME
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::Web
    }

    fn status(&self) -> ComponentStatus {
        self.status.get()
    }

    async fn initialize(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        self.status.set(ComponentStatus::Initialized);
        Ok(())
    }

    async fn start(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind((self.host.as_str(), self.port)).await?;
        let addr = listener.local_addr()?;
        *self.bound.write() = Some(addr);

        let router = Router::new().route("/healthz", get(healthz));
        let stop = self.stop.clone();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await;
            if let Err(e) = result {
                tracing::warn!(error = %e, "HTTP server terminated with error");
            }
        });
        *self.server.lock() = Some(handle);

        tracing::info!(%addr, "Web component listening");
        self.status.set(ComponentStatus::Started);
        Ok(())
    }

    async fn stop(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        self.stop.cancel();
        let handle = self.server.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        *self.bound.write() = None;
        self.status.set(ComponentStatus::Stopped);
        Ok(())
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        if self.bound.read().is_some() {
            Ok(())
        } else {
            anyhow::bail!("listener not bound")
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct WebComponentFactory;

impl ComponentFactory for WebComponentFactory {
    fn name(&self) -> &str {
        NAME
    }

    fn schema(&self) -> ConfigSchema {
        ConfigSchema::new(NAME)
            .property(PropertySpec::new("web.host", PropertyKind::String))
            .property(PropertySpec::new("web.port", PropertyKind::Int))
    }

    fn create(&self, props: &dyn PropertySource) -> anyhow::Result<Arc<dyn Component>> {
        let port = props.get_int("web.port", 8080);
        let port = u16::try_from(port)
            .map_err(|_| anyhow::anyhow!("web.port {port} is out of range"))?;
        Ok(Arc::new(WebComponent {
            status: StatusCell::new(),
            host: props.get_string("web.host", "0.0.0.0"),
            port,
            stop: CancellationToken::new(),
            bound: RwLock::new(None),
            server: Mutex::new(None),
        }))
    }
}

pub struct WebAutoConfigurer;

impl AutoConfigurer for WebAutoConfigurer {
    fn name(&self) -> &str {
        "web"
    }

    fn order(&self) -> i32 {
        order::WEB
    }

    fn configure(
        &self,
        registry: &ComponentRegistry,
        props: &dyn PropertySource,
    ) -> Result<(), BootError> {
        if !props.get_bool("web.enabled", false) {
            return Ok(());
        }
        registry.register_factory(Arc::new(WebComponentFactory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootkit_bootstrap::MemoryPropertySource;
    use serde_json::json;

    #[tokio::test]
    async fn start_and_stop_bind_release() {
        let props = MemoryPropertySource::new();
        props.set_property("web.host", json!("127.0.0.1"));
        props.set_property("web.port", json!(0));

        let component = WebComponentFactory.create(&props).unwrap();
        let web = component
            .as_any()
            .downcast_ref::<WebComponent>()
            .expect("web component");

        let registry = Arc::new(ComponentRegistry::new(Arc::new(
            MemoryPropertySource::new(),
        )));
        let ctx = ComponentCtx::new(
            Arc::new(MemoryPropertySource::new()),
            registry,
            CancellationToken::new(),
        );

        component.start(&ctx).await.unwrap();
        let addr = web.bound_addr().expect("bound address");
        assert_ne!(addr.port(), 0);
        assert!(component.health_check().await.is_ok());

        component.stop(&ctx).await.unwrap();
        assert!(web.bound_addr().is_none());
        assert!(component.health_check().await.is_err());
    }
}
