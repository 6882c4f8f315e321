use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;

use bootkit::{
    Boot, Component, ComponentCtx, ComponentStatus, ComponentType, PropertySource as _, StatusCell,
};

/// Bootkit demo - minimal application on the component container
#[derive(Parser)]
#[command(name = "bootkit-demo")]
#[command(about = "Bootkit demo - minimal application on the component container")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// A user-contributed component: greets on start, waves goodbye on stop.
struct GreeterComponent {
    status: StatusCell,
}

#[async_trait]
impl Component for GreeterComponent {
    fn name(&self) -> &str {
        "greeter"
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::Core
    }

    fn status(&self) -> ComponentStatus {
        self.status.get()
    }

    async fn initialize(&self, ctx: &ComponentCtx) -> anyhow::Result<()> {
        let env = ctx.props().get_string("app.env", "development");
        tracing::info!(env = %env, "Greeter initialized");
        self.status.set(ComponentStatus::Initialized);
        Ok(())
    }

    async fn start(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        tracing::info!("Hello from the greeter component");
        self.status.set(ComponentStatus::Started);
        Ok(())
    }

    async fn stop(&self, _ctx: &ComponentCtx) -> anyhow::Result<()> {
        tracing::info!("Goodbye from the greeter component");
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

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut boot = Boot::new().add_component(Arc::new(GreeterComponent {
        status: StatusCell::new(),
    }));
    if let Some(path) = cli.config {
        boot = boot.config_path(path);
    }

    boot.run().await?;
    Ok(())
}
