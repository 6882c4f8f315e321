//! # Bootkit - Component Container & Application Lifecycle
//!
//! A container that discovers, instantiates, wires and drives a set of named
//! components through a strict lifecycle, guided by declarative enable/disable
//! properties from a configuration source.
//!
//! ## Pieces
//!
//! - **Registry**: stores components and factories, resolves dependencies by
//!   topological sort, detects cycles, instantiates in dependency order.
//! - **AutoConfig**: runs ordered configurers that register factories and
//!   seed default properties.
//! - **Application**: the lifecycle state machine
//!   (Created → Initializing → Initialized → Starting → Running → Stopping →
//!   Stopped, with a Failed sink).
//! - **EventBus / HealthChecker**: lifecycle events and periodic aggregated
//!   health polling.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use bootkit::Boot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bootkit::BootError> {
//!     Boot::new()
//!         .config_path("app.yaml")
//!         .add_component(my_component)
//!         .run()
//!         .await
//! }
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod app;
pub mod autoconfig;
pub mod boot;
pub mod builtin;
pub mod contracts;
pub mod errors;
pub mod events;
pub mod health;
pub mod registry;

pub use app::{AppState, Application, ShutdownOptions};
pub use autoconfig::AutoConfig;
pub use boot::Boot;
pub use contracts::{
    AutoConfigurer, Component, ComponentActivator, ComponentCtx, ComponentFactory,
    ComponentStatus, ComponentType, ConfigSchema, Plugin, PropertyKind, PropertySpec, StatusCell,
};
pub use errors::{BootError, ComponentOp, ErrorKind};
pub use events::{topics, EventBus, Listener, SubscriptionToken};
pub use health::{HealthChecker, HealthSnapshot};
pub use registry::{ComponentRegistry, RegistryMetrics};

// Re-export the bootstrap surface for convenience.
pub use bootkit_bootstrap::{MemoryPropertySource, PropertySource};
