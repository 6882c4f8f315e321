//! Structured errors for the container.
//!
//! One sum type with three variants rather than an inheritance chain.
//! Every variant carries the offending component (where known) and a
//! creation timestamp; causes are exposed through `std::error::Error::source`.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Programmatic dispatch tag for [`BootError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Component,
    Dependency,
}

/// The lifecycle operation a component error originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentOp {
    Register,
    Create,
    Initialize,
    Start,
    Stop,
}

impl std::fmt::Display for ComponentOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComponentOp::Register => "register",
            ComponentOp::Create => "create",
            ComponentOp::Initialize => "initialize",
            ComponentOp::Start => "start",
            ComponentOp::Stop => "stop",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum BootError {
    /// Configuration-level failure: bad values, schema violations,
    /// autoconfiguration failures.
    #[error("configuration error: {message}")]
    Config {
        message: String,
        component: Option<String>,
        timestamp: DateTime<Utc>,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A component lifecycle operation failed.
    #[error("component '{component}': {op} failed: {message}")]
    Component {
        op: ComponentOp,
        component: String,
        message: String,
        timestamp: DateTime<Utc>,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Dependency resolution failure: missing dependency or cycle.
    #[error("component '{component}': {message} (chain: {})", chain.join(" -> "))]
    Dependency {
        component: String,
        message: String,
        chain: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

impl BootError {
    pub fn config(message: impl Into<String>) -> Self {
        BootError::Config {
            message: message.into(),
            component: None,
            timestamp: Utc::now(),
            source: None,
        }
    }

    pub fn config_for(component: impl Into<String>, message: impl Into<String>) -> Self {
        BootError::Config {
            message: message.into(),
            component: Some(component.into()),
            timestamp: Utc::now(),
            source: None,
        }
    }

    pub fn config_with(message: impl Into<String>, source: anyhow::Error) -> Self {
        BootError::Config {
            message: message.into(),
            component: None,
            timestamp: Utc::now(),
            source: Some(source),
        }
    }

    pub fn component(op: ComponentOp, component: impl Into<String>, source: anyhow::Error) -> Self {
        BootError::Component {
            op,
            component: component.into(),
            message: source.to_string(),
            timestamp: Utc::now(),
            source: Some(source),
        }
    }

    pub fn component_msg(
        op: ComponentOp,
        component: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        BootError::Component {
            op,
            component: component.into(),
            message: message.into(),
            timestamp: Utc::now(),
            source: None,
        }
    }

    pub fn dependency(
        component: impl Into<String>,
        message: impl Into<String>,
        chain: Vec<String>,
    ) -> Self {
        BootError::Dependency {
            component: component.into(),
            message: message.into(),
            chain,
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BootError::Config { .. } => ErrorKind::Config,
            BootError::Component { .. } => ErrorKind::Component,
            BootError::Dependency { .. } => ErrorKind::Dependency,
        }
    }

    /// Offending component name, where known.
    pub fn component_name(&self) -> Option<&str> {
        match self {
            BootError::Config { component, .. } => component.as_deref(),
            BootError::Component { component, .. } => Some(component),
            BootError::Dependency { component, .. } => Some(component),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            BootError::Config { timestamp, .. }
            | BootError::Component { timestamp, .. }
            | BootError::Dependency { timestamp, .. } => *timestamp,
        }
    }

    /// The dependency chain for [`BootError::Dependency`], `None` otherwise.
    pub fn chain(&self) -> Option<&[String]> {
        match self {
            BootError::Dependency { chain, .. } => Some(chain),
            _ => None,
        }
    }

    /// The lifecycle operation for [`BootError::Component`], `None` otherwise.
    pub fn op(&self) -> Option<ComponentOp> {
        match self {
            BootError::Component { op, .. } => Some(*op),
            _ => None,
        }
    }
}
