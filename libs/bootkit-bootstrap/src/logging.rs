//! Console logging initialization.
//!
//! The level comes from the `logger.level` property; `RUST_LOG` still wins
//! when set so operators can raise verbosity per target without touching
//! the config file.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber. Safe to call more than once;
/// only the first call takes effect.
pub fn init_logging(level: &str) {
    let level = level.to_string();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(normalize_level(&level)));
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .finish()
            .try_init();
    });
}

fn normalize_level(s: &str) -> &'static str {
    match s.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        "off" | "none" => "off",
        _ => "info",
    }
}
