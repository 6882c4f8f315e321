//! Built-in sample components and their auto-configurers.
//!
//! Each module contributes one well-known component behind an enabling
//! property, registered by a configurer at its canonical order.

pub mod cache;
pub mod config;
pub mod database;
pub mod logger;
pub mod web;

use std::sync::Arc;

use crate::contracts::AutoConfigurer;

/// The five built-in configurers in canonical order.
pub fn builtin_configurers() -> Vec<Arc<dyn AutoConfigurer>> {
    vec![
        Arc::new(config::ConfigAutoConfigurer),
        Arc::new(logger::LoggerAutoConfigurer),
        Arc::new(database::DatabaseAutoConfigurer),
        Arc::new(cache::CacheAutoConfigurer),
        Arc::new(web::WebAutoConfigurer),
    ]
}
