//! Storefront application wiring.
//!
//! - `services.rs`: storage backend selection and service construction
//! - `main.rs`: process entry point (config → tracing → services → worker)

pub mod services;

pub use services::{AppBus, AppServices, build_services};
