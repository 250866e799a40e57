//! # LinkGuard API
//!
//! Application layer - context wiring and the inbound command surface.
//!
//! This crate contains:
//! - Application context (dependency injection, process-wide singleton)
//! - Inbound commands for connection state and alert suppression
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires the store, tracker, classifier and suppression manager once

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::{global_context, AppContext};
pub use utils::health::{ComponentHealth, HealthStatus};
pub use utils::logging::init_logging;
