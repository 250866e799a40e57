//! # LinkGuard Infrastructure
//!
//! Infrastructure implementations of the core's ports.
//!
//! This crate contains:
//! - State backends for the shared connection store (in-memory, SQLite)
//! - Configuration loading and strict suppression-config validation
//! - Log-based notification delivery
//!
//! ## Architecture
//! - Implements traits defined in `linkguard-core`
//! - Contains all "impure" code (files, environment, databases)

pub mod config;
pub mod errors;
pub mod notification;
pub mod store;

// Re-export commonly used items
pub use config::{ConfigError, ConfigFormat, ConfigLoader, ConfigResult};
pub use errors::IntoStoreError;
pub use notification::LoggingNotificationSink;
pub use store::{open_backend, open_store, InMemoryStateBackend, SqliteStateBackend};
