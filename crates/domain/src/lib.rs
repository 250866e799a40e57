//! # LinkGuard Domain
//!
//! Business types shared by every LinkGuard crate.
//!
//! This crate contains:
//! - Connection lifecycle types (states, persisted records, metrics, events)
//! - Alerting types (alert and service types, suppression rules and decisions)
//! - Configuration structures
//! - Domain error type and `Result` alias
//!
//! ## Architecture
//! - No dependencies on other LinkGuard crates
//! - Pure data structures; no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
