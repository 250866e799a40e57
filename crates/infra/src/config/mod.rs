//! Configuration loading and validation
//!
//! Reads the monitor configuration from JSON or TOML files, validates the
//! alert-suppression section strictly and applies environment overrides.

pub mod error;
pub mod loader;
mod suppression;

// Re-export commonly used items
pub use error::{ConfigError, ConfigResult};
pub use loader::{probe_config_paths, ConfigFormat, ConfigLoader};
pub use suppression::parse_suppression_settings;
