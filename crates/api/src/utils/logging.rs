//! Tracing subscriber setup and command logging helpers.

use std::time::Duration;

use linkguard_domain::LinkGuardError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Selects JSON output when set to `json`.
pub const LOG_FORMAT_ENV: &str = "LINKGUARD_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

/// Installs the global tracing subscriber.
///
/// The filter comes from `RUST_LOG`, falling back to `info`. Returns `false`
/// when a subscriber was already installed, so repeated calls are harmless.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let installed = if json {
        builder.json().with_current_span(false).try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        info!(format = if json { "json" } else { "text" }, "logging_initialized");
    }
    installed
}

/// Log the outcome of a command execution with structured fields.
///
/// `command` should be a stable identifier such as
/// `"connection::get_connection_state"`.
#[inline]
pub fn log_command_execution(
    command: &str,
    elapsed: Duration,
    success: bool,
    error_type: Option<&'static str>,
) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    if success {
        info!(command, duration_ms, "command_execution_success");
    } else {
        warn!(command, duration_ms, error_type, "command_execution_failure");
    }
}

/// Stable label for a [`LinkGuardError`], suitable for log fields.
#[inline]
pub fn error_label(error: &LinkGuardError) -> &'static str {
    match error {
        LinkGuardError::Config(_) => "config",
        LinkGuardError::Store(_) => "store",
        LinkGuardError::Tracker(_) => "tracker",
        LinkGuardError::Connection(_) => "connection",
        LinkGuardError::NotFound(_) => "not_found",
        LinkGuardError::InvalidInput(_) => "invalid_input",
        LinkGuardError::Internal(_) => "internal",
    }
}
