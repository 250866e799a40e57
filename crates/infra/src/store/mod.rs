//! State backends for the shared connection store

pub mod memory;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use linkguard_common::time::Clock;
use linkguard_core::ports::StateBackend;
use linkguard_core::store::StoreResult;
use linkguard_core::ConnectionStore;
use linkguard_domain::StoreConfig;
use tracing::info;

pub use memory::InMemoryStateBackend;
pub use sqlite::SqliteStateBackend;

/// Backend selected by `config`: SQLite when a path is set, in-memory
/// otherwise.
///
/// # Errors
/// Failure to open the SQLite database.
pub fn open_backend(config: &StoreConfig, clock: Arc<dyn Clock>) -> StoreResult<Arc<dyn StateBackend>> {
    match &config.sqlite_path {
        Some(path) => {
            let backend = SqliteStateBackend::open(path, config.pool_size, clock)?;
            Ok(Arc::new(backend))
        }
        None => {
            info!("in_memory_state_backend_selected");
            Ok(Arc::new(InMemoryStateBackend::new(clock)))
        }
    }
}

/// [`ConnectionStore`] over the configured backend, with the configured TTL
/// and per-operation timeout.
///
/// # Errors
/// Same as [`open_backend`].
pub fn open_store(config: &StoreConfig, clock: Arc<dyn Clock>) -> StoreResult<ConnectionStore> {
    let backend = open_backend(config, Arc::clone(&clock))?;
    Ok(ConnectionStore::new(backend, clock)
        .with_state_ttl(Duration::from_secs(config.state_ttl_seconds))
        .with_operation_timeout(Duration::from_secs(config.operation_timeout_seconds)))
}
