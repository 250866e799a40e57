//! Shared connection-state persistence

pub mod connection_store;
pub mod error;

pub use connection_store::{counts_as_reconnecting, ConnectionStore};
pub use error::{StoreError, StoreResult};
