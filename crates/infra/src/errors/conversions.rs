//! Conversions from external infrastructure errors into store errors.

use linkguard_core::store::StoreError;
use r2d2::Error as PoolError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Maps a foreign error onto [`StoreError`].
///
/// A trait rather than `From` impls: both sides of the conversion live in
/// other crates.
pub trait IntoStoreError {
    fn into_store_error(self) -> StoreError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → StoreError */
/* -------------------------------------------------------------------------- */

impl IntoStoreError for SqlError {
    fn into_store_error(self) -> StoreError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => StoreError::Backend("database is busy".into()),
                    ErrorCode::DatabaseLocked => StoreError::Backend("database is locked".into()),
                    ErrorCode::CannotOpen => {
                        StoreError::Connection(format!("cannot open database: {message}"))
                    }
                    ErrorCode::ReadOnly => StoreError::Backend("database is read-only".into()),
                    ErrorCode::DiskFull => StoreError::Backend("database disk is full".into()),
                    _ => StoreError::Backend(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                StoreError::Backend(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                StoreError::Backend(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => StoreError::Backend("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidPath(path) => StoreError::Connection(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → StoreError */
/* -------------------------------------------------------------------------- */

impl IntoStoreError for PoolError {
    fn into_store_error(self) -> StoreError {
        StoreError::Connection(format!("connection pool unavailable: {self}"))
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → StoreError */
/* -------------------------------------------------------------------------- */

impl IntoStoreError for JoinError {
    fn into_store_error(self) -> StoreError {
        if self.is_cancelled() {
            StoreError::Backend("blocking store task was cancelled".into())
        } else {
            StoreError::Backend(format!("blocking store task panicked: {self}"))
        }
    }
}
