//! SQLite-backed state backend shared between processes.
//!
//! Four tables mirror the backend slots: `kv_hash`, `kv_sorted`, `kv_value`
//! and `kv_expiry`. Expiry is checked lazily: every operation first evicts
//! its key if the deadline has passed, so expired keys read as absent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linkguard_common::time::Clock;
use linkguard_core::ports::StateBackend;
use linkguard_core::store::StoreResult;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;
use tracing::info;

use crate::errors::IntoStoreError;

type SqlitePool = Pool<SqliteConnectionManager>;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS kv_hash (
    key   TEXT NOT NULL,
    field TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (key, field)
);
CREATE TABLE IF NOT EXISTS kv_sorted (
    key    TEXT NOT NULL,
    member TEXT NOT NULL,
    score  REAL NOT NULL,
    PRIMARY KEY (key, member)
);
CREATE INDEX IF NOT EXISTS kv_sorted_score ON kv_sorted (key, score);
CREATE TABLE IF NOT EXISTS kv_value (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS kv_expiry (
    key        TEXT PRIMARY KEY,
    expires_at REAL NOT NULL
);
";

const PRAGMAS_SQL: &str = "PRAGMA journal_mode=WAL;\nPRAGMA synchronous=NORMAL;\n";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// State backend over a SQLite file and an r2d2 pool.
///
/// Blocking SQLite calls run on the blocking thread pool.
pub struct SqliteStateBackend {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    path: PathBuf,
}

impl SqliteStateBackend {
    /// Opens (creating if needed) the database at `path`.
    ///
    /// # Errors
    /// Pool construction or schema creation failure.
    pub fn open<P: AsRef<Path>>(
        path: P,
        pool_size: u32,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let manager = SqliteConnectionManager::file(&path)
            .with_init(|conn: &mut Connection| apply_connection_pragmas(conn));
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(IntoStoreError::into_store_error)?;

        let conn = pool.get().map_err(IntoStoreError::into_store_error)?;
        conn.execute_batch(SCHEMA_SQL).map_err(IntoStoreError::into_store_error)?;

        info!(db_path = %path.display(), max_connections = pool.max_size(), "sqlite_state_backend_opened");
        Ok(Self { pool, clock, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `op` on a pooled connection, after evicting `key` if expired.
    async fn run<T, F>(&self, key: &str, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str, f64) -> rusqlite::Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let key = key.to_string();
        let now = self.clock.unix_seconds();

        task::spawn_blocking(move || -> StoreResult<T> {
            let conn: PooledConnection<SqliteConnectionManager> =
                pool.get().map_err(IntoStoreError::into_store_error)?;
            evict_if_expired(&conn, &key, now).map_err(IntoStoreError::into_store_error)?;
            op(&conn, &key, now).map_err(IntoStoreError::into_store_error)
        })
        .await
        .map_err(IntoStoreError::into_store_error)?
    }
}

fn apply_connection_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(PRAGMAS_SQL)?;
    conn.busy_timeout(BUSY_TIMEOUT)
}

fn evict_if_expired(conn: &Connection, key: &str, now: f64) -> rusqlite::Result<()> {
    let expired = conn
        .query_row(
            "SELECT expires_at <= ?2 FROM kv_expiry WHERE key = ?1",
            params![key, now],
            |row| row.get::<_, bool>(0),
        )
        .optional()?
        .unwrap_or(false);
    if expired {
        delete_key(conn, key)?;
    }
    Ok(())
}

fn delete_key(conn: &Connection, key: &str) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM kv_hash WHERE key = ?1", params![key])?;
    tx.execute("DELETE FROM kv_sorted WHERE key = ?1", params![key])?;
    tx.execute("DELETE FROM kv_value WHERE key = ?1", params![key])?;
    tx.execute("DELETE FROM kv_expiry WHERE key = ?1", params![key])?;
    tx.commit()
}

fn key_exists(conn: &Connection, key: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM kv_hash WHERE key = ?1)
             OR EXISTS (SELECT 1 FROM kv_sorted WHERE key = ?1)
             OR EXISTS (SELECT 1 FROM kv_value WHERE key = ?1)",
        params![key],
        |row| row.get(0),
    )
}

/// Drops the expiry row of a key whose data is gone.
fn drop_orphan_expiry(conn: &Connection, key: &str) -> rusqlite::Result<()> {
    if !key_exists(conn, key)? {
        conn.execute("DELETE FROM kv_expiry WHERE key = ?1", params![key])?;
    }
    Ok(())
}

#[async_trait]
impl StateBackend for SqliteStateBackend {
    async fn hash_set(&self, key: &str, field: &str, value: String) -> StoreResult<()> {
        let field = field.to_string();
        self.run(key, move |conn, key, _| {
            conn.execute(
                "INSERT INTO kv_hash (key, field, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key, field) DO UPDATE SET value = excluded.value",
                params![key, field, value],
            )
            .map(|_| ())
        })
        .await
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let field = field.to_string();
        self.run(key, move |conn, key, _| {
            conn.query_row(
                "SELECT value FROM kv_hash WHERE key = ?1 AND field = ?2",
                params![key, field],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.run(key, |conn, key, _| {
            let mut stmt = conn.prepare("SELECT field, value FROM kv_hash WHERE key = ?1")?;
            let rows = stmt.query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
    }

    async fn hash_delete(&self, key: &str, fields: &[String]) -> StoreResult<usize> {
        let fields = fields.to_vec();
        self.run(key, move |conn, key, _| {
            let tx = conn.unchecked_transaction()?;
            let mut removed = 0;
            for field in &fields {
                removed += tx.execute(
                    "DELETE FROM kv_hash WHERE key = ?1 AND field = ?2",
                    params![key, field],
                )?;
            }
            drop_orphan_expiry(&tx, key)?;
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let ttl = ttl.as_secs_f64();
        self.run(key, move |conn, key, now| {
            if !key_exists(conn, key)? {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO kv_expiry (key, expires_at) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET expires_at = excluded.expires_at",
                params![key, now + ttl],
            )?;
            Ok(true)
        })
        .await
    }

    async fn sorted_add(&self, key: &str, score: f64, member: String) -> StoreResult<()> {
        self.run(key, move |conn, key, _| {
            conn.execute(
                "INSERT INTO kv_sorted (key, member, score) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key, member) DO UPDATE SET score = excluded.score",
                params![key, member, score],
            )
            .map(|_| ())
        })
        .await
    }

    async fn sorted_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<String>> {
        self.run(key, move |conn, key, _| {
            let mut stmt = conn.prepare(
                "SELECT member FROM kv_sorted
                 WHERE key = ?1 AND score >= ?2 AND score <= ?3
                 ORDER BY score ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![key, min, max], |row| row.get(0))?;
            rows.collect()
        })
        .await
    }

    async fn sorted_remove_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<usize> {
        self.run(key, move |conn, key, _| {
            let tx = conn.unchecked_transaction()?;
            let removed = tx.execute(
                "DELETE FROM kv_sorted WHERE key = ?1 AND score >= ?2 AND score <= ?3",
                params![key, min, max],
            )?;
            drop_orphan_expiry(&tx, key)?;
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    async fn set_value(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()> {
        let ttl = ttl.map(|ttl| ttl.as_secs_f64());
        self.run(key, move |conn, key, now| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO kv_value (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            match ttl {
                Some(ttl) => tx.execute(
                    "INSERT INTO kv_expiry (key, expires_at) VALUES (?1, ?2)
                     ON CONFLICT (key) DO UPDATE SET expires_at = excluded.expires_at",
                    params![key, now + ttl],
                )?,
                None => tx.execute("DELETE FROM kv_expiry WHERE key = ?1", params![key])?,
            };
            tx.commit()
        })
        .await
    }

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        self.run(key, |conn, key, _| {
            conn.query_row("SELECT value FROM kv_value WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
        })
        .await
    }
}
