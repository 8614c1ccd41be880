//! Database Layer with Connection Pooling and Safe Transactions
//!
//! SQLite layer backing the knowledge store:
//! - Connection pooling via r2d2
//! - Panic-safe transactions with automatic rollback
//! - Schema version tracking via `user_version`
//! - WAL mode for file-backed databases

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension};

use crate::types::{Result, ResultExt, SwarmError};

/// Shared database handle for async contexts.
pub type SharedDatabase = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version
const SCHEMA_VERSION: u32 = 1;

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 4,
            connection_timeout_secs: 30,
        }
    }
}

/// Thread-safe database with connection pooling.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open database with connection pooling at the specified path.
    ///
    /// Parent directories are created when missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    /// Open database with custom pool configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)
            .map_err(|e| SwarmError::Storage(format!("Failed to create connection pool: {}", e)))?;

        Ok(Self { pool })
    }

    /// Open an in-memory database for testing or temporary use.
    ///
    /// Pool size is 1: every in-memory connection is a separate database.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| SwarmError::Storage(format!("Failed to create in-memory pool: {}", e)))?;

        Ok(Self { pool })
    }

    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(SwarmError::Pool)
    }

    /// Initialize the database schema.
    ///
    /// Databases written by a newer schema version are refused.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;

        let current_version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .with_context("Failed to read schema version")?;
        if current_version > SCHEMA_VERSION {
            return Err(SwarmError::Storage(format!(
                "database schema version {} is newer than supported version {}",
                current_version, SCHEMA_VERSION
            )));
        }

        conn.execute_batch(SCHEMA)
            .with_context("Failed to initialize database schema")?;

        if current_version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .with_context("Failed to set schema version")?;
            tracing::info!("Initialized knowledge store schema v{}", SCHEMA_VERSION);
        }

        Ok(())
    }

    /// Current schema version
    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.conn()?;
        Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    /// Get a raw connection for advanced operations.
    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.conn()
    }

    /// Execute a single SQL statement.
    pub fn execute(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute(sql, params)?)
    }

    /// Run a single-row query; `None` when no row matches.
    pub fn query_row<T, F>(&self, sql: &str, params: &[&dyn rusqlite::ToSql], f: F) -> Result<Option<T>>
    where
        F: FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.conn()?;
        Ok(conn.query_row(sql, params, f).optional()?)
    }

    /// Execute a function within a panic-safe database transaction.
    ///
    /// All operations within the closure are atomic. If the closure panics,
    /// the transaction is rolled back and an error is returned instead of
    /// poisoning the connection pool.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .with_context("Failed to start transaction")?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&tx)));

        match result {
            Ok(Ok(value)) => {
                tx.commit().with_context("Failed to commit transaction")?;
                Ok(value)
            }
            // Rolled back on drop
            Ok(Err(e)) => Err(e),
            Err(panic_payload) => {
                let panic_msg = panic_payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());

                tracing::error!("Transaction panicked: {}", panic_msg);
                Err(SwarmError::Storage(format!(
                    "Transaction panicked: {}",
                    panic_msg
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table_count(db: &Database, table: &str) -> i64 {
        db.query_row(&format!("SELECT COUNT(*) FROM {}", table), &[], |row| {
            row.get(0)
        })
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_initialize_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
        assert_eq!(table_count(&db, "patterns"), 0);
        assert_eq!(table_count(&db, "search_cache"), 0);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("kb.db");
        let db = Database::open(&path).unwrap();
        db.initialize().unwrap();
        db.initialize().unwrap();
        assert!(path.exists());
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_initialize_refuses_newer_schema() {
        let db = Database::open_in_memory().unwrap();
        db.connection()
            .unwrap()
            .pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();

        assert!(matches!(db.initialize(), Err(SwarmError::Storage(_))));
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION + 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let result: Result<()> = db.transaction(|conn| {
            conn.execute(
                "INSERT INTO patterns (id, task, avg_score, agent_count, created_at)
                 VALUES ('p1', 'task', 95.0, 4, 0)",
                [],
            )?;
            Err(SwarmError::Storage("abort".into()))
        });

        assert!(result.is_err());
        assert_eq!(table_count(&db, "patterns"), 0);
    }

    #[test]
    fn test_transaction_rolls_back_on_panic() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let result: Result<()> = db.transaction(|conn| {
            conn.execute(
                "INSERT INTO patterns (id, task, avg_score, agent_count, created_at)
                 VALUES ('p1', 'task', 95.0, 4, 0)",
                [],
            )?;
            panic!("boom");
        });

        assert!(matches!(result, Err(SwarmError::Storage(msg)) if msg.contains("boom")));
        assert_eq!(table_count(&db, "patterns"), 0);
    }
}
