pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::{Connection, ErrorCode, Transaction};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Shared handle to the relational store.
///
/// One connection behind a mutex: every statement and every transaction is
/// serialized, and the schema's primary keys back up the check-then-insert
/// paths in the domain layer.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Run `f` inside a transaction. Any `Err` from `f` rolls back every
    /// statement it issued; `Ok` commits.
    ///
    /// The closure's error type is the caller's, so domain errors raised
    /// mid-transaction come back unchanged.
    pub fn with_tx<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
        E: From<anyhow::Error>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| E::from(anyhow::anyhow!("DB lock poisoned: {}", e)))?;
        let tx = conn
            .transaction()
            .map_err(|e| E::from(anyhow::Error::from(e)))?;

        let value = f(&tx)?;

        tx.commit().map_err(|e| E::from(anyhow::Error::from(e)))?;
        Ok(value)
    }
}

/// True when the store rejected a write because of a uniqueness or foreign
/// key constraint.
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<rusqlite::Error>()
        .and_then(|e| e.sqlite_error_code())
        == Some(ErrorCode::ConstraintViolation)
}
