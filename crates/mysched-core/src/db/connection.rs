//! Database connection management

use std::path::Path;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::migrations;
use crate::error::Result;

/// Database wrapper for a `SQLite` connection
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let mut database = Self { conn };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut database = Self { conn };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` for a single-writer local store
    fn configure(&self) -> Result<()> {
        // WAL is unavailable for in-memory databases; the pragma reports the
        // mode it settled on instead of failing.
        let _mode: String = self
            .conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        self.conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Run database migrations
    fn migrate(&mut self) -> Result<()> {
        migrations::run(&mut self.conn)
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin a write transaction that holds the write lock from the start.
    ///
    /// Read-compare-write sequences run inside one of these so no other
    /// writer can interleave.
    pub fn write_transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}
