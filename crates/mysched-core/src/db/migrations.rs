//! Database migrations

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Migration to version 1: session records
fn migrate_v1(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS bookmarked_sessions (
            account TEXT NOT NULL,
            session_id TEXT NOT NULL,
            in_schedule INTEGER NOT NULL,
            timestamp_utc INTEGER NOT NULL CHECK (timestamp_utc >= 0),
            dirty INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (account, session_id)
        );
        CREATE INDEX IF NOT EXISTS idx_bookmarked_dirty ON bookmarked_sessions(account, dirty);

        CREATE TABLE IF NOT EXISTS reserved_sessions (
            account TEXT NOT NULL,
            session_id TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('reserved', 'waitlisted', 'deleted')),
            timestamp_utc INTEGER NOT NULL CHECK (timestamp_utc >= 0),
            dirty INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (account, session_id)
        );
        CREATE INDEX IF NOT EXISTS idx_reserved_dirty ON reserved_sessions(account, dirty);

        CREATE TABLE IF NOT EXISTS feedback_submitted_sessions (
            account TEXT NOT NULL,
            session_id TEXT NOT NULL,
            submitted_at INTEGER NOT NULL,
            dirty INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (account, session_id)
        );

        INSERT INTO schema_version (version) VALUES (1);",
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: LWW conflict logging support
fn migrate_v2(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS sync_conflicts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account TEXT NOT NULL,
            kind TEXT NOT NULL,
            session_id TEXT NOT NULL,
            stored_timestamp INTEGER NOT NULL,
            incoming_timestamp INTEGER NOT NULL,
            resolved_at INTEGER NOT NULL,
            strategy TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sync_conflicts_session ON sync_conflicts(account, session_id);
        CREATE INDEX IF NOT EXISTS idx_sync_conflicts_resolved_at ON sync_conflicts(resolved_at DESC);

        INSERT INTO schema_version (version) VALUES (2);",
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version 2");
    Ok(())
}
