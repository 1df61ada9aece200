//! SQLite persistence for completed calls.
//!
//! Raw SQL with rusqlite, no ORM. Live sessions are never stored here; a row
//! is opened when a call starts and filled in by the post-call hook.

use anyhow::{Context, Result};
use rusqlite::Connection;

pub mod calls;

pub fn init_db() -> Result<Connection> {
    let db_path = crate::global::db_file()?;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(&db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS calls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            call_id TEXT NOT NULL,
            instructions TEXT,
            status TEXT NOT NULL,
            transcript_text TEXT,
            summary TEXT,
            turn_count INTEGER,
            started_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            ended_at TIMESTAMP,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create calls table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_calls_started_at ON calls(started_at DESC)",
        [],
    )
    .context("Failed to create index on started_at")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_creates_table() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='calls'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
    }
}
