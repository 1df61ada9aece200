//! Call record persistence.
//!
//! CRUD operations for the `calls` table. A record is inserted when a voice
//! session starts and completed by the post-call hook with the transcript and
//! (when enabled) the generated summary.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

/// A call record from the database.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub id: i64,
    pub call_id: String,
    pub instructions: Option<String>,
    pub status: String,
    pub transcript_text: Option<String>,
    pub summary: Option<String>,
    pub turn_count: Option<i64>,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub created_at: String,
}

/// Statuses a call record moves through.
pub mod status {
    pub const ACTIVE: &str = "active";
    pub const COMPLETED: &str = "completed";
}

/// Repository for call records.
pub struct CallRepository;

impl CallRepository {
    /// Insert a new call record (status = active). Returns the row id.
    pub fn insert(conn: &Connection, call_id: &str, instructions: &str) -> Result<i64> {
        conn.execute(
            "INSERT INTO calls (call_id, instructions, status) VALUES (?1, ?2, ?3)",
            params![call_id, instructions, status::ACTIVE],
        )
        .context("Failed to insert call")?;

        Ok(conn.last_insert_rowid())
    }

    /// Mark a call as completed with its transcript, optional summary, and
    /// turn count.
    pub fn complete(
        conn: &Connection,
        id: i64,
        transcript_text: &str,
        summary: Option<&str>,
        turn_count: i64,
    ) -> Result<()> {
        conn.execute(
            "UPDATE calls SET status = ?1, transcript_text = ?2, summary = ?3, \
             turn_count = ?4, ended_at = CURRENT_TIMESTAMP WHERE id = ?5",
            params![status::COMPLETED, transcript_text, summary, turn_count, id],
        )
        .context("Failed to complete call")?;
        Ok(())
    }

    /// Get a call record by row id.
    pub fn get(conn: &Connection, id: i64) -> Result<Option<CallRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, call_id, instructions, status, transcript_text, summary, \
                 turn_count, started_at, ended_at, created_at \
                 FROM calls WHERE id = ?1",
            )
            .context("Failed to prepare call query")?;

        let mut rows = stmt
            .query_map(params![id], Self::map_row)
            .context("Failed to query call")?;

        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// List call records, newest first.
    pub fn list(conn: &Connection, limit: usize) -> Result<Vec<CallRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, call_id, instructions, status, transcript_text, summary, \
                 turn_count, started_at, ended_at, created_at \
                 FROM calls ORDER BY started_at DESC, id DESC LIMIT ?1",
            )
            .context("Failed to prepare calls list query")?;

        let rows = stmt
            .query_map(params![limit as i64], Self::map_row)
            .context("Failed to list calls")?;

        let mut calls = Vec::new();
        for row in rows {
            calls.push(row?);
        }

        Ok(calls)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CallRecord> {
        Ok(CallRecord {
            id: row.get(0)?,
            call_id: row.get(1)?,
            instructions: row.get(2)?,
            status: row.get(3)?,
            transcript_text: row.get(4)?,
            summary: row.get(5)?,
            turn_count: row.get(6)?,
            started_at: row.get(7)?,
            ended_at: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_call() {
        let conn = setup_db();
        let id = CallRepository::insert(&conn, "call-1", "Be concise.").unwrap();
        assert!(id > 0);

        let record = CallRepository::get(&conn, id).unwrap().unwrap();
        assert_eq!(record.call_id, "call-1");
        assert_eq!(record.status, "active");
        assert_eq!(record.instructions, Some("Be concise.".to_string()));
        assert!(record.ended_at.is_none());
    }

    #[test]
    fn test_get_nonexistent_call() {
        let conn = setup_db();
        assert!(CallRepository::get(&conn, 9999).unwrap().is_none());
    }

    #[test]
    fn test_complete_call_with_summary() {
        let conn = setup_db();
        let id = CallRepository::insert(&conn, "call-1", "Be concise.").unwrap();

        CallRepository::complete(
            &conn,
            id,
            "User: hello\nAssistant: hi",
            Some("Short greeting call."),
            2,
        )
        .unwrap();

        let record = CallRepository::get(&conn, id).unwrap().unwrap();
        assert_eq!(record.status, "completed");
        assert_eq!(record.summary, Some("Short greeting call.".to_string()));
        assert_eq!(record.turn_count, Some(2));
        assert!(record.ended_at.is_some());
    }

    #[test]
    fn test_complete_call_without_summary() {
        let conn = setup_db();
        let id = CallRepository::insert(&conn, "call-1", "").unwrap();

        CallRepository::complete(&conn, id, "transcript", None, 4).unwrap();

        let record = CallRepository::get(&conn, id).unwrap().unwrap();
        assert_eq!(record.status, "completed");
        assert!(record.summary.is_none());
    }

    #[test]
    fn test_list_calls_newest_first() {
        let conn = setup_db();

        CallRepository::insert(&conn, "call-1", "").unwrap();
        CallRepository::insert(&conn, "call-2", "").unwrap();
        CallRepository::insert(&conn, "call-3", "").unwrap();

        let calls = CallRepository::list(&conn, 2).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].call_id, "call-3");
    }

    #[test]
    fn test_list_empty() {
        let conn = setup_db();
        assert!(CallRepository::list(&conn, 10).unwrap().is_empty());
    }
}
