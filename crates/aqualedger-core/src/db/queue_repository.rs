//! Sync queue repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::{Error, Result};
use crate::models::{CatchId, OperationKind, OperationStatus, SyncOperation};
use rusqlite::{params, Connection};

/// Trait for sync queue operations
pub trait SyncQueueRepository {
    /// List queue entries oldest first, optionally filtered by status
    fn list(&self, status: Option<OperationStatus>, limit: usize) -> Result<Vec<SyncOperation>>;

    /// List queue entries for one catch, oldest first
    fn list_for_catch(&self, catch_id: CatchId) -> Result<Vec<SyncOperation>>;

    /// Count entries in `status`
    fn count(&self, status: OperationStatus) -> Result<usize>;

    /// Move a catch's pending/failed entries to `processing`, bumping attempts
    fn begin_attempt(&self, catch_id: CatchId) -> Result<usize>;

    /// Move a catch's `processing` entries to `completed` or `failed`
    fn finish_attempt(&self, catch_id: CatchId, succeeded: bool) -> Result<usize>;
}

/// `SQLite` implementation of `SyncQueueRepository`
pub struct SqliteSyncQueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSyncQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a queue entry from a database row
    fn parse_operation(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncOperation> {
        let kind: String = row.get(1)?;
        let payload: String = row.get(3)?;
        let status: String = row.get(5)?;

        Ok(SyncOperation {
            id: row.get(0)?,
            kind: kind.parse().map_err(|error| conversion_error(1, error))?,
            catch_id: CatchId::new(row.get(2)?),
            payload: serde_json::from_str(&payload).map_err(|error| conversion_error(3, error))?,
            timestamp: row.get(4)?,
            status: status.parse().map_err(|error| conversion_error(5, error))?,
            attempts: row.get(6)?,
        })
    }
}

/// Append a pending queue entry; callers own the surrounding transaction
pub(crate) fn insert_operation(
    conn: &Connection,
    kind: OperationKind,
    catch_id: CatchId,
    payload: &serde_json::Value,
    timestamp: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO sync_queue (operation, catch_id, payload, timestamp, status, attempts)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        params![
            kind.as_str(),
            catch_id.get(),
            serde_json::to_string(payload)?,
            timestamp,
            OperationStatus::Pending.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl SyncQueueRepository for SqliteSyncQueueRepository<'_> {
    fn list(&self, status: Option<OperationStatus>, limit: usize) -> Result<Vec<SyncOperation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, operation, catch_id, payload, timestamp, status, attempts
             FROM sync_queue
             WHERE (?1 IS NULL OR status = ?1)
             ORDER BY timestamp ASC, id ASC
             LIMIT ?2",
        )?;

        let operations = stmt
            .query_map(
                params![status.map(OperationStatus::as_str), limit as i64],
                Self::parse_operation,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(operations)
    }

    fn list_for_catch(&self, catch_id: CatchId) -> Result<Vec<SyncOperation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, operation, catch_id, payload, timestamp, status, attempts
             FROM sync_queue
             WHERE catch_id = ?1
             ORDER BY id ASC",
        )?;

        let operations = stmt
            .query_map(params![catch_id.get()], Self::parse_operation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(operations)
    }

    fn count(&self, status: OperationStatus) -> Result<usize> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn begin_attempt(&self, catch_id: CatchId) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE sync_queue SET status = ?1, attempts = attempts + 1
             WHERE catch_id = ?2 AND status IN (?3, ?4)",
            params![
                OperationStatus::Processing.as_str(),
                catch_id.get(),
                OperationStatus::Pending.as_str(),
                OperationStatus::Failed.as_str(),
            ],
        )?;
        Ok(rows)
    }

    fn finish_attempt(&self, catch_id: CatchId, succeeded: bool) -> Result<usize> {
        let outcome = if succeeded {
            OperationStatus::Completed
        } else {
            OperationStatus::Failed
        };
        let rows = self.conn.execute(
            "UPDATE sync_queue SET status = ?1 WHERE catch_id = ?2 AND status = ?3",
            params![
                outcome.as_str(),
                catch_id.get(),
                OperationStatus::Processing.as_str(),
            ],
        )?;
        Ok(rows)
    }
}

fn conversion_error(column: usize, error: impl Into<Error>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(error.into()),
    )
}
