//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use tempgrant_core::{
    from_unix_seconds, ExecutionLogEntry, ExecutionStatus, GrantRequest, LogId, NewGrantRequest,
    NewLogEntry, RequestId, RequestStatus,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Store, UpdateResult};

const REQUEST_COLUMNS: &str = "request_id, user_name, grant_statement, end_ts_utc, status";
const LOG_COLUMNS: &str = "log_id, user_name, statement, exe_ts_utc, external_reference, status";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

fn conversion_error(idx: usize, e: tempgrant_core::CoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

// Helper to convert a row to GrantRequest
fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<GrantRequest> {
    let end_secs: i64 = row.get("end_ts_utc")?;
    let status: String = row.get("status")?;

    Ok(GrantRequest {
        request_id: RequestId::new(row.get("request_id")?),
        user_name: row.get("user_name")?,
        grant_statement: row.get("grant_statement")?,
        scheduled_end_ts_utc: from_unix_seconds(end_secs).map_err(|e| conversion_error(3, e))?,
        status: status
            .parse::<RequestStatus>()
            .map_err(|e| conversion_error(4, e))?,
    })
}

// Helper to convert a row to ExecutionLogEntry
fn row_to_log_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExecutionLogEntry> {
    let exe_secs: i64 = row.get("exe_ts_utc")?;
    let status: String = row.get("status")?;

    Ok(ExecutionLogEntry {
        log_id: LogId::new(row.get("log_id")?),
        user_name: row.get("user_name")?,
        executed_statement_or_action: row.get("statement")?,
        exe_ts_utc: from_unix_seconds(exe_secs).map_err(|e| conversion_error(3, e))?,
        external_reference: row.get("external_reference")?,
        status: status
            .parse::<ExecutionStatus>()
            .map_err(|e| conversion_error(5, e))?,
    })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_request(&self, request: &NewGrantRequest) -> Result<RequestId> {
        let request = request.clone();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO grant_requests (user_name, grant_statement, end_ts_utc, status)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    request.user_name,
                    request.grant_statement,
                    request.scheduled_end_ts_utc.timestamp(),
                    RequestStatus::Pending.as_str(),
                ],
            )?;
            Ok(RequestId::new(conn.last_insert_rowid()))
        })
        .await
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<GrantRequest>> {
        self.blocking(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM grant_requests WHERE request_id = ?1",
                    REQUEST_COLUMNS
                ),
                params![id.get()],
                row_to_request,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn update_end_time(
        &self,
        id: RequestId,
        end_ts_utc: DateTime<Utc>,
    ) -> Result<UpdateResult> {
        self.blocking(move |conn| {
            let changed = conn.execute(
                "UPDATE grant_requests SET end_ts_utc = ?1
                 WHERE request_id = ?2 AND status = 'PENDING'",
                params![end_ts_utc.timestamp(), id.get()],
            )?;

            if changed > 0 {
                return Ok(UpdateResult::Updated);
            }

            let exists: Option<i64> = conn
                .query_row(
                    "SELECT request_id FROM grant_requests WHERE request_id = ?1",
                    params![id.get()],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(match exists {
                Some(_) => UpdateResult::NotPending,
                None => UpdateResult::NotFound,
            })
        })
        .await
    }

    async fn mark_revoked(&self, id: RequestId) -> Result<bool> {
        self.blocking(move |conn| {
            let changed = conn.execute(
                "UPDATE grant_requests SET status = 'REVOKED'
                 WHERE request_id = ?1 AND status = 'PENDING'",
                params![id.get()],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<GrantRequest>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM grant_requests
                 ORDER BY end_ts_utc DESC, request_id DESC
                 LIMIT ?1",
                REQUEST_COLUMNS
            ))?;

            let requests = stmt
                .query_map(params![sql_limit(limit)], row_to_request)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(requests)
        })
        .await
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<GrantRequest>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM grant_requests
                 WHERE status = 'PENDING' AND end_ts_utc <= ?1
                 ORDER BY request_id",
                REQUEST_COLUMNS
            ))?;

            let requests = stmt
                .query_map(params![now.timestamp()], row_to_request)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(requests)
        })
        .await
    }

    async fn count_requests(&self) -> Result<usize> {
        self.blocking(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM grant_requests", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn append_log(&self, entry: &NewLogEntry) -> Result<LogId> {
        let entry = entry.clone();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO execution_log
                    (user_name, statement, exe_ts_utc, external_reference, status)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.user_name,
                    entry.executed_statement_or_action,
                    entry.exe_ts_utc.timestamp(),
                    entry.external_reference,
                    entry.status.as_str(),
                ],
            )?;
            Ok(LogId::new(conn.last_insert_rowid()))
        })
        .await
    }

    async fn recent_log(&self, limit: usize) -> Result<Vec<ExecutionLogEntry>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM execution_log
                 ORDER BY exe_ts_utc DESC, log_id DESC
                 LIMIT ?1",
                LOG_COLUMNS
            ))?;

            let entries = stmt
                .query_map(params![sql_limit(limit)], row_to_log_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(entries)
        })
        .await
    }

    async fn count_log(&self) -> Result<usize> {
        self.blocking(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM execution_log", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }
}
