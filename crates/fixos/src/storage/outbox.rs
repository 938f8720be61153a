//! Queue of remote mutations that failed and wait for replay.
//!
//! There is one row per (table, record): a newer failure for the same
//! record replaces the older one, so replay always pushes the current
//! local state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::debug;

use super::Storage;
use crate::error::{Error, Result};

/// Table name used in the outbox for setting keys.
pub const SETTINGS_TABLE: &str = "settings";

/// What has to be replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxOp {
    /// Push the current local document.
    Upsert,
    /// Remove the record remotely.
    Delete,
}

impl fmt::Display for OutboxOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upsert => "upsert",
            Self::Delete => "delete",
        })
    }
}

impl FromStr for OutboxOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upsert" => Ok(Self::Upsert),
            "delete" => Ok(Self::Delete),
            other => Err(Error::internal(format!("unknown outbox operation: {other}"))),
        }
    }
}

/// A pending remote mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    /// Collection table name, or [`SETTINGS_TABLE`].
    pub table: String,
    /// Record id, or setting key.
    pub record_id: String,
    /// Upsert or delete.
    pub operation: OutboxOp,
    /// Last failure message.
    pub error: Option<String>,
    /// When the mutation was first queued.
    pub queued_at: DateTime<Utc>,
}

impl OutboxEntry {
    /// A new entry stamped now.
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        record_id: impl Into<String>,
        operation: OutboxOp,
        error: Option<String>,
    ) -> Self {
        Self {
            table: table.into(),
            record_id: record_id.into(),
            operation,
            error,
            queued_at: Utc::now(),
        }
    }
}

impl Storage {
    /// Queue a mutation, replacing any pending one for the same record.
    ///
    /// A record already queued keeps its original `queued_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn enqueue_outbox(&self, entry: &OutboxEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_outbox (collection, record_id, operation, error, queued_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (collection, record_id)
             DO UPDATE SET operation = excluded.operation, error = excluded.error",
            params![
                entry.table,
                entry.record_id,
                entry.operation.to_string(),
                entry.error,
                entry.queued_at.to_rfc3339(),
            ],
        )?;
        debug!(
            table = %entry.table,
            id = %entry.record_id,
            operation = %entry.operation,
            "queued remote mutation"
        );
        Ok(())
    }

    /// Pending entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub fn pending_outbox(&self) -> Result<Vec<OutboxEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT collection, record_id, operation, error, queued_at
             FROM sync_outbox ORDER BY queued_at, collection, record_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(table, record_id, operation, error, queued_at)| {
                Ok(OutboxEntry {
                    table,
                    record_id,
                    operation: operation.parse()?,
                    error,
                    queued_at: DateTime::parse_from_rfc3339(&queued_at)
                        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc)),
                })
            })
            .collect()
    }

    /// Drop an entry once it has been replayed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove_outbox(&self, table: &str, record_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM sync_outbox WHERE collection = ?1 AND record_id = ?2",
            [table, record_id],
        )?;
        Ok(affected > 0)
    }

    /// The pending operation for one record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is malformed.
    pub fn pending_op(&self, table: &str, record_id: &str) -> Result<Option<OutboxOp>> {
        let result: std::result::Result<String, rusqlite::Error> = self.conn.query_row(
            "SELECT operation FROM sync_outbox WHERE collection = ?1 AND record_id = ?2",
            [table, record_id],
            |row| row.get(0),
        );
        match result {
            Ok(op) => Ok(Some(op.parse()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Pending operations for every queued record of a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub fn pending_ops(&self, table: &str) -> Result<Vec<(String, OutboxOp)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT record_id, operation FROM sync_outbox WHERE collection = ?1")?;
        let rows = stmt
            .query_map([table], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, op)| -> Result<(String, OutboxOp)> { Ok((id, op.parse()?)) })
            .collect()
    }

    /// Number of pending entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn outbox_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sync_outbox", [], |row| row.get(0))?;
        Ok(count)
    }
}
