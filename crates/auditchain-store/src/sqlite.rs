//! SQLite implementation of `ChainStore`.
//!
//! One table, `blocks`, keyed by `(tenant_id, sequence)`. Appends run inside
//! an `IMMEDIATE` transaction that re-reads the tenant's head, so two
//! processes sharing a database file still cannot both commit the same
//! sequence: the loser sees `SequenceConflict` and the writer retries.
//!
//! Digests are stored as lowercase hex, timestamps as RFC 3339 with
//! nanosecond precision, and the event as its JSON document. A row that no
//! longer parses is reported as `LedgerError::Corrupt` with its sequence;
//! a row whose sequence is not an integer cannot be placed and reads as a gap.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use auditchain_contracts::{
    block::{Block, BlockHeader},
    digest::Digest,
    error::{LedgerError, LedgerResult},
    event::{AuditEvent, TenantId},
};
use auditchain_core::traits::ChainStore;

const SCHEMA: &str = include_str!("schema.sql");

const SELECT_COLUMNS: &str = "tenant_id, sequence, event_digest, prev_block_digest, \
     block_digest, occurred_at, commit_time, event_json";

/// A durable chain store backed by a single SQLite database.
///
/// File-backed stores keep separate write and read connections so readers
/// are not queued behind an append (the database runs in WAL mode). An
/// in-memory store shares one connection for both.
pub struct SqliteChainStore {
    write: Arc<Mutex<Connection>>,
    read: Arc<Mutex<Connection>>,
}

impl SqliteChainStore {
    /// Open (or create) the database at `path`.
    ///
    /// `busy_timeout` bounds how long a statement waits on another
    /// connection's lock before the operation fails with `Timeout`.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> LedgerResult<Self> {
        let path = path.as_ref();
        let write = Connection::open(path).map_err(|e| map_err("open", e))?;
        write
            .busy_timeout(busy_timeout)
            .map_err(|e| map_err("open", e))?;
        write
            .execute_batch(SCHEMA)
            .map_err(|e| map_err("schema", e))?;

        let read = Connection::open(path).map_err(|e| map_err("open", e))?;
        read.busy_timeout(busy_timeout)
            .map_err(|e| map_err("open", e))?;
        read.execute_batch("PRAGMA query_only = ON;")
            .map_err(|e| map_err("open", e))?;

        info!(path = %path.display(), "sqlite chain store opened");
        Ok(Self {
            write: Arc::new(Mutex::new(write)),
            read: Arc::new(Mutex::new(read)),
        })
    }

    /// A private, non-durable database. Useful for tests and demos.
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| map_err("open", e))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| map_err("schema", e))?;
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            write: Arc::clone(&conn),
            read: conn,
        })
    }

    fn writer(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        self.write
            .lock()
            .map_err(|_| LedgerError::storage("sqlite write connection lock poisoned"))
    }

    fn reader(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        self.read
            .lock()
            .map_err(|_| LedgerError::storage("sqlite read connection lock poisoned"))
    }
}

impl ChainStore for SqliteChainStore {
    fn append(&self, block: &Block) -> LedgerResult<()> {
        let header = &block.header;
        let event_json = serde_json::to_string(&block.event)
            .map_err(|e| LedgerError::storage(format!("event serialization failed: {e}")))?;
        let sequence = to_sql_sequence(header.sequence)?;

        let mut conn = self.writer()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| map_err("append", e))?;

        let head: Option<i64> = tx
            .query_row(
                "SELECT MAX(sequence) FROM blocks WHERE tenant_id = ?1",
                [header.tenant_id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| map_err("append", e))?;
        let expected = head.map_or(0, |h| h as u64 + 1);
        if header.sequence != expected {
            return Err(LedgerError::SequenceConflict {
                tenant_id: header.tenant_id.to_string(),
                expected,
                found: header.sequence,
            });
        }

        tx.execute(
            "INSERT INTO blocks (tenant_id, sequence, event_digest, prev_block_digest, \
             block_digest, occurred_at, commit_time, event_json) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                header.tenant_id.as_str(),
                sequence,
                header.event_digest.to_hex(),
                header.prev_block_digest.to_hex(),
                header.block_digest.to_hex(),
                to_sql_time(&header.occurred_at),
                to_sql_time(&header.commit_time),
                event_json,
            ],
        )
        .map_err(|e| conflict_or(e, header, expected))?;

        tx.commit().map_err(|e| map_err("append", e))?;

        debug!(
            tenant_id = %header.tenant_id,
            sequence = header.sequence,
            "block appended to sqlite store"
        );
        Ok(())
    }

    fn head(&self, tenant_id: &TenantId) -> LedgerResult<Option<Block>> {
        let conn = self.reader()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM blocks WHERE tenant_id = ?1 \
             AND typeof(sequence) = 'integer' ORDER BY sequence DESC LIMIT 1"
        );
        let raw = conn
            .query_row(&sql, [tenant_id.as_str()], RawRow::from_row)
            .optional()
            .map_err(|e| map_err("head", e))?;
        raw.map(RawRow::into_block).transpose()
    }

    fn range(&self, tenant_id: &TenantId, start: u64, end: u64) -> LedgerResult<Vec<Block>> {
        let range_err = |first_missing: u64| LedgerError::Range {
            tenant_id: tenant_id.to_string(),
            start,
            end,
            first_missing,
        };
        if start > end {
            return Err(range_err(start));
        }

        let conn = self.reader()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM blocks WHERE tenant_id = ?1 \
             AND typeof(sequence) = 'integer' AND sequence BETWEEN ?2 AND ?3 \
             ORDER BY sequence ASC"
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| map_err("range", e))?;
        let rows = stmt
            .query_map(
                params![
                    tenant_id.as_str(),
                    to_sql_sequence(start)?,
                    to_sql_sequence(end)?
                ],
                RawRow::from_row,
            )
            .map_err(|e| map_err("range", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_err("range", e))?;

        let mut blocks = Vec::with_capacity(rows.len());
        let mut want = start;
        for raw in rows {
            if raw.sequence as u64 != want {
                return Err(range_err(want));
            }
            blocks.push(raw.into_block()?);
            want += 1;
        }
        if want <= end {
            return Err(range_err(want));
        }
        Ok(blocks)
    }

    fn tenants(&self) -> LedgerResult<Vec<TenantId>> {
        let conn = self.reader()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT tenant_id FROM blocks ORDER BY tenant_id")
            .map_err(|e| map_err("tenants", e))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| map_err("tenants", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_err("tenants", e))?;
        names
            .into_iter()
            .map(|name| {
                TenantId::new(name)
                    .map_err(|e| LedgerError::storage(format!("stored tenant id invalid: {e}")))
            })
            .collect()
    }
}

// ── Row decoding ──────────────────────────────────────────────────────────────

/// A `blocks` row as stored, before any parsing.
///
/// Columns other than the key are read as untyped values so that a damaged
/// row still loads and can be reported by sequence.
struct RawRow {
    tenant_id: String,
    sequence: i64,
    event_digest: Value,
    prev_block_digest: Value,
    block_digest: Value,
    occurred_at: Value,
    commit_time: Value,
    event_json: Value,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            tenant_id: row.get(0)?,
            sequence: row.get(1)?,
            event_digest: row.get(2)?,
            prev_block_digest: row.get(3)?,
            block_digest: row.get(4)?,
            occurred_at: row.get(5)?,
            commit_time: row.get(6)?,
            event_json: row.get(7)?,
        })
    }

    fn sequence(&self) -> LedgerResult<u64> {
        u64::try_from(self.sequence).map_err(|_| {
            LedgerError::storage(format!(
                "negative sequence {} stored for tenant '{}'",
                self.sequence, self.tenant_id
            ))
        })
    }

    /// Parse the row. Values are taken as stored; whether they still hash
    /// correctly is for the verifier to decide. A row that does not parse
    /// at all is `Corrupt`.
    fn into_block(self) -> LedgerResult<Block> {
        let sequence = self.sequence()?;
        self.decode(sequence).map_err(|reason| LedgerError::Corrupt {
            tenant_id: self.tenant_id.clone(),
            sequence,
            reason,
        })
    }

    fn decode(&self, sequence: u64) -> Result<Block, String> {
        let tenant_id =
            TenantId::new(self.tenant_id.clone()).map_err(|e| format!("tenant_id: {e}"))?;
        let digest = |field: &str, value: &Value| {
            text(field, value)
                .and_then(|hex| Digest::from_hex(hex).map_err(|e| format!("{field}: {e}")))
        };
        let time = |field: &str, value: &Value| {
            text(field, value).and_then(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| format!("{field}: {e}"))
            })
        };
        let event: AuditEvent = text("event_json", &self.event_json).and_then(|json| {
            serde_json::from_str(json).map_err(|e| format!("event_json: {e}"))
        })?;

        Ok(Block {
            header: BlockHeader {
                tenant_id,
                sequence,
                event_digest: digest("event_digest", &self.event_digest)?,
                prev_block_digest: digest("prev_block_digest", &self.prev_block_digest)?,
                block_digest: digest("block_digest", &self.block_digest)?,
                occurred_at: time("occurred_at", &self.occurred_at)?,
                commit_time: time("commit_time", &self.commit_time)?,
            },
            event,
        })
    }
}

fn text<'a>(field: &str, value: &'a Value) -> Result<&'a str, String> {
    match value {
        Value::Text(s) => Ok(s.as_str()),
        other => Err(format!("{field}: expected text, found {}", other.data_type())),
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

fn to_sql_sequence(sequence: u64) -> LedgerResult<i64> {
    i64::try_from(sequence)
        .map_err(|_| LedgerError::storage(format!("sequence {sequence} exceeds sqlite INTEGER")))
}

fn to_sql_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Lock waits become `Timeout` (outcome unknown); everything else is `Storage`.
fn map_err(operation: &str, err: rusqlite::Error) -> LedgerError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => LedgerError::Timeout {
            operation: format!("sqlite {operation}"),
        },
        _ => LedgerError::storage(format!("sqlite {operation} failed: {err}")),
    }
}

/// A primary-key violation on insert means another connection committed
/// this sequence between our head read and the insert.
fn conflict_or(err: rusqlite::Error, header: &BlockHeader, expected: u64) -> LedgerError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => LedgerError::SequenceConflict {
            tenant_id: header.tenant_id.to_string(),
            expected: expected + 1,
            found: header.sequence,
        },
        _ => map_err("append", err),
    }
}
