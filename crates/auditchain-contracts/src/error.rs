//! Error taxonomy for the auditchain ledger.
//!
//! All fallible ledger operations return `LedgerResult<T>`. A broken chain is
//! deliberately absent from this enum: tampering is reported as data inside a
//! `VerificationReport`, never raised as an error.

use thiserror::Error;

/// The unified error type for the auditchain ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The submitted event is malformed or cannot be canonicalized.
    ///
    /// Rejected before any block is created; the caller can correct and resubmit.
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// The block's sequence is not exactly one past the tenant's current head.
    ///
    /// Transient: the writer retries internally and only escalates to
    /// `Contention` once its retry budget is spent.
    #[error("sequence conflict for tenant '{tenant_id}': expected sequence {expected}, got {found}")]
    SequenceConflict {
        tenant_id: String,
        expected: u64,
        found: u64,
    },

    /// Every append attempt for the tenant lost a sequence race.
    #[error("write contention for tenant '{tenant_id}': gave up after {attempts} attempts")]
    Contention { tenant_id: String, attempts: u32 },

    /// The durability layer failed. Never retried past the storage boundary.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// The storage I/O boundary timed out.
    ///
    /// The outcome of the operation is unknown: the caller must retry the
    /// whole `record` call, which re-reads the head before appending again.
    #[error("storage timeout during {operation}: outcome unknown")]
    Timeout { operation: String },

    /// A requested range references sequences that do not exist.
    #[error("range error for tenant '{tenant_id}': [{start}, {end}] missing sequence {first_missing}")]
    Range {
        tenant_id: String,
        start: u64,
        end: u64,
        first_missing: u64,
    },

    /// A stored block exists but can no longer be decoded.
    ///
    /// The verifier and exporter turn this into a `ChainBreak` at `sequence`;
    /// every other caller sees it as an error.
    #[error("corrupt block for tenant '{tenant_id}' at sequence {sequence}: {reason}")]
    Corrupt {
        tenant_id: String,
        sequence: u64,
        reason: String,
    },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// An evidence bundle could not be parsed or has an unsupported format.
    #[error("evidence bundle error: {reason}")]
    Bundle { reason: String },
}

impl LedgerError {
    /// Shorthand for a `Validation` error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for a `Storage` error.
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    /// True for errors the writer may resolve by re-reading the head and retrying.
    pub fn is_sequence_conflict(&self) -> bool {
        matches!(self, Self::SequenceConflict { .. })
    }
}

/// Convenience alias used throughout the auditchain crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
