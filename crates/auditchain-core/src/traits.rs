//! Core trait definitions for the auditchain ledger.
//!
//! These traits define the seams between the ledger's components:
//!
//! - `ChainStore`:       durable, per-tenant, append-only block log
//! - `PayloadValidator`: optional per-event-type payload checks at ingestion
//! - `Clock`:            source of ledger commit times
//!
//! The writer, verifier, exporter and query service all hold the store as
//! `Arc<dyn ChainStore>` and never share in-memory chain state with each other.

use chrono::{DateTime, Utc};

use auditchain_contracts::{
    block::Block,
    error::LedgerResult,
    event::{AuditEvent, TenantId},
};

/// A per-tenant, ordered, append-only sequence of blocks.
///
/// There is no update or delete operation. Implementations must make
/// `append` atomic: a block is either fully durable or not visible at all.
pub trait ChainStore: Send + Sync {
    /// Append `block` to its tenant's chain.
    ///
    /// Fails with `LedgerError::SequenceConflict` unless `block.sequence()` is
    /// exactly the current head's sequence + 1 (or 0 for an empty chain).
    /// Fails with `LedgerError::Storage` on durability failure and
    /// `LedgerError::Timeout` when the outcome is unknown.
    fn append(&self, block: &Block) -> LedgerResult<()>;

    /// The highest-sequence block of the tenant, or `None` for an empty chain.
    ///
    /// Fails with `LedgerError::Corrupt` if that block cannot be decoded.
    fn head(&self, tenant_id: &TenantId) -> LedgerResult<Option<Block>>;

    /// Blocks `start..=end` in ascending order.
    ///
    /// Fails with `LedgerError::Range` if any requested sequence does not
    /// exist. Gaps indicate store corruption, never a valid empty result.
    /// Fails with `LedgerError::Corrupt`, carrying the lowest such sequence,
    /// if a block in the range exists but cannot be decoded.
    fn range(&self, tenant_id: &TenantId, start: u64, end: u64) -> LedgerResult<Vec<Block>>;

    /// Every tenant that has at least one block.
    fn tenants(&self) -> LedgerResult<Vec<TenantId>>;
}

/// Payload checks applied by the writer before a block is built.
///
/// Implementations are trusted and must be deterministic. A rejection is
/// returned as `LedgerError::Validation` and no block is created.
pub trait PayloadValidator: Send + Sync {
    fn validate(&self, event: &AuditEvent) -> LedgerResult<()>;
}

/// Accepts every payload. Used when no schemas are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl PayloadValidator for AcceptAll {
    fn validate(&self, _event: &AuditEvent) -> LedgerResult<()> {
        Ok(())
    }
}

/// Source of commit timestamps. The writer clamps the value so commit times
/// never decrease within a tenant, whatever the clock does.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
