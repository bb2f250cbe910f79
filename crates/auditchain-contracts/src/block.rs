//! Blocks: the ledger's atomic, persisted unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    digest::Digest,
    event::{AuditEvent, TenantId},
};

/// The hashed header of a block.
///
/// Headers alone are enough to re-check chain linkage, which is why evidence
/// bundles carry headers and only optionally the events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub tenant_id: TenantId,
    /// 0-based position in the tenant's chain. No gaps, no repeats.
    pub sequence: u64,
    pub event_digest: Digest,
    /// `block_digest` of block `sequence - 1`, or `Digest::SENTINEL` at genesis.
    pub prev_block_digest: Digest,
    /// Digest over every other header field; the value the next block links to.
    pub block_digest: Digest,
    pub occurred_at: DateTime<Utc>,
    /// Ledger-assigned; non-decreasing within a tenant.
    pub commit_time: DateTime<Utc>,
}

impl BlockHeader {
    pub fn is_genesis(&self) -> bool {
        self.sequence == 0
    }
}

/// A persisted block: the header plus the event it commits to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub event: AuditEvent,
}

impl Block {
    pub fn sequence(&self) -> u64 {
        self.header.sequence
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.header.tenant_id
    }

    /// What the ingestion boundary hands back to the submitting collaborator.
    pub fn receipt(&self) -> Receipt {
        Receipt {
            sequence: self.header.sequence,
            block_digest: self.header.block_digest,
        }
    }
}

/// Acknowledgement of a committed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub sequence: u64,
    pub block_digest: Digest,
}
