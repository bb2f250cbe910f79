//! In-memory implementation of `ChainStore`.
//!
//! `InMemoryChainStore` keeps one `Vec<Block>` per tenant, each behind its
//! own `RwLock`, so appends for different tenants never contend on the same
//! lock. The tenant table itself is only locked long enough to find or
//! create a tenant's log.
//!
//! Nothing here survives a restart; use `SqliteChainStore` for durability.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use auditchain_contracts::{
    block::Block,
    error::{LedgerError, LedgerResult},
    event::TenantId,
};
use auditchain_core::traits::ChainStore;

// ── Internal state ────────────────────────────────────────────────────────────

/// One tenant's log, in append order.
type TenantLog = Arc<RwLock<Vec<Block>>>;

// ── Public store ──────────────────────────────────────────────────────────────

/// An in-memory, append-only chain store.
///
/// # Thread safety
///
/// Reads take a shared lock on one tenant's log and clone the requested
/// blocks out, so a reader holds the lock only for the copy.
#[derive(Default)]
pub struct InMemoryChainStore {
    pub(crate) logs: RwLock<HashMap<TenantId, TenantLog>>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load blocks exactly as given, without checking sequence or linkage.
    ///
    /// Meant for forensic work on a copy of a chain (for example one
    /// restored from an archive): the verifier, not this constructor, decides
    /// whether the copy is intact. Blocks keep their relative order per tenant.
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        let mut logs: HashMap<TenantId, Vec<Block>> = HashMap::new();
        for block in blocks {
            logs.entry(block.tenant_id().clone()).or_default().push(block);
        }
        let logs = logs
            .into_iter()
            .map(|(tenant, blocks)| (tenant, Arc::new(RwLock::new(blocks))))
            .collect();
        Self {
            logs: RwLock::new(logs),
        }
    }

    /// Number of blocks held for `tenant_id`.
    pub fn len(&self, tenant_id: &TenantId) -> usize {
        self.log(tenant_id)
            .map(|log| log.read().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or(0)
    }

    fn log(&self, tenant_id: &TenantId) -> Option<TenantLog> {
        let logs = self.logs.read().unwrap_or_else(PoisonError::into_inner);
        logs.get(tenant_id).cloned()
    }

    fn log_or_create(&self, tenant_id: &TenantId) -> TenantLog {
        if let Some(log) = self.log(tenant_id) {
            return log;
        }
        let mut logs = self.logs.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(logs.entry(tenant_id.clone()).or_default())
    }
}

// ── ChainStore impl ───────────────────────────────────────────────────────────

impl ChainStore for InMemoryChainStore {
    /// Append one block after checking it extends the current head.
    ///
    /// The check and the push happen under the tenant's write lock, so the
    /// append is atomic with respect to every other append for that tenant.
    fn append(&self, block: &Block) -> LedgerResult<()> {
        let log = self.log_or_create(block.tenant_id());
        let mut blocks = log.write().unwrap_or_else(PoisonError::into_inner);

        let expected = blocks.last().map_or(0, |b| b.sequence() + 1);
        if block.sequence() != expected {
            return Err(LedgerError::SequenceConflict {
                tenant_id: block.tenant_id().to_string(),
                expected,
                found: block.sequence(),
            });
        }

        blocks.push(block.clone());
        debug!(
            tenant_id = %block.tenant_id(),
            sequence = block.sequence(),
            "block appended to memory store"
        );
        Ok(())
    }

    fn head(&self, tenant_id: &TenantId) -> LedgerResult<Option<Block>> {
        Ok(self.log(tenant_id).and_then(|log| {
            log.read()
                .unwrap_or_else(PoisonError::into_inner)
                .last()
                .cloned()
        }))
    }

    /// Blocks at log positions `start..=end`.
    ///
    /// Positions are the physical append order; the sequence numbers stored
    /// inside the blocks are returned as-is for the verifier to judge.
    fn range(&self, tenant_id: &TenantId, start: u64, end: u64) -> LedgerResult<Vec<Block>> {
        let len = self
            .log(tenant_id)
            .map(|log| log.read().unwrap_or_else(PoisonError::into_inner).len() as u64)
            .unwrap_or(0);

        if start > end || end >= len {
            return Err(LedgerError::Range {
                tenant_id: tenant_id.to_string(),
                start,
                end,
                first_missing: len.max(start),
            });
        }

        // Re-read under one lock: the length check above may be stale, but
        // the log only ever grows, so `end < len` still holds.
        let log = self.log(tenant_id).ok_or_else(|| LedgerError::Range {
            tenant_id: tenant_id.to_string(),
            start,
            end,
            first_missing: start,
        })?;
        let blocks = log.read().unwrap_or_else(PoisonError::into_inner);
        Ok(blocks[start as usize..=end as usize].to_vec())
    }

    fn tenants(&self) -> LedgerResult<Vec<TenantId>> {
        let logs = self.logs.read().unwrap_or_else(PoisonError::into_inner);
        let mut tenants: Vec<TenantId> = logs
            .iter()
            .filter(|(_, log)| !log.read().unwrap_or_else(PoisonError::into_inner).is_empty())
            .map(|(tenant, _)| tenant.clone())
            .collect();
        tenants.sort();
        Ok(tenants)
    }
}
