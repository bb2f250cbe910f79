//! The chain verifier.
//!
//! Walks a tenant's chain in bounded chunks, recomputing every digest and
//! confirming linkage back to a trusted anchor. The verifier only reads:
//! it takes a head snapshot when it starts and ignores anything appended
//! after that, so it can run alongside ongoing writes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use auditchain_contracts::{
    block::Block,
    error::{LedgerError, LedgerResult},
    event::TenantId,
    report::{Anchor, Checkpoint, VerificationReport, VerifyRange},
};
use auditchain_core::traits::ChainStore;

use crate::walk::ChainWalk;

/// Tunables for the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierSettings {
    /// Blocks read from the store per `range` call.
    pub chunk_size: u64,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self { chunk_size: 512 }
    }
}

/// Read-only integrity checker over a `ChainStore`.
pub struct ChainVerifier {
    store: Arc<dyn ChainStore>,
    settings: VerifierSettings,
}

impl ChainVerifier {
    pub fn new(store: Arc<dyn ChainStore>, settings: VerifierSettings) -> Self {
        Self { store, settings }
    }

    /// Verify `range` of `tenant_id`'s chain.
    ///
    /// A broken chain is returned as a report with `valid == false`, and so
    /// is a block the store holds but cannot decode. Errors are reserved for
    /// ranges beyond the head observed at start and for store failures.
    pub fn verify(
        &self,
        tenant_id: &TenantId,
        range: VerifyRange,
    ) -> LedgerResult<VerificationReport> {
        let (head, head_header) = match self.store.head(tenant_id) {
            Ok(Some(block)) => (Some(block.sequence()), Some(block.header)),
            Ok(None) => (None, None),
            // An unreadable head still bounds the walk, which reports it.
            Err(LedgerError::Corrupt { sequence, .. }) => (Some(sequence), None),
            Err(e) => return Err(e),
        };
        let from = range.from;
        let range_err = |end: u64, first_missing: u64| LedgerError::Range {
            tenant_id: tenant_id.to_string(),
            start: from,
            end,
            first_missing,
        };

        let Some(head) = head else {
            if from == 0 && range.to.is_none() {
                let report = ChainWalk::new(tenant_id.clone(), 0, Anchor::Genesis).finish(None);
                info!(tenant_id = %tenant_id, "verification of empty chain");
                return Ok(report);
            }
            return Err(range_err(range.to.unwrap_or(from), 0));
        };

        let to = range.to.unwrap_or(head);
        if to > head {
            return Err(range_err(to, head + 1));
        }
        if from > to {
            // Resuming from a checkpoint at the head: nothing new to check.
            if range.to.is_none() && from == head + 1 {
                let anchor = self.anchor(tenant_id, &range)?;
                return Ok(ChainWalk::new(tenant_id.clone(), from, anchor).finish(None));
            }
            if from > head {
                return Err(range_err(to, head + 1));
            }
            return Err(LedgerError::validation(format!(
                "verification range [{from}, {to}] is inverted"
            )));
        }

        let anchor = self.anchor(tenant_id, &range)?;
        let mut walk = ChainWalk::new(tenant_id.clone(), from, anchor);
        self.walk_store(tenant_id, &mut walk, to)?;
        if let Some(header) = head_header.as_ref().filter(|h| h.sequence == to) {
            walk.confirm_head(header);
        }
        let report = walk.finish(Some(to));

        log_outcome(&report);
        Ok(report)
    }

    /// Verify the whole chain and return a checkpoint at its head, if the
    /// chain is intact and non-empty.
    pub fn checkpoint(&self, tenant_id: &TenantId) -> LedgerResult<Option<Checkpoint>> {
        let report = self.verify(tenant_id, VerifyRange::full())?;
        Ok(if report.valid { report.checkpoint() } else { None })
    }

    /// Verify every tenant's full chain. One report per tenant, sorted by tenant.
    pub fn verify_all(&self) -> LedgerResult<Vec<VerificationReport>> {
        let tenants = self.store.tenants()?;
        let reports = tenants
            .iter()
            .map(|tenant| self.verify(tenant, VerifyRange::full()))
            .collect::<LedgerResult<Vec<_>>>()?;
        let broken = reports.iter().filter(|r| !r.valid).count();
        info!(tenants = reports.len(), broken, "verification sweep finished");
        Ok(reports)
    }

    /// The digest block `range.from` must link to.
    fn anchor(&self, tenant_id: &TenantId, range: &VerifyRange) -> LedgerResult<Anchor> {
        if range.from == 0 {
            return Ok(Anchor::Genesis);
        }
        let sequence = range.from - 1;
        if let Some(digest) = range.checkpoint {
            return Ok(Anchor::Checkpoint { sequence, digest });
        }
        let mut blocks = self.store.range(tenant_id, sequence, sequence)?;
        let block = blocks.pop().ok_or_else(|| LedgerError::Range {
            tenant_id: tenant_id.to_string(),
            start: sequence,
            end: sequence,
            first_missing: sequence,
        })?;
        Ok(Anchor::Stored {
            sequence,
            digest: block.header.block_digest,
        })
    }

    /// Feed `walk` from the store in chunks up to and including `to`.
    fn walk_store(&self, tenant_id: &TenantId, walk: &mut ChainWalk, to: u64) -> LedgerResult<()> {
        let chunk = self.settings.chunk_size.max(1);
        while !walk.is_broken() && walk.next_sequence() <= to {
            let start = walk.next_sequence();
            let end = to.min(start.saturating_add(chunk - 1));

            let (blocks, shortfall) = read_contiguous(self.store.as_ref(), tenant_id, start, end)?;
            for block in &blocks {
                if !walk.feed(&block.header, Some(&block.event)) {
                    break;
                }
            }
            match shortfall {
                Some(Shortfall::Missing) => walk.missing(),
                Some(Shortfall::Undecodable(detail)) => walk.undecodable(detail),
                None => {}
            }
        }
        Ok(())
    }
}

/// Why a read returned fewer blocks than requested.
pub(crate) enum Shortfall {
    Missing,
    Undecodable(String),
}

/// Blocks `[start, end]` as stored, cut short at the first absent or
/// undecodable sequence. Everything before that point is returned.
pub(crate) fn read_contiguous(
    store: &dyn ChainStore,
    tenant_id: &TenantId,
    start: u64,
    end: u64,
) -> LedgerResult<(Vec<Block>, Option<Shortfall>)> {
    let (stop, shortfall) = match store.range(tenant_id, start, end) {
        Ok(blocks) => {
            let complete = blocks.len() as u64 == end - start + 1;
            return Ok((blocks, (!complete).then_some(Shortfall::Missing)));
        }
        Err(LedgerError::Range { first_missing, .. }) => (first_missing, Shortfall::Missing),
        Err(LedgerError::Corrupt { sequence, reason, .. }) => {
            (sequence, Shortfall::Undecodable(reason))
        }
        Err(e) => return Err(e),
    };
    let before = if stop > start {
        store.range(tenant_id, start, stop - 1)?
    } else {
        Vec::new()
    };
    Ok((before, Some(shortfall)))
}

fn log_outcome(report: &VerificationReport) {
    if report.valid {
        info!(
            tenant_id = %report.tenant_id,
            from = report.from_sequence,
            verified_through = ?report.verified_through_sequence,
            blocks = report.blocks_checked,
            "chain verified"
        );
    } else {
        warn!(
            tenant_id = %report.tenant_id,
            first_broken_sequence = ?report.first_broken_sequence,
            failure = ?report.failure_description(),
            "tampering detected"
        );
    }
}
