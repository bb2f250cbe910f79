//! Evidence export and offline bundle re-verification.
//!
//! `EvidenceExporter::export` packages a contiguous range of a chain with
//! the digest it hangs off and a live verification report. `verify_bundle`
//! re-runs the same walk over the bundle alone, so an auditor with no access
//! to the store reaches the same conclusion the exporter did. A bundle never
//! carries an undecodable block: it ends just before one, and the offline
//! walk reports that sequence as missing.

use std::sync::Arc;

use tracing::{info, warn};

use auditchain_contracts::{
    block::Block,
    bundle::{BundleVerification, EvidenceBundle, ExportOptions, BUNDLE_FORMAT, BUNDLE_VERSION},
    error::{LedgerError, LedgerResult},
    event::TenantId,
    report::{Anchor, Checkpoint, VerifyRange},
};
use auditchain_core::traits::{ChainStore, Clock, SystemClock};

use crate::verifier::{read_contiguous, ChainVerifier, VerifierSettings};
use crate::walk::ChainWalk;

/// Builds evidence bundles from a live store.
pub struct EvidenceExporter {
    store: Arc<dyn ChainStore>,
    verifier: ChainVerifier,
    chunk_size: u64,
    clock: Box<dyn Clock>,
}

impl EvidenceExporter {
    pub fn new(store: Arc<dyn ChainStore>, settings: VerifierSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size.max(1),
            verifier: ChainVerifier::new(Arc::clone(&store), settings),
            store,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Export `[start, end]` of `tenant_id`'s chain.
    ///
    /// A broken range still exports: the embedded report records the break
    /// and the bundle carries the blocks as stored, up to any gap.
    pub fn export(
        &self,
        tenant_id: &TenantId,
        start: u64,
        end: u64,
        options: ExportOptions,
    ) -> LedgerResult<EvidenceBundle> {
        if start > end {
            return Err(LedgerError::validation(format!(
                "export range [{start}, {end}] is inverted"
            )));
        }

        let range = VerifyRange {
            from: start,
            to: Some(end),
            checkpoint: options.checkpoint,
        };
        let report = self.verifier.verify(tenant_id, range)?;
        let blocks = self.read_blocks(tenant_id, start, end)?;

        let headers = blocks.iter().map(|b| b.header.clone()).collect();
        let events = if options.redact_payloads {
            None
        } else {
            Some(blocks.into_iter().map(|b| b.event).collect())
        };

        let bundle = EvidenceBundle {
            format: BUNDLE_FORMAT.to_string(),
            version: BUNDLE_VERSION,
            tenant_id: tenant_id.clone(),
            start_sequence: start,
            end_sequence: end,
            anchor_digest: report.anchor.digest(),
            headers,
            events,
            report,
            exported_at: self.clock.now(),
        };

        info!(
            tenant_id = %tenant_id,
            start,
            end,
            redacted = bundle.is_redacted(),
            valid = bundle.report.valid,
            "evidence bundle exported"
        );
        Ok(bundle)
    }

    /// Blocks `[start, end]` as stored, stopping at the first absent or
    /// undecodable block.
    fn read_blocks(&self, tenant_id: &TenantId, start: u64, end: u64) -> LedgerResult<Vec<Block>> {
        let mut blocks = Vec::new();
        let mut next = start;
        while next <= end {
            let last = end.min(next.saturating_add(self.chunk_size - 1));
            let (chunk, shortfall) = read_contiguous(self.store.as_ref(), tenant_id, next, last)?;
            blocks.extend(chunk);
            if shortfall.is_some() {
                break;
            }
            next = last + 1;
        }
        Ok(blocks)
    }
}

/// Re-verify a bundle from its own contents.
///
/// The walk starts from the bundle's `anchor_digest`. To tie the bundle to a
/// checkpoint published earlier, use [`verify_bundle_against`].
pub fn verify_bundle(bundle: &EvidenceBundle) -> LedgerResult<BundleVerification> {
    let anchor = if bundle.start_sequence == 0 {
        Anchor::Genesis
    } else {
        Anchor::Checkpoint {
            sequence: bundle.start_sequence - 1,
            digest: bundle.anchor_digest,
        }
    };
    walk_bundle(bundle, anchor)
}

/// Re-verify a bundle, anchoring it at an externally published checkpoint
/// instead of the digest the bundle itself claims.
///
/// The checkpoint must name the block right before `start_sequence`.
pub fn verify_bundle_against(
    bundle: &EvidenceBundle,
    checkpoint: &Checkpoint,
) -> LedgerResult<BundleVerification> {
    if checkpoint.tenant_id != bundle.tenant_id {
        return Err(LedgerError::Bundle {
            reason: format!(
                "checkpoint is for tenant '{}', bundle is for '{}'",
                checkpoint.tenant_id, bundle.tenant_id
            ),
        });
    }
    if checkpoint.sequence.checked_add(1) != Some(bundle.start_sequence) {
        return Err(LedgerError::Bundle {
            reason: format!(
                "checkpoint at sequence {} does not precede bundle start {}",
                checkpoint.sequence, bundle.start_sequence
            ),
        });
    }
    walk_bundle(
        bundle,
        Anchor::Checkpoint {
            sequence: checkpoint.sequence,
            digest: checkpoint.block_digest,
        },
    )
}

fn walk_bundle(bundle: &EvidenceBundle, anchor: Anchor) -> LedgerResult<BundleVerification> {
    if bundle.start_sequence > bundle.end_sequence {
        return Err(LedgerError::Bundle {
            reason: format!(
                "bundle range [{}, {}] is inverted",
                bundle.start_sequence, bundle.end_sequence
            ),
        });
    }
    let span = (bundle.end_sequence - bundle.start_sequence).saturating_add(1);
    if bundle.headers.len() as u64 > span {
        return Err(LedgerError::Bundle {
            reason: format!(
                "bundle range [{}, {}] cannot hold {} headers",
                bundle.start_sequence,
                bundle.end_sequence,
                bundle.headers.len()
            ),
        });
    }
    if let Some(events) = &bundle.events {
        if events.len() != bundle.headers.len() {
            return Err(LedgerError::Bundle {
                reason: format!(
                    "bundle carries {} headers but {} events",
                    bundle.headers.len(),
                    events.len()
                ),
            });
        }
    }

    let mut walk = ChainWalk::new(bundle.tenant_id.clone(), bundle.start_sequence, anchor);
    for (i, header) in bundle.headers.iter().enumerate() {
        let event = bundle.events.as_ref().map(|events| &events[i]);
        if !walk.feed(header, event) {
            break;
        }
    }
    if walk.next_sequence() <= bundle.end_sequence {
        walk.missing();
    }
    let report = walk.finish(Some(bundle.end_sequence));

    let matches_embedded = report.valid == bundle.report.valid
        && report.first_broken_sequence == bundle.report.first_broken_sequence;
    let verification = BundleVerification {
        header_only: bundle.is_redacted(),
        report,
        matches_embedded,
    };

    if verification.matches_embedded {
        info!(
            tenant_id = %bundle.tenant_id,
            valid = verification.report.valid,
            header_only = verification.header_only,
            "bundle re-verified"
        );
    } else {
        warn!(
            tenant_id = %bundle.tenant_id,
            recomputed_valid = verification.report.valid,
            embedded_valid = bundle.report.valid,
            first_broken_sequence = ?verification.report.first_broken_sequence,
            "bundle disagrees with its embedded report"
        );
    }
    Ok(verification)
}
