//! The verification walk shared by the live verifier and bundle re-verification.
//!
//! A `ChainWalk` is fed headers (and, when available, events) in the order
//! they were read. It holds only the previous block's digest and commit
//! time, so memory stays constant however long the chain is. The first
//! failed check freezes the walk; later blocks are never confirmed.

use chrono::{DateTime, Utc};
use tracing::debug;

use auditchain_contracts::{
    block::BlockHeader,
    digest::Digest,
    event::{AuditEvent, TenantId},
    report::{Anchor, BreakKind, ChainBreak, VerificationReport},
};
use auditchain_core::hash;

pub(crate) struct ChainWalk {
    tenant_id: TenantId,
    from: u64,
    anchor: Anchor,
    next_sequence: u64,
    expected_prev: Digest,
    last_commit: Option<DateTime<Utc>>,
    checked: u64,
    verified: Option<(u64, Digest)>,
    failure: Option<ChainBreak>,
}

impl ChainWalk {
    pub(crate) fn new(tenant_id: TenantId, from: u64, anchor: Anchor) -> Self {
        Self {
            tenant_id,
            from,
            expected_prev: anchor.digest(),
            anchor,
            next_sequence: from,
            last_commit: None,
            checked: 0,
            verified: None,
            failure: None,
        }
    }

    pub(crate) fn is_broken(&self) -> bool {
        self.failure.is_some()
    }

    /// The sequence the next fed block must carry.
    pub(crate) fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Check one block. Returns `false` once the walk is broken.
    ///
    /// `event` is `None` for redacted input; the event digest is then taken
    /// on trust and only the header checks run.
    pub(crate) fn feed(&mut self, header: &BlockHeader, event: Option<&AuditEvent>) -> bool {
        if self.is_broken() {
            return false;
        }
        self.checked += 1;

        if let Some(found) = self.first_mismatch(header, event) {
            debug!(
                tenant_id = %self.tenant_id,
                sequence = self.next_sequence,
                kind = %found.kind,
                "verification walk stopped"
            );
            self.failure = Some(found);
            return false;
        }

        self.expected_prev = header.block_digest;
        self.last_commit = Some(header.commit_time);
        self.verified = Some((header.sequence, header.block_digest));
        self.next_sequence += 1;
        true
    }

    /// Record that the next expected sequence is absent.
    pub(crate) fn missing(&mut self) {
        if self.is_broken() {
            return;
        }
        self.failure = Some(ChainBreak::new(
            self.next_sequence,
            BreakKind::MissingBlock,
            self.next_sequence.to_string(),
            "absent",
        ));
    }

    /// Record that the next expected block is present but unreadable.
    pub(crate) fn undecodable(&mut self, detail: impl Into<String>) {
        if self.is_broken() {
            return;
        }
        self.failure = Some(ChainBreak::new(
            self.next_sequence,
            BreakKind::UndecodableBlock,
            "a decodable block",
            detail,
        ));
    }

    /// Check that the last block fed is the head the store reported.
    ///
    /// Stores read by position, so a tail block whose sequence was lowered
    /// is the head but is never fed. The break lands right after the last
    /// confirmed block.
    pub(crate) fn confirm_head(&mut self, head: &BlockHeader) {
        if self.is_broken() {
            return;
        }
        let confirmed = self.next_sequence.checked_sub(1);
        if confirmed == Some(head.sequence) && self.expected_prev == head.block_digest {
            return;
        }
        self.checked += 1;
        self.failure = Some(ChainBreak::new(
            self.next_sequence,
            BreakKind::SequenceMismatch,
            self.next_sequence.to_string(),
            head.sequence.to_string(),
        ));
    }

    pub(crate) fn finish(self, to_sequence: Option<u64>) -> VerificationReport {
        let first_broken_sequence = self.failure.as_ref().map(|f| f.sequence);
        VerificationReport {
            tenant_id: self.tenant_id,
            from_sequence: self.from,
            to_sequence,
            anchor: self.anchor,
            blocks_checked: self.checked,
            verified_through_sequence: self.verified.map(|(seq, _)| seq),
            verified_through_digest: self.verified.map(|(_, digest)| digest),
            valid: self.failure.is_none(),
            first_broken_sequence,
            failure: self.failure,
        }
    }

    fn first_mismatch(&self, header: &BlockHeader, event: Option<&AuditEvent>) -> Option<ChainBreak> {
        let at = self.next_sequence;
        let mismatch = |kind, expected: String, found: String| Some(ChainBreak::new(at, kind, expected, found));

        if header.tenant_id != self.tenant_id {
            return mismatch(
                BreakKind::TenantMismatch,
                self.tenant_id.to_string(),
                header.tenant_id.to_string(),
            );
        }
        if header.sequence != at {
            return mismatch(
                BreakKind::SequenceMismatch,
                at.to_string(),
                header.sequence.to_string(),
            );
        }
        if header.prev_block_digest != self.expected_prev {
            return mismatch(
                BreakKind::PrevDigestMismatch,
                self.expected_prev.to_hex(),
                header.prev_block_digest.to_hex(),
            );
        }
        if let Some(event) = event {
            let recomputed = if event.tenant_id != header.tenant_id {
                Err(format!("event of tenant '{}'", event.tenant_id))
            } else {
                hash::event_digest(event).map_err(|e| format!("unhashable event ({e})"))
            };
            match recomputed {
                Ok(digest) if digest == header.event_digest => {}
                Ok(digest) => {
                    return mismatch(
                        BreakKind::EventDigestMismatch,
                        header.event_digest.to_hex(),
                        digest.to_hex(),
                    )
                }
                Err(found) => {
                    return mismatch(
                        BreakKind::EventDigestMismatch,
                        header.event_digest.to_hex(),
                        found,
                    )
                }
            }
        }
        let recomputed = hash::recompute_block_digest(header);
        if recomputed != header.block_digest {
            return mismatch(
                BreakKind::BlockDigestMismatch,
                recomputed.to_hex(),
                header.block_digest.to_hex(),
            );
        }
        if let Some(last) = self.last_commit {
            if header.commit_time < last {
                return mismatch(
                    BreakKind::CommitTimeRegression,
                    format!("at or after {}", last.to_rfc3339()),
                    header.commit_time.to_rfc3339(),
                );
            }
        }
        None
    }
}
