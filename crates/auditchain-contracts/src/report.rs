//! Verification requests, reports, and checkpoints.
//!
//! A broken chain is an expected, correctly-handled outcome of a
//! security-relevant check. It is carried here as data (`ChainBreak`) and
//! never raised as an error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{digest::Digest, event::TenantId};

/// Which range of a chain to verify, and what to trust at its start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRange {
    /// First sequence to check. Defaults to genesis.
    #[serde(default)]
    pub from: u64,
    /// Last sequence to check. `None` means the head observed when verification starts.
    #[serde(default)]
    pub to: Option<u64>,
    /// Externally trusted `block_digest` of block `from - 1`.
    ///
    /// Ignored when `from == 0`. When absent for `from > 0`, the verifier
    /// reads the preceding block from the store and records that weaker anchor.
    #[serde(default)]
    pub checkpoint: Option<Digest>,
}

impl VerifyRange {
    /// Verify the whole chain from genesis to the current head.
    pub fn full() -> Self {
        Self::default()
    }

    /// Verify `[from, to]` inclusive.
    pub fn between(from: u64, to: u64) -> Self {
        Self {
            from,
            to: Some(to),
            checkpoint: None,
        }
    }

    /// Continue verification after a previously verified checkpoint.
    pub fn resume(checkpoint: &Checkpoint) -> Self {
        Self {
            from: checkpoint.sequence + 1,
            to: None,
            checkpoint: Some(checkpoint.block_digest),
        }
    }

    pub fn with_checkpoint(mut self, digest: Digest) -> Self {
        self.checkpoint = Some(digest);
        self
    }
}

/// The digest a verification walk was seeded with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anchor {
    /// Walk started at sequence 0 from `Digest::SENTINEL`.
    Genesis,
    /// Walk started from a caller-supplied, externally trusted digest.
    Checkpoint { sequence: u64, digest: Digest },
    /// Walk started from the digest of the preceding block as read from the store.
    ///
    /// Only as trustworthy as the store itself.
    Stored { sequence: u64, digest: Digest },
}

impl Anchor {
    /// The digest the first verified block must link to.
    pub fn digest(&self) -> Digest {
        match self {
            Self::Genesis => Digest::SENTINEL,
            Self::Checkpoint { digest, .. } | Self::Stored { digest, .. } => *digest,
        }
    }
}

/// Which check failed at the first broken block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    /// The block belongs to a different tenant than the chain being walked.
    TenantMismatch,
    /// The block's sequence is not exactly one past its predecessor's.
    SequenceMismatch,
    /// A sequence inside the range is absent from the store or bundle.
    MissingBlock,
    /// `prev_block_digest` does not equal the predecessor's `block_digest`.
    PrevDigestMismatch,
    /// The stored event no longer hashes to the header's `event_digest`.
    EventDigestMismatch,
    /// The header no longer hashes to its own `block_digest`.
    BlockDigestMismatch,
    /// `commit_time` is earlier than the predecessor's.
    CommitTimeRegression,
    /// The block is present in the store but can no longer be decoded.
    UndecodableBlock,
}

impl BreakKind {
    pub fn field(&self) -> &'static str {
        match self {
            Self::TenantMismatch => "tenant_id",
            Self::SequenceMismatch | Self::MissingBlock => "sequence",
            Self::PrevDigestMismatch => "prev_block_digest",
            Self::EventDigestMismatch => "event_digest",
            Self::BlockDigestMismatch => "block_digest",
            Self::CommitTimeRegression => "commit_time",
            Self::UndecodableBlock => "block",
        }
    }
}

impl fmt::Display for BreakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TenantMismatch => "tenant mismatch",
            Self::SequenceMismatch => "sequence mismatch",
            Self::MissingBlock => "missing block",
            Self::PrevDigestMismatch => "previous digest mismatch",
            Self::EventDigestMismatch => "event digest mismatch",
            Self::BlockDigestMismatch => "block digest mismatch",
            Self::CommitTimeRegression => "commit time regression",
            Self::UndecodableBlock => "undecodable block",
        };
        f.write_str(s)
    }
}

/// The first point of divergence found by a verification walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    /// The sequence the walk expected to find at this position.
    pub sequence: u64,
    pub kind: BreakKind,
    pub expected: String,
    pub found: String,
}

impl ChainBreak {
    pub fn new(
        sequence: u64,
        kind: BreakKind,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            sequence,
            kind,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Human-readable description of which field mismatched.
    pub fn describe(&self) -> String {
        format!(
            "{} at sequence {}: {} expected {}, found {}",
            self.kind,
            self.sequence,
            self.kind.field(),
            self.expected,
            self.found
        )
    }
}

/// Output of a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub tenant_id: TenantId,
    pub from_sequence: u64,
    /// Last sequence the walk intended to reach. `None` for an empty chain.
    pub to_sequence: Option<u64>,
    pub anchor: Anchor,
    pub blocks_checked: u64,
    /// Highest sequence confirmed consistent. `None` if no block was confirmed.
    pub verified_through_sequence: Option<u64>,
    /// `block_digest` of `verified_through_sequence`, usable as a checkpoint.
    pub verified_through_digest: Option<Digest>,
    pub valid: bool,
    pub first_broken_sequence: Option<u64>,
    pub failure: Option<ChainBreak>,
}

impl VerificationReport {
    /// The failure description, if any.
    pub fn failure_description(&self) -> Option<String> {
        self.failure.as_ref().map(ChainBreak::describe)
    }

    /// A checkpoint at the last verified block, if the walk confirmed any.
    ///
    /// Returned for broken reports too: everything up to the break is
    /// consistent and can seed a later walk.
    pub fn checkpoint(&self) -> Option<Checkpoint> {
        match (self.verified_through_sequence, self.verified_through_digest) {
            (Some(sequence), Some(block_digest)) => Some(Checkpoint {
                tenant_id: self.tenant_id.clone(),
                sequence,
                block_digest,
            }),
            _ => None,
        }
    }

    /// The auditor-facing one-line outcome.
    pub fn summary(&self) -> String {
        if self.valid {
            return match self.verified_through_sequence {
                Some(n) => format!(
                    "tenant '{}': chain verified through sequence {}",
                    self.tenant_id, n
                ),
                None if self.from_sequence > 0 => format!(
                    "tenant '{}': no blocks after sequence {}",
                    self.tenant_id,
                    self.from_sequence - 1
                ),
                None => format!("tenant '{}': chain is empty, nothing to verify", self.tenant_id),
            };
        }

        let at = self.first_broken_sequence.unwrap_or(self.from_sequence);
        let trusted = match self.verified_through_sequence {
            Some(n) => format!("chain valid only through {}", n),
            None if at == 0 => "no block in the chain can be trusted".to_string(),
            None => format!("chain valid only through {}", at - 1),
        };
        let detail = self
            .failure_description()
            .map(|d| format!(" ({})", d))
            .unwrap_or_default();
        format!(
            "tenant '{}': tampering detected at sequence {}, {}{}",
            self.tenant_id, at, trusted, detail
        )
    }
}

/// A previously verified position in a chain.
///
/// Publishing checkpoints externally lets later verification start from them
/// instead of genesis, and lets evidence bundles be matched against them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub tenant_id: TenantId,
    pub sequence: u64,
    pub block_digest: Digest,
}
