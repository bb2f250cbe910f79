//! Evidence bundles: portable, independently re-verifiable chain excerpts.
//!
//! # Format (version 1)
//!
//! A bundle is a single JSON object:
//!
//! ```text
//! {
//!   "format": "auditchain.evidence-bundle",
//!   "version": 1,
//!   "tenant_id": "...",
//!   "start_sequence": 10,
//!   "end_sequence": 20,
//!   "anchor_digest": "<64 hex>",      // block_digest of start_sequence - 1, or 64 zeros
//!   "headers": [ BlockHeader, ... ],  // ascending sequence
//!   "events": [ AuditEvent, ... ],    // omitted when payloads are redacted
//!   "report": VerificationReport,     // live verification at export time
//!   "exported_at": "RFC 3339"
//! }
//! ```
//!
//! Digests are lowercase hex. Timestamps are RFC 3339 UTC. Readers reject
//! any other `format` string and any `version` they do not know.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    block::BlockHeader,
    digest::Digest,
    error::{LedgerError, LedgerResult},
    event::{AuditEvent, TenantId},
    report::VerificationReport,
};

/// Value of the `format` field of every bundle.
pub const BUNDLE_FORMAT: &str = "auditchain.evidence-bundle";

/// The bundle format version this crate reads and writes.
pub const BUNDLE_VERSION: u32 = 1;

/// Options for an export call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Omit event bodies; headers still allow linkage re-verification.
    pub redact_payloads: bool,
    /// Externally trusted digest of the block preceding the range.
    pub checkpoint: Option<Digest>,
}

/// An exported, self-contained range of a tenant's chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub format: String,
    pub version: u32,
    pub tenant_id: TenantId,
    pub start_sequence: u64,
    pub end_sequence: u64,
    pub anchor_digest: Digest,
    pub headers: Vec<BlockHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<AuditEvent>>,
    pub report: VerificationReport,
    pub exported_at: DateTime<Utc>,
}

impl EvidenceBundle {
    pub fn is_redacted(&self) -> bool {
        self.events.is_none()
    }

    /// Serialize to the stable pretty-printed JSON form.
    pub fn to_json(&self) -> LedgerResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::Bundle {
            reason: format!("failed to serialize bundle: {}", e),
        })
    }

    /// Parse a bundle, rejecting unknown formats and versions.
    pub fn from_json(s: &str) -> LedgerResult<Self> {
        let bundle: EvidenceBundle = serde_json::from_str(s).map_err(|e| LedgerError::Bundle {
            reason: format!("failed to parse bundle: {}", e),
        })?;
        if bundle.format != BUNDLE_FORMAT {
            return Err(LedgerError::Bundle {
                reason: format!("unknown bundle format '{}'", bundle.format),
            });
        }
        if bundle.version != BUNDLE_VERSION {
            return Err(LedgerError::Bundle {
                reason: format!(
                    "unsupported bundle version {} (this reader understands {})",
                    bundle.version, BUNDLE_VERSION
                ),
            });
        }
        Ok(bundle)
    }
}

/// Outcome of re-verifying a bundle from its contents alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleVerification {
    /// The report recomputed from the bundle's headers (and events, if present).
    pub report: VerificationReport,
    /// True when the recomputed `valid` / `first_broken_sequence` agree with
    /// the report embedded at export time.
    pub matches_embedded: bool,
    /// True when event bodies were redacted and only header checks ran.
    pub header_only: bool,
}
