//! The Hasher: SHA-256 over canonical event envelopes and block headers.
//!
//! Every field that contributes to a digest is listed explicitly so nothing
//! is accidentally omitted. Variable-length fields are u64-length-prefixed
//! and each digest kind starts with its own domain tag, so an event encoding
//! can never be replayed as a header encoding.
//!
//! Event digest input (in order):
//!   1. `EVENT_DOMAIN`
//!   2. event_id, tenant_id, event_type, actor (length-prefixed UTF-8)
//!   3. regulation, corrects (presence byte, then length-prefixed UTF-8)
//!   4. occurred_at as i64 seconds + u32 nanoseconds, big-endian
//!   5. canonical payload bytes (see `canonical`)
//!
//! Block digest input (in order):
//!   1. `BLOCK_DOMAIN`
//!   2. tenant_id (length-prefixed UTF-8)
//!   3. sequence as u64 big-endian
//!   4. event_digest, prev_block_digest (32 bytes each)
//!   5. occurred_at, commit_time as i64 seconds + u32 nanoseconds

use chrono::{DateTime, Utc};
use sha2::{Digest as _, Sha256};

use auditchain_contracts::{
    block::BlockHeader,
    digest::Digest,
    error::LedgerResult,
    event::{AuditEvent, TenantId},
};

use crate::canonical::{canonical_bytes, write_bytes};

const EVENT_DOMAIN: &[u8] = b"auditchain/event/v1\0";
const BLOCK_DOMAIN: &[u8] = b"auditchain/block/v1\0";

/// SHA-256 of `bytes`. Total and deterministic.
pub fn digest(bytes: &[u8]) -> Digest {
    Digest(Sha256::digest(bytes).into())
}

/// The canonical byte form of an event envelope, including its payload.
pub fn canonical_event_bytes(event: &AuditEvent) -> LedgerResult<Vec<u8>> {
    let payload = canonical_bytes(&event.payload)?;

    let mut out = Vec::with_capacity(EVENT_DOMAIN.len() + payload.len() + 128);
    out.extend_from_slice(EVENT_DOMAIN);
    write_bytes(&mut out, event.event_id.to_string().as_bytes());
    write_bytes(&mut out, event.tenant_id.as_str().as_bytes());
    write_bytes(&mut out, event.event_type.as_str().as_bytes());
    write_bytes(&mut out, event.actor.as_bytes());
    write_optional(&mut out, event.regulation.as_deref());
    write_optional(&mut out, event.corrects.map(|id| id.to_string()).as_deref());
    write_time(&mut out, &event.occurred_at);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Digest of an event's canonical form. Fails only if the payload cannot be
/// canonicalized.
pub fn event_digest(event: &AuditEvent) -> LedgerResult<Digest> {
    Ok(digest(&canonical_event_bytes(event)?))
}

/// Digest committing to every header field except `block_digest` itself.
pub fn block_digest(
    tenant_id: &TenantId,
    sequence: u64,
    event_digest: &Digest,
    prev_block_digest: &Digest,
    occurred_at: &DateTime<Utc>,
    commit_time: &DateTime<Utc>,
) -> Digest {
    let mut out = Vec::with_capacity(BLOCK_DOMAIN.len() + 160);
    out.extend_from_slice(BLOCK_DOMAIN);
    write_bytes(&mut out, tenant_id.as_str().as_bytes());
    out.extend_from_slice(&sequence.to_be_bytes());
    out.extend_from_slice(event_digest.as_bytes());
    out.extend_from_slice(prev_block_digest.as_bytes());
    write_time(&mut out, occurred_at);
    write_time(&mut out, commit_time);
    digest(&out)
}

/// Recompute the digest a header should carry from its own fields.
pub fn recompute_block_digest(header: &BlockHeader) -> Digest {
    block_digest(
        &header.tenant_id,
        header.sequence,
        &header.event_digest,
        &header.prev_block_digest,
        &header.occurred_at,
        &header.commit_time,
    )
}

fn write_optional(out: &mut Vec<u8>, value: Option<&str>) {
    match value {
        Some(v) => {
            out.push(1);
            write_bytes(out, v.as_bytes());
        }
        None => out.push(0),
    }
}

fn write_time(out: &mut Vec<u8>, t: &DateTime<Utc>) {
    out.extend_from_slice(&t.timestamp().to_be_bytes());
    out.extend_from_slice(&t.timestamp_subsec_nanos().to_be_bytes());
}
