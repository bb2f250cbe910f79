//! The ledger writer: the only component permitted to create blocks.
//!
//! Recording an event follows a fixed order:
//!
//!   Validate → Canonicalize → Event digest → [tenant lock] → Head → Build block → Append
//!
//! Writes for one tenant are serialized through a keyed lock table, so two
//! concurrent `record` calls for the same tenant never read the same head.
//! Tenants never share a lock on this path. A `SequenceConflict` from the
//! store (another process appending to the same chain) is retried from a
//! fresh head; every other store failure is surfaced to the caller unmodified.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use auditchain_contracts::{
    block::{Block, BlockHeader, Receipt},
    digest::Digest,
    error::{LedgerError, LedgerResult},
    event::{AuditEvent, SubmitEvent, TenantId},
};

use crate::{
    canonical,
    hash,
    traits::{AcceptAll, ChainStore, Clock, PayloadValidator, SystemClock},
};

/// Maximum length of an actor identifier in bytes.
pub const MAX_ACTOR_LEN: usize = 256;

/// Tunables for the writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterSettings {
    /// Total append attempts per `record` call before giving up with `Contention`.
    pub max_append_attempts: u32,
    /// Pause between attempts after a sequence conflict.
    pub retry_backoff_ms: u64,
    /// Upper bound on the canonical encoding of an event.
    pub max_payload_bytes: usize,
    /// Upper bound on payload nesting.
    pub max_payload_depth: usize,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            max_append_attempts: 5,
            retry_backoff_ms: 2,
            max_payload_bytes: 256 * 1024,
            max_payload_depth: 32,
        }
    }
}

/// One mutex per tenant, created on first use.
///
/// The table lock is held only long enough to find or insert a tenant's
/// entry; the tenant mutex is what serializes `record`. Entries are never
/// removed, so the table grows with the number of distinct tenants a writer
/// has seen. That is fine for a bounded tenant set; a deployment with
/// unbounded tenant churn should recreate writers periodically.
#[derive(Default)]
struct TenantLocks {
    table: RwLock<HashMap<TenantId, Arc<Mutex<()>>>>,
}

impl TenantLocks {
    fn lock_for(&self, tenant_id: &TenantId) -> Arc<Mutex<()>> {
        {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(lock) = table.get(tenant_id) {
                return Arc::clone(lock);
            }
        }
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(table.entry(tenant_id.clone()).or_default())
    }
}

/// Accepts audit events and commits them as linked blocks.
///
/// Share one writer (behind an `Arc`) between all ingestion threads: the
/// per-tenant serialization only holds if every writer call for a tenant
/// goes through the same lock table.
pub struct LedgerWriter {
    store: Arc<dyn ChainStore>,
    validator: Box<dyn PayloadValidator>,
    clock: Box<dyn Clock>,
    settings: WriterSettings,
    locks: TenantLocks,
}

impl LedgerWriter {
    /// Create a writer over `store` with no payload schemas and the system clock.
    pub fn new(store: Arc<dyn ChainStore>, settings: WriterSettings) -> Self {
        Self {
            store,
            validator: Box::new(AcceptAll),
            clock: Box::new(SystemClock),
            settings,
            locks: TenantLocks::default(),
        }
    }

    pub fn with_validator(mut self, validator: Box<dyn PayloadValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &WriterSettings {
        &self.settings
    }

    /// The ingestion boundary: accept a submission and return its receipt.
    pub fn submit(&self, request: SubmitEvent) -> LedgerResult<Receipt> {
        let event = request.into_event()?;
        self.record(event).map(|block| block.receipt())
    }

    /// Validate `event`, link it to the tenant's head, and commit it.
    ///
    /// # Errors
    ///
    /// - `Validation`: malformed event; nothing was written.
    /// - `Contention`: every attempt lost a sequence race.
    /// - `Storage` / `Timeout`: surfaced unmodified from the store. After a
    ///   `Timeout`, call `record` again with the same event: the retry sees
    ///   the event at the head if the first append landed.
    pub fn record(&self, event: AuditEvent) -> LedgerResult<Block> {
        let event_digest = self.validate(&event)?;
        let tenant_id = event.tenant_id.clone();

        let lock = self.locks.lock_for(&tenant_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let attempts = self.settings.max_append_attempts.max(1);
        for attempt in 1..=attempts {
            let head = self.store.head(&tenant_id)?;

            if let Some(existing) = Self::already_recorded(head.as_ref(), &event)? {
                info!(
                    tenant_id = %tenant_id,
                    sequence = existing.sequence(),
                    event_id = %event.event_id,
                    "event already at head; returning existing block"
                );
                return Ok(existing);
            }

            let block = self.build_block(&event, event_digest, head.as_ref());
            debug!(
                tenant_id = %tenant_id,
                sequence = block.sequence(),
                attempt,
                "appending block"
            );

            match self.store.append(&block) {
                Ok(()) => {
                    info!(
                        tenant_id = %tenant_id,
                        sequence = block.sequence(),
                        event_type = %block.event.event_type,
                        block_digest = %block.header.block_digest,
                        "block committed"
                    );
                    return Ok(block);
                }
                Err(e) if e.is_sequence_conflict() => {
                    warn!(
                        tenant_id = %tenant_id,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "sequence conflict; re-reading head"
                    );
                    if attempt < attempts && self.settings.retry_backoff_ms > 0 {
                        std::thread::sleep(Duration::from_millis(self.settings.retry_backoff_ms));
                    }
                }
                Err(e) => return Err(e),
            }
        }

        warn!(tenant_id = %tenant_id, attempts, "append retries exhausted");
        Err(LedgerError::Contention {
            tenant_id: tenant_id.to_string(),
            attempts,
        })
    }

    /// Run every ingestion check and return the event digest.
    fn validate(&self, event: &AuditEvent) -> LedgerResult<Digest> {
        event.tenant_id.validate()?;

        if event.actor.is_empty() {
            return Err(LedgerError::validation("actor must not be empty"));
        }
        if event.actor.len() > MAX_ACTOR_LEN || event.actor.chars().any(char::is_control) {
            return Err(LedgerError::validation(format!(
                "actor must be at most {} bytes without control characters",
                MAX_ACTOR_LEN
            )));
        }
        if matches!(event.regulation.as_deref(), Some("")) {
            return Err(LedgerError::validation("regulation, when present, must not be empty"));
        }
        if event.event_type.as_str().is_empty() {
            return Err(LedgerError::validation("event_type must not be empty"));
        }
        if !event.payload.is_object() {
            return Err(LedgerError::validation("payload must be a JSON object"));
        }

        let depth = canonical::depth(&event.payload);
        if depth > self.settings.max_payload_depth {
            return Err(LedgerError::validation(format!(
                "payload nesting depth {} exceeds limit {}",
                depth, self.settings.max_payload_depth
            )));
        }

        let bytes = hash::canonical_event_bytes(event)?;
        if bytes.len() > self.settings.max_payload_bytes {
            return Err(LedgerError::validation(format!(
                "canonical event size {} bytes exceeds limit {}",
                bytes.len(),
                self.settings.max_payload_bytes
            )));
        }

        self.validator.validate(event)?;

        Ok(hash::digest(&bytes))
    }

    /// Detect a retried submission whose first append already landed.
    fn already_recorded(head: Option<&Block>, event: &AuditEvent) -> LedgerResult<Option<Block>> {
        match head {
            Some(block) if block.event.event_id == event.event_id => {
                if block.event == *event {
                    Ok(Some(block.clone()))
                } else {
                    Err(LedgerError::validation(format!(
                        "event id {} is already recorded with different content",
                        event.event_id
                    )))
                }
            }
            _ => Ok(None),
        }
    }

    fn build_block(&self, event: &AuditEvent, event_digest: Digest, head: Option<&Block>) -> Block {
        let now = self.clock.now();
        let (sequence, prev_block_digest, commit_time) = match head {
            None => (0, Digest::SENTINEL, now),
            Some(h) => (
                h.header.sequence + 1,
                h.header.block_digest,
                now.max(h.header.commit_time),
            ),
        };

        let block_digest = hash::block_digest(
            &event.tenant_id,
            sequence,
            &event_digest,
            &prev_block_digest,
            &event.occurred_at,
            &commit_time,
        );

        Block {
            header: BlockHeader {
                tenant_id: event.tenant_id.clone(),
                sequence,
                event_digest,
                prev_block_digest,
                block_digest,
                occurred_at: event.occurred_at,
                commit_time,
            },
            event: event.clone(),
        }
    }
}
