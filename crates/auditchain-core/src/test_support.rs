//! Test doubles shared by this crate's unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use serde_json::json;

use auditchain_contracts::{
    block::Block,
    error::{LedgerError, LedgerResult},
    event::{AuditEvent, EventId, EventType, TenantId},
};

use crate::traits::ChainStore;
use crate::writer::{LedgerWriter, WriterSettings};

/// Minimal in-memory store enforcing the append contract.
#[derive(Default)]
pub(crate) struct VecStore {
    chains: Mutex<HashMap<TenantId, Vec<Block>>>,
}

impl ChainStore for VecStore {
    fn append(&self, block: &Block) -> LedgerResult<()> {
        let mut chains = self.chains.lock().unwrap();
        let chain = chains.entry(block.tenant_id().clone()).or_default();
        let expected = chain.len() as u64;
        if block.sequence() != expected {
            return Err(LedgerError::SequenceConflict {
                tenant_id: block.tenant_id().to_string(),
                expected,
                found: block.sequence(),
            });
        }
        chain.push(block.clone());
        Ok(())
    }

    fn head(&self, tenant_id: &TenantId) -> LedgerResult<Option<Block>> {
        let chains = self.chains.lock().unwrap();
        Ok(chains.get(tenant_id).and_then(|c| c.last().cloned()))
    }

    fn range(&self, tenant_id: &TenantId, start: u64, end: u64) -> LedgerResult<Vec<Block>> {
        let chains = self.chains.lock().unwrap();
        let chain = chains.get(tenant_id).map(Vec::as_slice).unwrap_or(&[]);
        if start > end || end >= chain.len() as u64 {
            return Err(LedgerError::Range {
                tenant_id: tenant_id.to_string(),
                start,
                end,
                first_missing: (chain.len() as u64).max(start),
            });
        }
        Ok(chain[start as usize..=end as usize].to_vec())
    }

    fn tenants(&self) -> LedgerResult<Vec<TenantId>> {
        Ok(self.chains.lock().unwrap().keys().cloned().collect())
    }
}

/// A distinguishable event whose `occurred_at` is `n` seconds past a fixed base.
pub(crate) fn make_event(tenant: &str, n: u64) -> AuditEvent {
    AuditEvent {
        event_id: EventId::new(),
        tenant_id: TenantId::new(tenant).unwrap(),
        event_type: EventType::MappingCreated,
        actor: "mapper-svc".to_string(),
        regulation: None,
        payload: json!({ "n": n }),
        occurred_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
            + chrono::Duration::seconds(n as i64),
        corrects: None,
    }
}

/// A store holding `count` blocks for `tenant`, each event tweaked by `shape`.
pub(crate) fn chain_of(
    tenant: &str,
    count: u64,
    shape: impl Fn(u64, &mut AuditEvent),
) -> Arc<VecStore> {
    let store = Arc::new(VecStore::default());
    let writer = LedgerWriter::new(store.clone(), WriterSettings::default());
    for i in 0..count {
        let mut event = make_event(tenant, i);
        shape(i, &mut event);
        writer.record(event).unwrap();
    }
    store
}
