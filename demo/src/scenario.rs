//! The two-tenant tamper scenario.
//!
//! Tenant A records five events while tenant B concurrently records three.
//! Both chains verify. A range of A is exported and re-verified offline.
//! Then block 2 of a forensic copy of A has its `prev_block_digest`
//! corrupted: A now fails at sequence 2 while B stays intact.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use auditchain_config::{Ledger, LedgerConfig};
use auditchain_contracts::{
    EventType, ExportOptions, LedgerError, LedgerResult, SubmitEvent, TenantId, VerifyRange,
};
use auditchain_core::ChainStore;
use auditchain_store::InMemoryChainStore;
use auditchain_verify::{verify_bundle, ChainVerifier};

const TENANT_A: &str = "tenant-a";
const TENANT_B: &str = "tenant-b";

pub fn run(config: &LedgerConfig) -> LedgerResult<()> {
    println!();
    println!("=== auditchain: two-tenant tamper scenario ===");
    println!();

    let ledger = Ledger::with_store(config, Arc::new(InMemoryChainStore::new()))?;
    let a = TenantId::new(TENANT_A)?;
    let b = TenantId::new(TENANT_B)?;

    // ── Step 1: concurrent ingestion ──────────────────────────────────────────
    println!("  [1] Submitting E0..E4 for {} and E0..E2 for {} concurrently", a, b);
    std::thread::scope(|scope| -> LedgerResult<()> {
        let writer = &ledger.writer;
        let handles = [(TENANT_A, 5u64), (TENANT_B, 3u64)].map(|(tenant, count)| {
            scope.spawn(move || -> LedgerResult<()> {
                for n in 0..count {
                    let receipt = writer.submit(sample_event(tenant, n))?;
                    println!(
                        "      {:<9} seq {}  {}",
                        tenant,
                        receipt.sequence,
                        &receipt.block_digest.to_hex()[..16]
                    );
                }
                Ok(())
            })
        });
        for handle in handles {
            handle
                .join()
                .map_err(|_| LedgerError::storage("ingestion thread panicked"))??;
        }
        Ok(())
    })?;
    println!();

    // ── Step 2: verification ──────────────────────────────────────────────────
    println!("  [2] Verifying both chains");
    for tenant in [&a, &b] {
        let report = ledger.verifier.verify(tenant, VerifyRange::full())?;
        println!("      {}", report.summary());
    }
    println!();

    // ── Step 3: evidence export ───────────────────────────────────────────────
    println!("  [3] Exporting {} sequences 1..=3 and re-verifying offline", a);
    let bundle = ledger.exporter.export(&a, 1, 3, ExportOptions::default())?;
    let offline = verify_bundle(&bundle)?;
    println!("      anchor digest:      {}", bundle.anchor_digest);
    println!("      headers in bundle:  {}", bundle.headers.len());
    println!("      offline result:     {}", offline.report.summary());
    println!("      agrees with export: {}", offline.matches_embedded);
    println!();

    // ── Step 4: tampering ─────────────────────────────────────────────────────
    println!("  [4] Corrupting prev_block_digest of {} block 2 in a forensic copy", a);
    let mut blocks = ledger.store.range(&a, 0, 4)?;
    blocks[2].header.prev_block_digest.0[0] ^= 0xff;
    blocks.extend(ledger.store.range(&b, 0, 2)?);
    let copy: Arc<dyn ChainStore> = Arc::new(InMemoryChainStore::from_blocks(blocks));

    let verifier = ChainVerifier::new(copy, config.verifier.clone());
    for report in verifier.verify_all()? {
        println!("      {}", report.summary());
    }
    println!();

    println!("  Scenario complete at {}.", Utc::now().to_rfc3339());
    println!();
    Ok(())
}

fn sample_event(tenant: &str, n: u64) -> SubmitEvent {
    let (event_type, payload) = match n {
        0 => (
            EventType::RegulationDetected,
            json!({ "source": "eur-lex", "celex": "32022R2554" }),
        ),
        1 => (
            EventType::RequirementExtracted,
            json!({ "article": 6, "requirement": "ICT risk management framework" }),
        ),
        2 => (
            EventType::MappingCreated,
            json!({ "path": "src/risk/register.rs", "confidence": 0.82 }),
        ),
        3 => (
            EventType::FixGenerated,
            json!({ "patch_lines": 41, "model": "fixer-v2" }),
        ),
        _ => (
            EventType::FixApproved,
            json!({ "approver": "compliance-lead", "ticket": format!("AUD-{}", 100 + n) }),
        ),
    };
    SubmitEvent {
        tenant_id: tenant.to_string(),
        event_type,
        actor: format!("{}-pipeline", tenant),
        payload,
        occurred_at: Utc::now(),
        regulation: Some("DORA".to_string()),
        corrects: None,
        event_id: None,
    }
}
