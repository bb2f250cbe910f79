//! # auditchain-verify
//!
//! Integrity checking for the auditchain ledger.
//!
//! - [`ChainVerifier`] walks a tenant's chain from genesis or a checkpoint and
//!   reports the first point of divergence.
//! - [`EvidenceExporter`] packages a range into an [`EvidenceBundle`] that
//!   [`verify_bundle`] can re-check without access to the store.
//! - [`SchemaPayloadValidator`] rejects payloads that do not match a JSON
//!   Schema registered for their event type.
//!
//! Both the live verifier and bundle re-verification drive the same walk, so
//! they cannot disagree about what counts as tampering.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use auditchain_verify::{ChainVerifier, VerifierSettings};
//! use auditchain_contracts::VerifyRange;
//!
//! let verifier = ChainVerifier::new(store, VerifierSettings::default());
//! let report = verifier.verify(&tenant, VerifyRange::full())?;
//! println!("{}", report.summary());
//! ```
//!
//! [`EvidenceBundle`]: auditchain_contracts::EvidenceBundle

pub mod export;
pub mod schema;
pub mod verifier;
mod walk;

pub use export::{verify_bundle, verify_bundle_against, EvidenceExporter};
pub use schema::SchemaPayloadValidator;
pub use verifier::{ChainVerifier, VerifierSettings};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use auditchain_contracts::{
        Anchor, AuditEvent, Block, BreakKind, EventId, EventType, EvidenceBundle, ExportOptions,
        LedgerError, TenantId, VerifyRange,
    };
    use auditchain_core::{ChainStore, LedgerWriter, WriterSettings};
    use auditchain_store::{InMemoryChainStore, SqliteChainStore};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn tenant(name: &str) -> TenantId {
        TenantId::new(name).unwrap()
    }

    fn make_event(tenant_name: &str, n: u64) -> AuditEvent {
        AuditEvent {
            event_id: EventId::new(),
            tenant_id: tenant(tenant_name),
            event_type: EventType::FixGenerated,
            actor: "fixer".to_string(),
            regulation: Some("PCI-DSS".to_string()),
            payload: json!({ "note": format!("block-{n}"), "lines": n }),
            occurred_at: Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap()
                + chrono::Duration::seconds(n as i64),
            corrects: None,
        }
    }

    fn write(store: Arc<dyn ChainStore>, tenant_name: &str, count: u64) -> Vec<Block> {
        let writer = LedgerWriter::new(store, WriterSettings::default());
        (0..count)
            .map(|n| writer.record(make_event(tenant_name, n)).unwrap())
            .collect()
    }

    fn chain(tenant_name: &str, count: u64) -> (Arc<InMemoryChainStore>, Vec<Block>) {
        let store = Arc::new(InMemoryChainStore::new());
        let blocks = write(store.clone(), tenant_name, count);
        (store, blocks)
    }

    fn verifier(store: Arc<dyn ChainStore>, chunk_size: u64) -> ChainVerifier {
        ChainVerifier::new(store, VerifierSettings { chunk_size })
    }

    /// A copy of `blocks` with one of them altered by `tamper`.
    fn tampered(blocks: &[Block], at: usize, tamper: impl Fn(&mut Block)) -> Arc<InMemoryChainStore> {
        let mut copy = blocks.to_vec();
        tamper(&mut copy[at]);
        Arc::new(InMemoryChainStore::from_blocks(copy))
    }

    // ── Valid chains ──────────────────────────────────────────────────────────

    #[test]
    fn test_valid_chain_verifies_through_head() {
        let (store, _) = chain("acme", 7);
        for chunk in [1, 3, 512] {
            let report = verifier(store.clone(), chunk)
                .verify(&tenant("acme"), VerifyRange::full())
                .unwrap();
            assert!(report.valid, "chunk {chunk}: {}", report.summary());
            assert_eq!(report.verified_through_sequence, Some(6));
            assert_eq!(report.blocks_checked, 7);
            assert_eq!(report.anchor, Anchor::Genesis);
            assert!(report.summary().contains("chain verified through sequence 6"));
        }
    }

    #[test]
    fn test_empty_chain_is_valid_and_says_so() {
        let store = Arc::new(InMemoryChainStore::new());
        let report = verifier(store, 8).verify(&tenant("acme"), VerifyRange::full()).unwrap();
        assert!(report.valid);
        assert_eq!(report.verified_through_sequence, None);
        assert!(report.summary().contains("empty"));
    }

    #[test]
    fn test_range_beyond_head_is_an_error() {
        let (store, _) = chain("acme", 3);
        let err = verifier(store.clone(), 8)
            .verify(&tenant("acme"), VerifyRange::between(1, 9))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Range { first_missing: 3, .. }), "{err}");

        let empty = Arc::new(InMemoryChainStore::new());
        let err = verifier(empty, 8)
            .verify(&tenant("acme"), VerifyRange::between(0, 0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Range { first_missing: 0, .. }));
    }

    #[test]
    fn test_partial_range_is_anchored_on_stored_block() {
        let (store, blocks) = chain("acme", 6);
        let report = verifier(store, 2)
            .verify(&tenant("acme"), VerifyRange::between(2, 4))
            .unwrap();
        assert!(report.valid);
        assert_eq!(report.blocks_checked, 3);
        assert_eq!(report.verified_through_sequence, Some(4));
        assert_eq!(
            report.anchor,
            Anchor::Stored {
                sequence: 1,
                digest: blocks[1].header.block_digest
            }
        );
    }

    // ── Incremental verification ──────────────────────────────────────────────

    #[test]
    fn test_checkpoint_resume_covers_only_new_blocks() {
        let (store, _) = chain("acme", 4);
        let verifier = verifier(store.clone(), 16);
        let checkpoint = verifier.checkpoint(&tenant("acme")).unwrap().unwrap();
        assert_eq!(checkpoint.sequence, 3);

        write(store.clone(), "acme", 3);
        let report = verifier
            .verify(&tenant("acme"), VerifyRange::resume(&checkpoint))
            .unwrap();
        assert!(report.valid, "{}", report.summary());
        assert_eq!(report.from_sequence, 4);
        assert_eq!(report.blocks_checked, 3);
        assert_eq!(report.verified_through_sequence, Some(6));
        assert!(matches!(report.anchor, Anchor::Checkpoint { sequence: 3, .. }));
    }

    #[test]
    fn test_resume_at_head_checks_nothing() {
        let (store, _) = chain("acme", 4);
        let verifier = verifier(store, 16);
        let checkpoint = verifier.checkpoint(&tenant("acme")).unwrap().unwrap();
        let report = verifier
            .verify(&tenant("acme"), VerifyRange::resume(&checkpoint))
            .unwrap();
        assert!(report.valid);
        assert_eq!(report.blocks_checked, 0);
        assert!(report.summary().contains("no blocks after sequence 3"));
    }

    #[test]
    fn test_wrong_checkpoint_breaks_first_block() {
        let (store, blocks) = chain("acme", 5);
        let range = VerifyRange::between(3, 4).with_checkpoint(blocks[1].header.block_digest);
        let report = verifier(store, 16).verify(&tenant("acme"), range).unwrap();
        assert!(!report.valid);
        assert_eq!(report.first_broken_sequence, Some(3));
        assert_eq!(report.failure.unwrap().kind, BreakKind::PrevDigestMismatch);
    }

    #[test]
    fn test_no_checkpoint_for_broken_chain() {
        let (_, blocks) = chain("acme", 3);
        let store = tampered(&blocks, 1, |b| b.event.actor = "mallory".to_string());
        assert!(verifier(store, 4).checkpoint(&tenant("acme")).unwrap().is_none());
    }

    // ── Tamper detection ──────────────────────────────────────────────────────

    #[test]
    fn test_single_byte_mutations_pinpoint_the_block() {
        // Six blocks, so flipping the low bit of the tail sequence lowers it.
        let (_, blocks) = chain("acme", 6);
        let payload_flip = |b: &mut Block| {
            let note = format!("block-{}", b.header.sequence).replace("block", "blocc");
            b.event.payload["note"] = json!(note);
        };
        let prev_flip = |b: &mut Block| b.header.prev_block_digest.0[7] ^= 0x01;
        let sequence_flip = |b: &mut Block| b.header.sequence ^= 0x01;
        let mutations: [(&str, &dyn Fn(&mut Block)); 3] = [
            ("payload", &payload_flip),
            ("prev_block_digest", &prev_flip),
            ("sequence", &sequence_flip),
        ];

        for (field, mutate) in mutations {
            for at in 0..blocks.len() {
                let store = tampered(&blocks, at, |b| mutate(b));
                let report = verifier(store, 2)
                    .verify(&tenant("acme"), VerifyRange::full())
                    .unwrap();
                assert!(!report.valid, "{field} at {at} went unnoticed");
                assert_eq!(report.first_broken_sequence, Some(at as u64), "{field} at {at}");
                let trusted = report.verified_through_sequence;
                assert_eq!(trusted, (at as u64).checked_sub(1), "{field} at {at}");
                assert!(report
                    .summary()
                    .contains(&format!("tampering detected at sequence {at}")));
            }
        }
    }

    #[test]
    fn test_header_fields_are_covered() {
        let (_, blocks) = chain("acme", 4);
        let cases: [(BreakKind, Box<dyn Fn(&mut Block)>); 3] = [
            (
                BreakKind::EventDigestMismatch,
                Box::new(|b: &mut Block| b.event.event_type = EventType::FixDeployed),
            ),
            (
                BreakKind::EventDigestMismatch,
                Box::new(|b: &mut Block| b.event.regulation = None),
            ),
            (
                BreakKind::BlockDigestMismatch,
                Box::new(|b: &mut Block| b.header.occurred_at += chrono::Duration::seconds(1)),
            ),
        ];
        for (kind, mutate) in cases {
            let store = tampered(&blocks, 2, |b| mutate(b));
            let report = verifier(store, 8)
                .verify(&tenant("acme"), VerifyRange::full())
                .unwrap();
            assert_eq!(report.first_broken_sequence, Some(2), "{kind}");
            assert_eq!(report.failure.unwrap().kind, kind);
        }
    }

    #[test]
    fn test_rehashed_commit_time_regression_is_caught() {
        let (_, blocks) = chain("acme", 4);
        let store = tampered(&blocks, 2, |b| {
            b.header.commit_time = blocks[1].header.commit_time - chrono::Duration::seconds(60);
            b.header.block_digest = auditchain_core::hash::recompute_block_digest(&b.header);
        });
        let report = verifier(store, 8).verify(&tenant("acme"), VerifyRange::full()).unwrap();
        assert_eq!(report.first_broken_sequence, Some(2));
        assert_eq!(report.failure.unwrap().kind, BreakKind::CommitTimeRegression);
    }

    #[test]
    fn test_lowered_tail_sequence_is_caught() {
        let (_, blocks) = chain("acme", 6);
        let store = tampered(&blocks, 5, |b| b.header.sequence = 4);
        for chunk in [1, 4, 512] {
            let report = verifier(store.clone(), chunk)
                .verify(&tenant("acme"), VerifyRange::full())
                .unwrap();
            assert!(!report.valid, "chunk {chunk}");
            assert_eq!(report.first_broken_sequence, Some(5));
            assert_eq!(report.verified_through_sequence, Some(4));
            let failure = report.failure.unwrap();
            assert_eq!(failure.kind, BreakKind::SequenceMismatch);
            assert_eq!(failure.found, "4");
        }

        // An explicit range short of the head is still judged on its own.
        let report = verifier(store, 4)
            .verify(&tenant("acme"), VerifyRange::between(0, 3))
            .unwrap();
        assert!(report.valid);
    }

    #[test]
    fn test_deleted_block_is_reported_not_raised() {
        let (_, mut blocks) = chain("acme", 5);
        blocks.remove(2);
        let store = Arc::new(InMemoryChainStore::from_blocks(blocks));
        let report = verifier(store, 2).verify(&tenant("acme"), VerifyRange::full()).unwrap();
        assert!(!report.valid);
        assert_eq!(report.first_broken_sequence, Some(2));
        assert_eq!(report.verified_through_sequence, Some(1));
    }

    // ── Multi-tenant scenario ─────────────────────────────────────────────────

    #[test]
    fn test_two_tenant_scenario() {
        let store = Arc::new(InMemoryChainStore::new());
        let writer = Arc::new(LedgerWriter::new(store.clone(), WriterSettings::default()));

        let handles: Vec<_> = [("tenant-a", 5), ("tenant-b", 3)]
            .into_iter()
            .map(|(name, count)| {
                let writer = Arc::clone(&writer);
                std::thread::spawn(move || {
                    for n in 0..count {
                        writer.record(make_event(name, n)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let verifier = verifier(store.clone(), 2);
        let a = verifier.verify(&tenant("tenant-a"), VerifyRange::full()).unwrap();
        let b = verifier.verify(&tenant("tenant-b"), VerifyRange::full()).unwrap();
        assert!(a.valid && b.valid);
        assert_eq!(a.verified_through_sequence, Some(4));
        assert_eq!(b.verified_through_sequence, Some(2));

        let a_blocks = store.range(&tenant("tenant-a"), 0, 4).unwrap();
        let b_blocks = store.range(&tenant("tenant-b"), 0, 2).unwrap();
        assert!(a_blocks.iter().all(|b| b.tenant_id() == &tenant("tenant-a")));
        assert!(b_blocks.iter().all(|b| b.tenant_id() == &tenant("tenant-b")));

        // Corrupt block 2 of tenant A.
        let mut all = a_blocks;
        all[2].header.prev_block_digest.0[0] ^= 0xff;
        all.extend(b_blocks);
        let corrupted = Arc::new(InMemoryChainStore::from_blocks(all));

        let reports = ChainVerifier::new(corrupted, VerifierSettings::default())
            .verify_all()
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].tenant_id, tenant("tenant-a"));
        assert!(!reports[0].valid);
        assert_eq!(reports[0].first_broken_sequence, Some(2));
        assert!(reports[0].summary().contains("chain valid only through 1"));
        assert!(reports[1].valid);
    }

    #[test]
    fn test_sqlite_backed_verification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let store = Arc::new(
            SqliteChainStore::open(&path, std::time::Duration::from_secs(1)).unwrap(),
        );
        write(store.clone(), "acme", 6);
        let report = verifier(store, 4).verify(&tenant("acme"), VerifyRange::full()).unwrap();
        assert!(report.valid);
        assert_eq!(report.verified_through_sequence, Some(5));
    }

    fn sqlite_chain(count: u64) -> (tempfile::TempDir, std::path::PathBuf, Arc<SqliteChainStore>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let store = Arc::new(
            SqliteChainStore::open(&path, std::time::Duration::from_secs(1)).unwrap(),
        );
        write(store.clone(), "acme", count);
        (dir, path, store)
    }

    /// Out-of-band edit of a persisted row, bypassing the append-only triggers.
    fn edit_row(path: &std::path::Path, set: &str, sequence: u64) {
        let conn = rusqlite::Connection::open(path).unwrap();
        conn.execute_batch("DROP TRIGGER IF EXISTS blocks_no_update;").unwrap();
        conn.execute(
            &format!("UPDATE blocks SET {set} WHERE sequence = ?1"),
            [sequence as i64],
        )
        .unwrap();
    }

    #[test]
    fn test_undecodable_sqlite_block_is_a_break() {
        let edits = [
            ("prev_block_digest = 'g' || substr(prev_block_digest, 2)", 2),
            ("event_json = replace(event_json, '}', ',}')", 2),
            ("block_digest = 'zz'", 4),
        ];
        for (set, at) in edits {
            let (_dir, path, store) = sqlite_chain(5);
            edit_row(&path, set, at);

            let report = verifier(store.clone(), 2)
                .verify(&tenant("acme"), VerifyRange::full())
                .unwrap();
            assert!(!report.valid, "{set}");
            assert_eq!(report.first_broken_sequence, Some(at), "{set}");
            assert_eq!(report.verified_through_sequence, Some(at - 1), "{set}");
            assert_eq!(report.failure.unwrap().kind, BreakKind::UndecodableBlock, "{set}");

            // The bundle stops before the unreadable block and still agrees.
            let bundle = EvidenceExporter::new(store, VerifierSettings { chunk_size: 2 })
                .export(&tenant("acme"), 0, 4, ExportOptions::default())
                .unwrap();
            assert_eq!(bundle.headers.len() as u64, at);
            assert_eq!(bundle.report.first_broken_sequence, Some(at));
            let offline = verify_bundle(&bundle).unwrap();
            assert!(!offline.report.valid);
            assert!(offline.matches_embedded, "{set}");
        }
    }

    // ── Evidence bundles ──────────────────────────────────────────────────────

    fn export_json(store: Arc<InMemoryChainStore>, start: u64, end: u64, options: ExportOptions) -> String {
        EvidenceExporter::new(store, VerifierSettings { chunk_size: 2 })
            .export(&tenant("acme"), start, end, options)
            .unwrap()
            .to_json()
            .unwrap()
    }

    #[test]
    fn test_bundle_reverifies_offline() {
        let (store, blocks) = chain("acme", 8);
        let json = export_json(store, 3, 6, ExportOptions::default());

        let bundle = EvidenceBundle::from_json(&json).unwrap();
        assert_eq!(bundle.headers.len(), 4);
        assert_eq!(bundle.anchor_digest, blocks[2].header.block_digest);

        let outcome = verify_bundle(&bundle).unwrap();
        assert!(outcome.report.valid);
        assert!(outcome.matches_embedded);
        assert!(!outcome.header_only);
        assert_eq!(outcome.report.verified_through_sequence, Some(6));
    }

    #[test]
    fn test_export_and_bundle_agree_on_every_tampering() {
        let (_, blocks) = chain("acme", 6);
        for at in 0..blocks.len() {
            let store = tampered(&blocks, at, |b| b.event.payload["lines"] = json!(99));
            let live = verifier(store.clone(), 3)
                .verify(&tenant("acme"), VerifyRange::between(1, 5))
                .unwrap();

            let bundle = EvidenceBundle::from_json(&export_json(store, 1, 5, ExportOptions::default()))
                .unwrap();
            let offline = verify_bundle(&bundle).unwrap();

            assert_eq!(offline.report.valid, live.valid, "tampered at {at}");
            assert_eq!(
                offline.report.first_broken_sequence, live.first_broken_sequence,
                "tampered at {at}"
            );
            assert!(offline.matches_embedded);
        }
    }

    #[test]
    fn test_broken_range_still_exports() {
        let (_, blocks) = chain("acme", 5);
        let store = tampered(&blocks, 3, |b| b.header.prev_block_digest.0[0] ^= 1);
        let bundle = EvidenceBundle::from_json(&export_json(store, 0, 4, ExportOptions::default()))
            .unwrap();
        assert!(!bundle.report.valid);
        assert_eq!(bundle.report.first_broken_sequence, Some(3));
        assert_eq!(bundle.headers.len(), 5);
    }

    #[test]
    fn test_redacted_bundle_checks_headers_only() {
        let (_, blocks) = chain("acme", 4);
        let store = tampered(&blocks, 2, |b| b.event.actor = "mallory".to_string());
        let options = ExportOptions {
            redact_payloads: true,
            checkpoint: None,
        };
        let json = export_json(store, 0, 3, options);
        assert!(!json.contains("mallory"));

        let bundle = EvidenceBundle::from_json(&json).unwrap();
        assert!(bundle.is_redacted());
        let outcome = verify_bundle(&bundle).unwrap();
        assert!(outcome.header_only);
        // The live walk saw the event; the redacted bundle cannot.
        assert!(!bundle.report.valid);
        assert!(outcome.report.valid);
        assert!(!outcome.matches_embedded);
    }

    #[test]
    fn test_edited_bundle_is_caught() {
        let (store, _) = chain("acme", 5);
        let mut bundle =
            EvidenceBundle::from_json(&export_json(store, 0, 4, ExportOptions::default())).unwrap();
        bundle.headers.remove(3);
        if let Some(events) = bundle.events.as_mut() {
            events.remove(3);
        }
        let outcome = verify_bundle(&bundle).unwrap();
        assert!(!outcome.report.valid);
        assert_eq!(outcome.report.first_broken_sequence, Some(3));
        assert!(!outcome.matches_embedded);
    }

    #[test]
    fn test_foreign_header_in_bundle_is_a_tenant_mismatch() {
        let (store, _) = chain("acme", 3);
        let mut bundle =
            EvidenceBundle::from_json(&export_json(store, 0, 2, ExportOptions::default())).unwrap();
        bundle.headers[1].tenant_id = tenant("globex");
        let outcome = verify_bundle(&bundle).unwrap();
        assert_eq!(outcome.report.first_broken_sequence, Some(1));
        assert_eq!(outcome.report.failure.unwrap().kind, BreakKind::TenantMismatch);
    }

    #[test]
    fn test_bundle_against_published_checkpoint() {
        let (store, _) = chain("acme", 6);
        let published = verifier(store.clone(), 8)
            .verify(&tenant("acme"), VerifyRange::between(0, 2))
            .unwrap()
            .checkpoint()
            .unwrap();

        let genuine =
            EvidenceBundle::from_json(&export_json(store, 3, 5, ExportOptions::default())).unwrap();
        let outcome = verify_bundle_against(&genuine, &published).unwrap();
        assert!(outcome.report.valid);
        assert!(matches!(outcome.report.anchor, Anchor::Checkpoint { sequence: 2, .. }));

        // A rewritten history is self-consistent, but does not hang off the
        // published checkpoint.
        let (forged_store, _) = chain("acme", 6);
        let forged =
            EvidenceBundle::from_json(&export_json(forged_store, 3, 5, ExportOptions::default()))
                .unwrap();
        assert!(verify_bundle(&forged).unwrap().report.valid);
        let outcome = verify_bundle_against(&forged, &published).unwrap();
        assert!(!outcome.report.valid);
        assert_eq!(outcome.report.first_broken_sequence, Some(3));
        assert!(!outcome.matches_embedded);

        let stale = auditchain_contracts::Checkpoint {
            sequence: 1,
            ..published
        };
        assert!(matches!(
            verify_bundle_against(&genuine, &stale),
            Err(LedgerError::Bundle { .. })
        ));
    }

    #[test]
    fn test_mismatched_event_count_is_rejected() {
        let (store, _) = chain("acme", 3);
        let mut bundle =
            EvidenceBundle::from_json(&export_json(store, 0, 2, ExportOptions::default())).unwrap();
        bundle.events.as_mut().unwrap().pop();
        assert!(matches!(verify_bundle(&bundle), Err(LedgerError::Bundle { .. })));
    }

    #[test]
    fn test_surplus_headers_are_rejected() {
        let (store, _) = chain("acme", 4);
        let mut bundle =
            EvidenceBundle::from_json(&export_json(store, 0, 2, ExportOptions::default())).unwrap();
        let extra = bundle.headers[2].clone();
        bundle.headers.push(extra);
        if let Some(events) = bundle.events.as_mut() {
            let event = events[2].clone();
            events.push(event);
        }
        match verify_bundle(&bundle) {
            Err(LedgerError::Bundle { reason }) => assert!(reason.contains("4 headers"), "{reason}"),
            other => panic!("expected Bundle error, got {other:?}"),
        }
    }

    // ── Payload schemas ───────────────────────────────────────────────────────

    #[test]
    fn test_schema_rejects_nonconforming_payload() {
        let mut schemas = SchemaPayloadValidator::new();
        schemas
            .register(
                EventType::FixApproved,
                &json!({
                    "type": "object",
                    "required": ["approver"],
                    "properties": { "approver": { "type": "string" } }
                }),
            )
            .unwrap();

        let store = Arc::new(InMemoryChainStore::new());
        let writer = LedgerWriter::new(store.clone(), WriterSettings::default())
            .with_validator(Box::new(schemas));

        let mut approval = make_event("acme", 0);
        approval.event_type = EventType::FixApproved;
        approval.payload = json!({ "approver": 42 });
        let err = writer.record(approval.clone()).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
        assert!(err.to_string().contains("fix_approved"));
        assert_eq!(store.len(&tenant("acme")), 0);

        approval.payload = json!({ "approver": "dana" });
        writer.record(approval).unwrap();
        // Types without a schema pass through.
        writer.record(make_event("acme", 1)).unwrap();
        assert_eq!(store.len(&tenant("acme")), 2);
    }

    #[test]
    fn test_invalid_schema_is_a_config_error() {
        let mut schemas = SchemaPayloadValidator::new();
        let err = schemas
            .register(EventType::FixApproved, &json!({ "type": "not-a-type" }))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Config { .. }));
        assert!(schemas.is_empty());
    }
}
