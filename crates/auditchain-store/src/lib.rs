//! # auditchain-store
//!
//! Append-only, per-tenant block storage for the auditchain ledger.
//!
//! ## Overview
//!
//! Two `ChainStore` backends share one contract: `append` succeeds only for
//! the block right after the tenant's head, `range` fails loudly on any gap,
//! and nothing can be updated or deleted.
//!
//! - `InMemoryChainStore` for tests, demos and forensic copies
//! - `SqliteChainStore` for durable deployments
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::{sync::Arc, time::Duration};
//! use auditchain_core::{LedgerWriter, WriterSettings};
//! use auditchain_store::SqliteChainStore;
//!
//! let store = Arc::new(SqliteChainStore::open("ledger.db", Duration::from_secs(5))?);
//! let writer = LedgerWriter::new(store, WriterSettings::default());
//! ```

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryChainStore;
pub use sqlite::SqliteChainStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
