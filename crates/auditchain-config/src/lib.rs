//! # auditchain-config
//!
//! TOML configuration for the auditchain ledger, and the wiring that turns
//! it into a store, a writer, a verifier, an exporter and a query service.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use auditchain_config::{Ledger, LedgerConfig};
//!
//! let config = LedgerConfig::from_file(Path::new("auditchain.toml"))?;
//! let ledger = Ledger::open(&config)?;
//! let receipt = ledger.writer.submit(request)?;
//! ```

pub mod config;
pub mod ledger;

pub use config::{LedgerConfig, SchemaConfig, StoreBackend, StoreConfig};
pub use ledger::Ledger;

// ── Tests ─────────────────────────────────────────────────────────────────────
