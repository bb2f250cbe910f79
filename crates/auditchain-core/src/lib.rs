//! # auditchain-core
//!
//! The write and read paths of the auditchain ledger.
//!
//! This crate provides:
//! - The Hasher (`hash`) and payload canonicalization (`canonical`)
//! - The seams (`ChainStore`, `PayloadValidator`, `Clock`) in `traits`
//! - The `LedgerWriter`, which serializes appends per tenant
//! - The `QueryService`, read-only filtered access to recorded events
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use auditchain_core::{LedgerWriter, WriterSettings};
//!
//! let writer = LedgerWriter::new(Arc::new(store), WriterSettings::default());
//! let receipt = writer.submit(request)?;
//! ```

pub mod canonical;
pub mod hash;
pub mod query;
pub mod traits;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_support;

pub use query::{EventStream, QueryService, QuerySettings};
pub use traits::{AcceptAll, ChainStore, Clock, PayloadValidator, SystemClock};
pub use writer::{LedgerWriter, WriterSettings};
