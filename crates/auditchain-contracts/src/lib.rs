//! # auditchain-contracts
//!
//! Shared types, digests, and errors for the auditchain ledger.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions, their validation, and error types.

pub mod block;
pub mod bundle;
pub mod digest;
pub mod error;
pub mod event;
pub mod query;
pub mod report;

pub use block::{Block, BlockHeader, Receipt};
pub use bundle::{BundleVerification, EvidenceBundle, ExportOptions, BUNDLE_FORMAT, BUNDLE_VERSION};
pub use digest::Digest;
pub use error::{LedgerError, LedgerResult};
pub use event::{AuditEvent, EventId, EventType, SubmitEvent, TenantId};
pub use query::{Cursor, EventFilter, Page, PageRequest, RecordedEvent, TimeRange};
pub use report::{Anchor, BreakKind, ChainBreak, Checkpoint, VerificationReport, VerifyRange};
