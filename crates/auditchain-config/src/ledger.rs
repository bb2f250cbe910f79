//! Wiring: turn a `LedgerConfig` into ready-to-use components.
//!
//! Every component built here shares the same `Arc<dyn ChainStore>`; none of
//! them share in-memory chain state with each other.

use std::sync::Arc;

use tracing::info;

use auditchain_contracts::error::{LedgerError, LedgerResult};
use auditchain_core::{AcceptAll, ChainStore, LedgerWriter, PayloadValidator, QueryService};
use auditchain_store::{InMemoryChainStore, SqliteChainStore};
use auditchain_verify::{ChainVerifier, EvidenceExporter, SchemaPayloadValidator};

use crate::config::{LedgerConfig, StoreBackend};

impl LedgerConfig {
    /// Open the configured store.
    pub fn open_store(&self) -> LedgerResult<Arc<dyn ChainStore>> {
        match self.store.backend {
            StoreBackend::Memory => {
                info!("using in-memory chain store");
                Ok(Arc::new(InMemoryChainStore::new()))
            }
            StoreBackend::Sqlite => {
                let path = self.store.path.as_deref().ok_or_else(|| LedgerError::Config {
                    reason: "store.path is required for the sqlite backend".to_string(),
                })?;
                Ok(Arc::new(SqliteChainStore::open(path, self.store.busy_timeout())?))
            }
        }
    }

    /// The payload validator for the configured `[[schemas]]`.
    pub fn payload_validator(&self) -> LedgerResult<Box<dyn PayloadValidator>> {
        if self.schemas.is_empty() {
            return Ok(Box::new(AcceptAll));
        }
        let mut validator = SchemaPayloadValidator::new();
        for entry in &self.schemas {
            validator.register(entry.event_type.clone(), &entry.document()?)?;
        }
        Ok(Box::new(validator))
    }
}

/// The four ledger boundaries over one store.
pub struct Ledger {
    pub store: Arc<dyn ChainStore>,
    pub writer: LedgerWriter,
    pub verifier: ChainVerifier,
    pub exporter: EvidenceExporter,
    pub query: QueryService,
}

impl Ledger {
    /// Open the configured store and build every component over it.
    pub fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        let store = config.open_store()?;
        Self::with_store(config, store)
    }

    /// Build every component over an already-open store.
    pub fn with_store(config: &LedgerConfig, store: Arc<dyn ChainStore>) -> LedgerResult<Self> {
        let writer = LedgerWriter::new(Arc::clone(&store), config.writer.clone())
            .with_validator(config.payload_validator()?);
        Ok(Self {
            writer,
            verifier: ChainVerifier::new(Arc::clone(&store), config.verifier.clone()),
            exporter: EvidenceExporter::new(Arc::clone(&store), config.verifier.clone()),
            query: QueryService::new(Arc::clone(&store), config.query.clone()),
            store,
        })
    }
}
