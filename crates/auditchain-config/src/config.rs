//! Configuration schema.
//!
//! A `LedgerConfig` is deserialized from TOML. Every section is optional and
//! falls back to the defaults of the component it configures.
//!
//! ```toml
//! [store]
//! backend = "sqlite"
//! path = "auditchain.db"
//! busy_timeout_ms = 5000
//!
//! [writer]
//! max_append_attempts = 5
//!
//! [verifier]
//! chunk_size = 512
//!
//! [[schemas]]
//! event_type = "fix_approved"
//! schema = '{"type":"object","required":["approver"]}'
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use auditchain_contracts::{
    error::{LedgerError, LedgerResult},
    event::EventType,
};
use auditchain_core::{canonical::MAX_ENCODE_DEPTH, QuerySettings, WriterSettings};
use auditchain_verify::VerifierSettings;

/// Which `ChainStore` implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Non-durable; everything is lost when the process exits.
    #[default]
    Memory,
    Sqlite,
}

/// The `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file. Required for `sqlite`; relative paths are resolved
    /// against the config file's directory by `LedgerConfig::from_file`.
    pub path: Option<PathBuf>,
    /// How long an SQLite statement waits on a lock before timing out.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// One `[[schemas]]` entry: a JSON Schema document for an event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    pub event_type: EventType,
    /// The schema as a JSON string.
    pub schema: String,
}

impl SchemaConfig {
    pub fn document(&self) -> LedgerResult<Value> {
        serde_json::from_str(&self.schema).map_err(|e| LedgerError::Config {
            reason: format!("schema for '{}' is not valid JSON: {}", self.event_type, e),
        })
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub store: StoreConfig,
    pub writer: WriterSettings,
    pub verifier: VerifierSettings,
    pub query: QuerySettings,
    pub schemas: Vec<SchemaConfig>,
}

impl LedgerConfig {
    /// Parse and validate TOML.
    ///
    /// Returns `LedgerError::Config` if the TOML is malformed, has unknown
    /// keys, or holds out-of-range values.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: LedgerConfig = toml::from_str(s).map_err(|e| LedgerError::Config {
            reason: format!("failed to parse ledger TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse the file at `path`. A relative `store.path` is taken
    /// relative to the file's directory.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        if let (Some(db), Some(dir)) = (config.store.path.as_mut(), path.parent()) {
            if db.is_relative() {
                *db = dir.join(&*db);
            }
        }
        Ok(config)
    }

    /// Check value ranges the type system cannot express.
    pub fn validate(&self) -> LedgerResult<()> {
        let invalid = |reason: String| Err(LedgerError::Config { reason });

        if self.store.backend == StoreBackend::Sqlite && self.store.path.is_none() {
            return invalid("store.path is required when store.backend = \"sqlite\"".to_string());
        }
        if self.store.busy_timeout_ms == 0 {
            return invalid("store.busy_timeout_ms must be positive".to_string());
        }

        let w = &self.writer;
        if w.max_append_attempts == 0 {
            return invalid("writer.max_append_attempts must be at least 1".to_string());
        }
        if w.max_payload_bytes == 0 {
            return invalid("writer.max_payload_bytes must be positive".to_string());
        }
        if w.max_payload_depth == 0 || w.max_payload_depth > MAX_ENCODE_DEPTH {
            return invalid(format!(
                "writer.max_payload_depth must be within 1..={}",
                MAX_ENCODE_DEPTH
            ));
        }

        if self.verifier.chunk_size == 0 {
            return invalid("verifier.chunk_size must be at least 1".to_string());
        }

        let q = &self.query;
        if q.default_page_size == 0 || q.default_page_size > q.max_page_size {
            return invalid(format!(
                "query.default_page_size must be within 1..={} (query.max_page_size)",
                q.max_page_size
            ));
        }
        if q.scan_chunk_size == 0 {
            return invalid("query.scan_chunk_size must be at least 1".to_string());
        }

        let mut seen = HashSet::new();
        for entry in &self.schemas {
            if !seen.insert(&entry.event_type) {
                return invalid(format!(
                    "more than one schema for event type '{}'",
                    entry.event_type
                ));
            }
            entry.document()?;
        }
        Ok(())
    }
}
