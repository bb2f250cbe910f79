//! JSON Schema checks on event payloads at ingestion.
//!
//! `SchemaPayloadValidator` holds one compiled schema per event type and
//! plugs into the writer as its `PayloadValidator`. Event types without a
//! registered schema are accepted as-is.

use std::collections::HashMap;

use jsonschema::Validator;
use serde_json::Value;
use tracing::{debug, warn};

use auditchain_contracts::{
    error::{LedgerError, LedgerResult},
    event::{AuditEvent, EventType},
};
use auditchain_core::traits::PayloadValidator;

#[derive(Default)]
pub struct SchemaPayloadValidator {
    schemas: HashMap<EventType, Validator>,
}

impl SchemaPayloadValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `schema` and use it for every event of `event_type`.
    ///
    /// Registering a type twice replaces the earlier schema. An invalid
    /// schema document is a `Config` error.
    pub fn register(&mut self, event_type: EventType, schema: &Value) -> LedgerResult<()> {
        let validator = jsonschema::validator_for(schema).map_err(|e| LedgerError::Config {
            reason: format!("invalid JSON Schema for event type '{event_type}': {e}"),
        })?;
        debug!(event_type = %event_type, "payload schema registered");
        self.schemas.insert(event_type, validator);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl PayloadValidator for SchemaPayloadValidator {
    fn validate(&self, event: &AuditEvent) -> LedgerResult<()> {
        let Some(validator) = self.schemas.get(&event.event_type) else {
            return Ok(());
        };

        let violations: Vec<String> = validator
            .iter_errors(&event.payload)
            .map(|error| format!("at '{}': {}", error.instance_path, error))
            .collect();
        if violations.is_empty() {
            return Ok(());
        }

        warn!(
            tenant_id = %event.tenant_id,
            event_type = %event.event_type,
            violations = violations.len(),
            "payload rejected by schema"
        );
        Err(LedgerError::validation(format!(
            "payload does not match the schema for '{}': {}",
            event.event_type,
            violations.join("; ")
        )))
    }
}
