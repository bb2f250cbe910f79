//! Audit events: the caller-supplied unit of record.
//!
//! The ledger core is ignorant of business semantics. Each collaborator's
//! event shape is an opaque JSON `payload` tagged with an `EventType`, which
//! the query service can filter on without understanding the payload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};

/// Maximum length of a tenant identifier in bytes.
pub const MAX_TENANT_ID_LEN: usize = 128;

/// Opaque tenant identifier. Each tenant owns exactly one chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Build a tenant id, rejecting empty, oversized, or control-character ids.
    pub fn new(id: impl Into<String>) -> LedgerResult<Self> {
        let id = id.into();
        Self::check(&id)?;
        Ok(Self(id))
    }

    /// Re-run the construction checks, e.g. on a deserialized value.
    pub fn validate(&self) -> LedgerResult<()> {
        Self::check(&self.0)
    }

    fn check(id: &str) -> LedgerResult<()> {
        if id.is_empty() {
            return Err(LedgerError::validation("tenant_id must not be empty"));
        }
        if id.len() > MAX_TENANT_ID_LEN {
            return Err(LedgerError::validation(format!(
                "tenant_id exceeds {} bytes",
                MAX_TENANT_ID_LEN
            )));
        }
        if id.chars().any(char::is_control) {
            return Err(LedgerError::validation(
                "tenant_id must not contain control characters",
            ));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of an accepted event.
///
/// Doubles as an idempotency key: resubmitting an event with the id of the
/// tenant's current head returns the existing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of a compliance-relevant event.
///
/// Serialized as a snake_case string. Unknown names round-trip through
/// `Other` so older ledgers keep reading newer event kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    RegulationDetected,
    RequirementExtracted,
    MappingCreated,
    FixGenerated,
    FixApproved,
    FixDeployed,
    FeedbackSubmitted,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::RegulationDetected => "regulation_detected",
            Self::RequirementExtracted => "requirement_extracted",
            Self::MappingCreated => "mapping_created",
            Self::FixGenerated => "fix_generated",
            Self::FixApproved => "fix_approved",
            Self::FixDeployed => "fix_deployed",
            Self::FeedbackSubmitted => "feedback_submitted",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "regulation_detected" => Self::RegulationDetected,
            "requirement_extracted" => Self::RequirementExtracted,
            "mapping_created" => Self::MappingCreated,
            "fix_generated" => Self::FixGenerated,
            "fix_approved" => Self::FixApproved,
            "fix_deployed" => Self::FixDeployed,
            "feedback_submitted" => Self::FeedbackSubmitted,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted audit event. Immutable once recorded.
///
/// Corrections are new events whose `corrects` field names the original;
/// the original block is never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: EventId,
    pub tenant_id: TenantId,
    pub event_type: EventType,
    /// Human or service that caused the event.
    pub actor: String,
    /// Regulation this event concerns, if any (e.g. "GDPR", "HIPAA").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulation: Option<String>,
    /// Business content. Must be a JSON object.
    pub payload: serde_json::Value,
    /// When the underlying action happened, as reported by the caller.
    pub occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrects: Option<EventId>,
}

/// Request shape of the ingestion boundary ("submit audit event").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitEvent {
    pub tenant_id: String,
    pub event_type: EventType,
    pub actor: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub regulation: Option<String>,
    #[serde(default)]
    pub corrects: Option<EventId>,
    /// Caller-chosen id; set it when retrying a submission whose outcome is unknown.
    #[serde(default)]
    pub event_id: Option<EventId>,
}

impl SubmitEvent {
    /// Convert into an `AuditEvent`, assigning an id when none was supplied.
    pub fn into_event(self) -> LedgerResult<AuditEvent> {
        Ok(AuditEvent {
            event_id: self.event_id.unwrap_or_default(),
            tenant_id: TenantId::new(self.tenant_id)?,
            event_type: self.event_type,
            actor: self.actor,
            regulation: self.regulation,
            payload: self.payload,
            occurred_at: self.occurred_at,
            corrects: self.corrects,
        })
    }
}
