//! Query boundary types: filters, pagination, and result pages.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    error::LedgerError,
    event::{AuditEvent, EventType},
};

/// Inclusive `occurred_at` window. Either bound may be open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| *t >= from) && self.to.map_or(true, |to| *t <= to)
    }
}

/// Conjunctive filter over a tenant's events. Absent fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub event_type: Option<EventType>,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub regulation: Option<String>,
}

impl EventFilter {
    pub fn with_event_type(mut self, event_type: impl Into<EventType>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_regulation(mut self, regulation: impl Into<String>) -> Self {
        self.regulation = Some(regulation.into());
        self
    }

    pub fn with_time_range(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.time_range = Some(TimeRange { from, to });
        self
    }

    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(range) = &self.time_range {
            if !range.contains(&event.occurred_at) {
                return false;
            }
        }
        if let Some(event_type) = &self.event_type {
            if event.event_type != *event_type {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            if event.actor != *actor {
                return false;
            }
        }
        if let Some(regulation) = &self.regulation {
            if event.regulation.as_deref() != Some(regulation.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Opaque continuation token for paginated queries.
///
/// Encodes the next chain position to scan. It is deliberately not a digest:
/// digests are integrity metadata, not lookup handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(u64);

impl Cursor {
    pub(crate) const PREFIX: &'static str = "c1.";

    pub fn at(next_sequence: u64) -> Self {
        Self(next_sequence)
    }

    pub fn next_sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:016x}", Self::PREFIX, self.0)
    }
}

impl FromStr for Cursor {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| LedgerError::validation(format!("malformed cursor '{}'", s)))?;
        u64::from_str_radix(body, 16)
            .map(Self)
            .map_err(|_| LedgerError::validation(format!("malformed cursor '{}'", s)))
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Pagination request. `limit == 0` means "use the configured default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub cursor: Option<Cursor>,
    #[serde(default)]
    pub limit: usize,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self { cursor: None, limit }
    }

    pub fn after(cursor: Cursor, limit: usize) -> Self {
        Self {
            cursor: Some(cursor),
            limit,
        }
    }
}

/// An event as returned by the query service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub sequence: u64,
    pub commit_time: DateTime<Utc>,
    pub event: AuditEvent,
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub events: Vec<RecordedEvent>,
    /// `None` marks the end of results.
    pub next_cursor: Option<Cursor>,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}
