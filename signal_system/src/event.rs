//! Lifecycle event types and definitions
//!
//! This module defines the structure of the events dispatched around
//! record deletion.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Lifecycle event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Dispatched before a record is soft-deleted; handlers may stop the operation
    BeforeDelete,
    /// Dispatched once a soft-delete has been applied
    AfterDelete,
}

impl EventType {
    /// Event name as seen by handlers
    pub fn name(&self) -> &'static str {
        match self {
            EventType::BeforeDelete => "Model.beforeDelete",
            EventType::AfterDelete => "Model.afterDelete",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseEvent {
    /// Event type
    pub event_type: EventType,
    /// Table name
    pub table_name: String,
    /// Primary key of the record, rendered as text (composite keys joined with ',')
    pub record_id: Option<String>,
    /// Additional data, keyed by name (`entity`, `options`)
    pub payload: HashMap<String, Value>,
    /// Event timestamp (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl DatabaseEvent {
    pub fn new(event_type: EventType, table_name: String) -> Self {
        Self {
            event_type,
            table_name,
            record_id: None,
            payload: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_record_id(mut self, record_id: String) -> Self {
        self.record_id = Some(record_id);
        self
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Event name as seen by handlers
    pub fn name(&self) -> &'static str {
        self.event_type.name()
    }

    /// Snapshot of the entity the event is about, if one was attached
    pub fn entity(&self) -> Option<&Value> {
        self.payload.get("entity")
    }

    /// Delete options the operation was invoked with, if attached
    pub fn options(&self) -> Option<&Value> {
        self.payload.get("options")
    }
}
