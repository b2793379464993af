//! Entities handled by record stores
//!
//! Stores never own entities: callers pass them in by reference and the store
//! writes the soft-delete field back so in-memory state follows storage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A row as returned by a statement executor, column name to value
pub type Row = Map<String, Value>;

/// Anything a record store can soft-delete, restore or hard-delete
pub trait Entity: Send + Sync {
    /// Whether the entity has never been persisted
    fn is_new(&self) -> bool;

    /// Current value of a field, `None` when the field is not loaded
    fn get(&self, field: &str) -> Option<&Value>;

    /// Overwrite a field in place
    fn set(&mut self, field: &str, value: Value);

    /// Snapshot used as the `entity` payload of lifecycle events
    fn to_payload(&self) -> Value;

    /// True when every listed field is loaded and non-null
    fn has_all(&self, fields: &[&str]) -> bool {
        fields
            .iter()
            .all(|field| self.get(field).is_some_and(|value| !value.is_null()))
    }
}

/// Loose truthiness of a stored flag: `false`, `0`, `"0"`, `""` and null are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Dynamic record: a map of column values plus a persisted flag
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    fields: Row,
    #[serde(skip)]
    new: bool,
}

impl Record {
    /// A record that has not been inserted yet
    pub fn new() -> Self {
        Self {
            fields: Map::new(),
            new: true,
        }
    }

    /// A record loaded from storage
    pub fn persisted(fields: Row) -> Self {
        Self { fields, new: false }
    }

    /// Builder-style field assignment
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn mark_persisted(&mut self) {
        self.new = false;
    }

    pub fn fields(&self) -> &Row {
        &self.fields
    }

    pub fn into_fields(self) -> Row {
        self.fields
    }
}

impl From<Row> for Record {
    fn from(fields: Row) -> Self {
        Self::persisted(fields)
    }
}

impl Entity for Record {
    fn is_new(&self) -> bool {
        self.new
    }

    fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    fn set(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    fn to_payload(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}
