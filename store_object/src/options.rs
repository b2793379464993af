use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options for a single soft-delete, passed through unchanged to rule
/// checkers, event handlers and association cascades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Run the delete rule set before touching anything
    pub check_rules: bool,
    /// False when the delete was triggered by a cascade from a parent record
    #[serde(rename = "_primary")]
    pub primary: bool,
    /// Free-form options for collaborators (association settings and the like)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            check_rules: true,
            primary: true,
            extra: Map::new(),
        }
    }
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_rules(mut self, enabled: bool) -> Self {
        self.check_rules = enabled;
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Copy of these options for cascaded deletes: always non-primary
    pub fn dependent(&self) -> Self {
        Self {
            primary: false,
            ..self.clone()
        }
    }
}
