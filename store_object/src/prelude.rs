//! Convenience re-exports for common store-object usage

// Record stores and their results
pub use crate::store::{DeleteOutcome, RecordStore, RestoreOutcome};

// Entities and options
pub use crate::entity::{Entity, Record, Row};
pub use crate::options::DeleteOptions;

// Error types
pub use crate::errors::StoreError;

// Collaborators
pub use crate::associations::{AssociationCascader, Associations, DependentRecords, JoinTableCleanup};
pub use crate::executor::{MemoryExecutor, PgExecutor, PgTransactionExecutor, StatementExecutor};
pub use crate::rules::{RuleChecker, RuleSet, RulesChecker};
pub use crate::schema::{PgSchemaProvider, SchemaProvider, StaticSchema};

// Validation
pub use crate::validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

// Query building
pub use crate::query_builder::{FilterMode, FilteringQuery, QueryBuilder, QueryFilter, SortOrder};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde_json::{json, Value};
pub use sqlx::PgPool;
