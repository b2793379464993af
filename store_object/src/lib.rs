//! Store Object - soft-delete data access layer for SoftHaus
//!
//! This crate provides record stores whose deletes flip an "active" column
//! instead of removing rows, and a query builder that hides inactive rows from
//! every read unless the caller asks for them.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod associations;
pub mod entity;
pub mod errors;
pub mod executor;
pub mod options;
pub mod prelude;
pub mod query_builder;
pub mod rules;
pub mod schema;
pub mod store;
pub mod validation;

pub use associations::{AssociationCascader, Associations, DependentRecords, JoinTableCleanup};
pub use entity::{is_truthy, Entity, Record, Row};
pub use errors::StoreError;
pub use executor::{MemoryExecutor, PgExecutor, PgTransactionExecutor, StatementExecutor};
pub use options::DeleteOptions;
pub use query_builder::{
    FilterMode, FilteringQuery, QueryBuilder, QueryFilter, QueryOperator, SortOrder, Statement,
};
pub use rules::{AllowAll, RuleChecker, RuleSet, RulesChecker};
pub use schema::{PgSchemaProvider, SchemaProvider, StaticSchema};
pub use store::{DeleteOutcome, RecordStore, RestoreOutcome};
pub use validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

use sqlx::PgPool;

pub type DbPool = PgPool;
