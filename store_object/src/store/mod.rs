//! Record stores
//!
//! A [`RecordStore`] owns the soft-delete lifecycle of one table: soft delete,
//! hard delete, restore and their bulk forms, plus every read of that table.
//! Reads are only ever built through [`FilteringQuery`], so inactive rows stay
//! hidden unless a caller asks for them.
//!
//! Collaborators are injected as trait objects:
//!
//! - [`StatementExecutor`] runs the statements the store builds
//! - [`SchemaProvider`] confirms the soft-delete column exists
//! - [`EventDispatcher`] receives `Model.beforeDelete` / `Model.afterDelete`
//! - [`RuleChecker`] runs the delete rule set
//! - [`AssociationCascader`] removes dependents
//!
//! Statements within one operation run one after another on the store's
//! executor. Nothing here opens a transaction; hand the store a
//! [`crate::PgTransactionExecutor`] through [`RecordStore::with_executor`] when
//! a hard delete must be atomic.

mod lifecycle;
mod outcome;
mod reads;

#[cfg(test)]
mod tests;

pub use outcome::{DeleteOutcome, RestoreOutcome};

use crate::associations::AssociationCascader;
use crate::entity::Entity;
use crate::errors::StoreError;
use crate::executor::StatementExecutor;
use crate::query_builder::{FilteringQuery, QueryFilter};
use crate::rules::RuleChecker;
use crate::schema::SchemaProvider;
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use config::SoftDeleteConfig;
use serde_json::Value;
use signal_system::EventDispatcher;
use std::sync::Arc;

#[derive(Clone)]
pub struct RecordStore {
    pub(crate) table: ValidatedTableName,
    pub(crate) primary_key: Vec<ValidatedFieldName>,
    pub(crate) settings: SoftDeleteConfig,
    pub(crate) executor: Arc<dyn StatementExecutor>,
    pub(crate) schema: Arc<dyn SchemaProvider>,
    pub(crate) events: Option<Arc<dyn EventDispatcher>>,
    pub(crate) rules: Option<Arc<dyn RuleChecker>>,
    pub(crate) associations: Option<Arc<dyn AssociationCascader>>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("settings", &self.settings)
            .field("has_events", &self.events.is_some())
            .field("has_rules", &self.rules.is_some())
            .field("has_associations", &self.associations.is_some())
            .finish()
    }
}

impl RecordStore {
    pub fn new(
        table: &str,
        primary_key: &[&str],
        executor: Arc<dyn StatementExecutor>,
        schema: Arc<dyn SchemaProvider>,
    ) -> Result<Self, StoreError> {
        if primary_key.is_empty() {
            return Err(StoreError::invalid_argument(format!(
                "Table `{}` needs at least one primary key column",
                table
            )));
        }

        Ok(Self {
            table: ValidatedTableName::new(table)?,
            primary_key: primary_key
                .iter()
                .map(|field| ValidatedFieldName::new(field))
                .collect::<Result<_, _>>()?,
            settings: SoftDeleteConfig::default(),
            executor,
            schema,
            events: None,
            rules: None,
            associations: None,
        })
    }

    /// Apply soft-delete settings (column name, bulk guard, restore behaviour)
    pub fn with_config(mut self, settings: &SoftDeleteConfig) -> Self {
        self.settings = settings.clone();
        self
    }

    /// Use a different soft-delete column, e.g. `is_enabled`
    pub fn with_field(mut self, field: &str) -> Self {
        self.settings.field = field.to_string();
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventDispatcher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_rules(mut self, rules: Arc<dyn RuleChecker>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_associations(mut self, associations: Arc<dyn AssociationCascader>) -> Self {
        self.associations = Some(associations);
        self
    }

    /// Same store, statements routed through another executor
    ///
    /// Association cascades keep the executors they were built with.
    pub fn with_executor(&self, executor: Arc<dyn StatementExecutor>) -> Self {
        Self {
            executor,
            ..self.clone()
        }
    }

    pub fn table(&self) -> &ValidatedTableName {
        &self.table
    }

    pub fn primary_key(&self) -> &[ValidatedFieldName] {
        &self.primary_key
    }

    pub fn settings(&self) -> &SoftDeleteConfig {
        &self.settings
    }

    /// Resolve the configured soft-delete column against the table schema
    ///
    /// Fails with [`StoreError::MissingColumn`] when the table has no such
    /// column. Every other operation resolves the field through here first.
    pub async fn soft_delete_field(&self) -> Result<ValidatedFieldName, StoreError> {
        let field = ValidatedFieldName::new(&self.settings.field)?;

        if !self
            .schema
            .column_exists(self.table.as_str(), field.as_str())
            .await?
        {
            return Err(StoreError::missing_column(
                field.as_str(),
                self.table.as_str(),
            ));
        }

        Ok(field)
    }

    /// A read of this table with the active-filter applied
    pub async fn query(&self) -> Result<FilteringQuery, StoreError> {
        let field = self.soft_delete_field().await?;
        Ok(FilteringQuery::new(self.table.clone(), field))
    }

    /// Equality conditions on every primary key column of `entity`
    pub(crate) fn primary_key_filters(
        &self,
        entity: &dyn Entity,
    ) -> Result<Vec<QueryFilter>, StoreError> {
        let columns: Vec<&str> = self.primary_key.iter().map(|pk| pk.as_str()).collect();
        if !entity.has_all(&columns) {
            return Err(StoreError::invalid_argument(format!(
                "All primary key values ({}) are required to change a `{}` record",
                columns.join(", "),
                self.table
            )));
        }

        Ok(columns
            .iter()
            .filter_map(|column| {
                entity
                    .get(column)
                    .map(|value| QueryFilter::eq(column, value.clone()))
            })
            .collect())
    }

    /// Primary key rendered for event payloads and logs, `1` or `7,1`
    pub(crate) fn record_id(&self, entity: &dyn Entity) -> String {
        self.primary_key
            .iter()
            .map(|pk| match entity.get(pk.as_str()) {
                Some(Value::String(s)) => s.clone(),
                Some(value) => value.to_string(),
                None => String::new(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}
