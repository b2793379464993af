//! Soft delete, hard delete and restore

use super::{DeleteOutcome, RecordStore, RestoreOutcome};
use crate::entity::{is_truthy, Entity};
use crate::errors::StoreError;
use crate::options::DeleteOptions;
use crate::query_builder::{DeleteStatement, QueryFilter, Statement, UpdateStatement};
use crate::rules::RuleSet;
use crate::debug_log;
use serde_json::Value;
use signal_system::{DatabaseEvent, EventResult, EventType};

impl RecordStore {
    /// Soft delete `entity`, returning whether the delete took effect
    ///
    /// Returns `false` for unpersisted entities, failed delete rules, zero
    /// matched rows, or a before-delete handler stopping with a falsy result.
    /// Fails when a primary key value is missing or the soft-delete column
    /// does not exist.
    pub async fn soft_delete(
        &self,
        entity: &mut dyn Entity,
        options: &DeleteOptions,
    ) -> Result<bool, StoreError> {
        Ok(self.soft_delete_detailed(entity, options).await?.succeeded())
    }

    pub async fn soft_delete_detailed(
        &self,
        entity: &mut dyn Entity,
        options: &DeleteOptions,
    ) -> Result<DeleteOutcome, StoreError> {
        if entity.is_new() {
            return Ok(DeleteOutcome::NotPersisted);
        }

        let conditions = self.primary_key_filters(entity)?;
        let field = self.soft_delete_field().await?;

        if options.check_rules {
            if let Some(rules) = &self.rules {
                if !rules.check(entity, RuleSet::Delete, options).await? {
                    debug_log!("[SOFT_DELETE] {} rejected by delete rules", self.table);
                    return Ok(DeleteOutcome::RulesFailed);
                }
            }
        }

        if let EventResult::Stop(result) = self
            .dispatch(EventType::BeforeDelete, entity, options)
            .await?
        {
            debug_log!("[SOFT_DELETE] {} stopped by handler: {}", self.table, result);
            return Ok(DeleteOutcome::Vetoed(is_truthy(&result)));
        }

        if let Some(associations) = &self.associations {
            associations
                .cascade_delete(entity, &options.dependent())
                .await?;
        }

        // Absent means unknown state, so only a loaded falsy value skips the write
        let already_inactive = entity
            .get(field.as_str())
            .is_some_and(|value| !is_truthy(value));

        let outcome = if already_inactive {
            DeleteOutcome::AlreadyInactive
        } else {
            let statement: Statement = UpdateStatement::new(&self.table)
                .set(field.as_str(), false)
                .filters(conditions)
                .into();
            let rows = self.executor.execute(&statement).await?;

            if rows == 0 {
                tracing::warn!(
                    table = %self.table,
                    record_id = %self.record_id(entity),
                    "Soft delete matched no rows"
                );
                return Ok(DeleteOutcome::NoRowsAffected);
            }

            entity.set(field.as_str(), Value::Bool(false));
            DeleteOutcome::Updated { rows }
        };

        if let Err(e) = self.dispatch(EventType::AfterDelete, entity, options).await {
            tracing::warn!(
                table = %self.table,
                record_id = %self.record_id(entity),
                error = %e,
                "After-delete handler failed"
            );
            return Err(e);
        }

        Ok(outcome)
    }

    /// Soft delete, then physically remove the row
    ///
    /// The two statements are not atomic on their own; run the store on a
    /// [`crate::PgTransactionExecutor`] when they must be.
    pub async fn hard_delete(
        &self,
        entity: &mut dyn Entity,
        options: &DeleteOptions,
    ) -> Result<bool, StoreError> {
        if !self.soft_delete(entity, options).await? {
            return Ok(false);
        }

        let statement: Statement = DeleteStatement::new(&self.table)
            .filters(self.primary_key_filters(entity)?)
            .into();
        let rows = self.executor.execute(&statement).await?;
        debug_log!("[HARD_DELETE] {} removed {} rows", self.table, rows);

        Ok(rows > 0)
    }

    /// Set the soft-delete field back to true
    pub async fn restore(&self, entity: &mut dyn Entity) -> Result<bool, StoreError> {
        Ok(self.restore_detailed(entity).await?.succeeded())
    }

    pub async fn restore_detailed(
        &self,
        entity: &mut dyn Entity,
    ) -> Result<RestoreOutcome, StoreError> {
        let conditions = self.primary_key_filters(entity)?;
        let field = self.soft_delete_field().await?;

        let statement: Statement = UpdateStatement::new(&self.table)
            .set(field.as_str(), true)
            .filters(conditions)
            .into();
        let rows = self.executor.execute(&statement).await?;

        if rows > 0 || self.settings.restore_mutates_on_failure {
            entity.set(field.as_str(), Value::Bool(true));
        }
        if rows == 0 {
            tracing::warn!(
                table = %self.table,
                record_id = %self.record_id(entity),
                "Restore matched no rows"
            );
        }

        Ok(RestoreOutcome {
            rows_affected: rows,
        })
    }

    /// Soft delete every row matching `conditions`
    ///
    /// No rules, events or cascades run. With `bulk_active_only` (the
    /// default) rows that are already inactive are left alone and not
    /// counted.
    pub async fn bulk_soft_delete(&self, conditions: Vec<QueryFilter>) -> Result<u64, StoreError> {
        let field = self.soft_delete_field().await?;

        let mut conditions = conditions;
        if self.settings.bulk_active_only {
            conditions.push(QueryFilter::ne(field.as_str(), false));
        }

        let statement: Statement = UpdateStatement::new(&self.table)
            .set(field.as_str(), false)
            .filters(conditions)
            .into();
        statement.validate()?;
        self.executor.execute(&statement).await
    }

    /// Restore every row matching `conditions`
    pub async fn bulk_restore(&self, conditions: Vec<QueryFilter>) -> Result<u64, StoreError> {
        let field = self.soft_delete_field().await?;

        let mut conditions = conditions;
        if self.settings.bulk_active_only {
            conditions.push(QueryFilter::eq(field.as_str(), false));
        }

        let statement: Statement = UpdateStatement::new(&self.table)
            .set(field.as_str(), true)
            .filters(conditions)
            .into();
        statement.validate()?;
        self.executor.execute(&statement).await
    }

    /// Physically remove soft-deleted rows matching `conditions`
    pub async fn purge_inactive(&self, conditions: Vec<QueryFilter>) -> Result<u64, StoreError> {
        let field = self.soft_delete_field().await?;

        let mut conditions = conditions;
        conditions.push(QueryFilter::eq(field.as_str(), false));

        let statement: Statement = DeleteStatement::new(&self.table)
            .filters(conditions)
            .into();
        statement.validate()?;
        let rows = self.executor.execute(&statement).await?;
        tracing::info!(table = %self.table, rows, "Purged inactive rows");
        Ok(rows)
    }

    async fn dispatch(
        &self,
        event_type: EventType,
        entity: &dyn Entity,
        options: &DeleteOptions,
    ) -> Result<EventResult, StoreError> {
        let Some(events) = &self.events else {
            return Ok(EventResult::Continue);
        };

        let event = DatabaseEvent::new(event_type, self.table.to_string())
            .with_record_id(self.record_id(entity))
            .with_payload("entity", entity.to_payload())
            .with_payload("options", serde_json::to_value(options)?);

        Ok(events.dispatch(event).await?)
    }
}
