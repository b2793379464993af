//! Association cascades
//!
//! When a record is soft-deleted its dependents go with it. Has-many children
//! are soft-deleted through their own [`RecordStore`]; many-to-many join rows
//! carry no state worth keeping and are physically removed.

use crate::entity::{Entity, Record};
use crate::errors::StoreError;
use crate::executor::StatementExecutor;
use crate::options::DeleteOptions;
use crate::query_builder::{DeleteStatement, QueryFilter, Statement};
use crate::store::RecordStore;
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use crate::debug_log;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait AssociationCascader: Send + Sync {
    async fn cascade_delete(
        &self,
        entity: &dyn Entity,
        options: &DeleteOptions,
    ) -> Result<(), StoreError>;
}

/// Ordered set of cascades run for every soft-delete of the owning store
#[derive(Default)]
pub struct Associations {
    cascades: Vec<Box<dyn AssociationCascader>>,
}

impl std::fmt::Debug for Associations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Associations")
            .field("cascades", &self.cascades.len())
            .finish()
    }
}

impl Associations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, cascade: impl AssociationCascader + 'static) -> Self {
        self.cascades.push(Box::new(cascade));
        self
    }

    pub fn len(&self) -> usize {
        self.cascades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cascades.is_empty()
    }
}

#[async_trait]
impl AssociationCascader for Associations {
    async fn cascade_delete(
        &self,
        entity: &dyn Entity,
        options: &DeleteOptions,
    ) -> Result<(), StoreError> {
        for cascade in &self.cascades {
            cascade.cascade_delete(entity, options).await?;
        }
        Ok(())
    }
}

/// Value of the parent's binding key, `None` when it is not loaded
fn binding_value(entity: &dyn Entity, binding_key: &str) -> Option<Value> {
    entity.get(binding_key).filter(|v| !v.is_null()).cloned()
}

/// Has-many: children whose `foreign_key` equals the parent's `binding_key`
pub struct DependentRecords {
    name: String,
    target: Arc<RecordStore>,
    foreign_key: ValidatedFieldName,
    binding_key: String,
    cascade_callbacks: bool,
}

impl DependentRecords {
    pub fn new(
        name: &str,
        target: Arc<RecordStore>,
        foreign_key: &str,
        binding_key: &str,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            name: name.to_string(),
            target,
            foreign_key: ValidatedFieldName::new(foreign_key)?,
            binding_key: binding_key.to_string(),
            cascade_callbacks: false,
        })
    }

    /// Soft-delete children one at a time so their own rules, events and
    /// cascades run
    pub fn cascade_callbacks(mut self, enabled: bool) -> Self {
        self.cascade_callbacks = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl AssociationCascader for DependentRecords {
    async fn cascade_delete(
        &self,
        entity: &dyn Entity,
        options: &DeleteOptions,
    ) -> Result<(), StoreError> {
        let Some(value) = binding_value(entity, &self.binding_key) else {
            debug_log!("[CASCADE] {} skipped: `{}` not loaded", self.name, self.binding_key);
            return Ok(());
        };
        let condition = QueryFilter::eq(self.foreign_key.as_str(), value);

        if !self.cascade_callbacks {
            let rows = self.target.bulk_soft_delete(vec![condition]).await?;
            tracing::debug!(association = %self.name, rows, "Cascaded soft delete");
            return Ok(());
        }

        let children = self.target.find(self.target.query().await?.filter(condition)).await?;
        let child_options = options.dependent();
        for row in children {
            let mut child = Record::persisted(row);
            self.target.soft_delete(&mut child, &child_options).await?;
        }
        Ok(())
    }
}

/// Many-to-many: join rows whose `foreign_key` equals the parent's `binding_key`
pub struct JoinTableCleanup {
    join_table: ValidatedTableName,
    foreign_key: ValidatedFieldName,
    binding_key: String,
    executor: Arc<dyn StatementExecutor>,
}

impl JoinTableCleanup {
    pub fn new(
        join_table: &str,
        foreign_key: &str,
        binding_key: &str,
        executor: Arc<dyn StatementExecutor>,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            join_table: ValidatedTableName::new(join_table)?,
            foreign_key: ValidatedFieldName::new(foreign_key)?,
            binding_key: binding_key.to_string(),
            executor,
        })
    }
}

#[async_trait]
impl AssociationCascader for JoinTableCleanup {
    async fn cascade_delete(
        &self,
        entity: &dyn Entity,
        _options: &DeleteOptions,
    ) -> Result<(), StoreError> {
        let Some(value) = binding_value(entity, &self.binding_key) else {
            return Ok(());
        };

        let statement: Statement = DeleteStatement::new(&self.join_table)
            .filters(vec![QueryFilter::eq(self.foreign_key.as_str(), value)])
            .into();
        let rows = self.executor.execute(&statement).await?;
        tracing::debug!(join_table = %self.join_table, rows, "Removed join rows");
        Ok(())
    }
}
