//! Reads
//!
//! Every read takes or builds a [`FilteringQuery`]; there is no way to hand
//! this store raw SQL.

use super::RecordStore;
use crate::entity::Row;
use crate::errors::StoreError;
use crate::query_builder::{FilteringQuery, QueryFilter};
use crate::trace_log;
use serde_json::Value;

impl RecordStore {
    pub async fn find(&self, query: FilteringQuery) -> Result<Vec<Row>, StoreError> {
        self.check_query(&query).await?;
        let statement = query.to_select();
        trace_log!("[FIND] {:?}", statement);
        self.executor.fetch_all(&statement).await
    }

    pub async fn find_one(&self, query: FilteringQuery) -> Result<Option<Row>, StoreError> {
        self.check_query(&query).await?;
        let rows = self.executor.fetch_all(&query.to_select_one()).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn count(&self, query: FilteringQuery) -> Result<u64, StoreError> {
        self.check_query(&query).await?;
        let total = self.executor.fetch_count(&query.to_count()).await?;
        Ok(total.max(0) as u64)
    }

    /// Active row by primary key values, in primary key order
    pub async fn get(&self, key: &[Value]) -> Result<Option<Row>, StoreError> {
        if key.len() != self.primary_key.len() {
            return Err(StoreError::invalid_argument(format!(
                "`{}` has {} primary key columns, got {} values",
                self.table,
                self.primary_key.len(),
                key.len()
            )));
        }

        let conditions = self
            .primary_key
            .iter()
            .zip(key)
            .map(|(column, value)| QueryFilter::eq(column.as_str(), value.clone()))
            .collect();

        self.find_one(self.query().await?.filters(conditions)).await
    }

    /// Whether any row matches `conditions`, active or not
    ///
    /// Soft-deleted rows still exist as identities, so this bypasses the
    /// active-filter.
    pub async fn exists(&self, conditions: Vec<QueryFilter>) -> Result<bool, StoreError> {
        let probe = self
            .query()
            .await?
            .with_inactive()
            .filters(conditions)
            .to_exists();
        probe.validate()?;

        Ok(!self.executor.fetch_all(&probe).await?.is_empty())
    }

    /// A query must target this table, filter on this store's soft-delete
    /// column and name only plain identifiers
    async fn check_query(&self, query: &FilteringQuery) -> Result<(), StoreError> {
        if query.table() != &self.table {
            return Err(StoreError::invalid_argument(format!(
                "Query on `{}` cannot run against the `{}` store",
                query.table(),
                self.table
            )));
        }

        let field = self.soft_delete_field().await?;
        if query.soft_delete_field() != &field {
            return Err(StoreError::invalid_argument(format!(
                "Query filters on `{}` but the `{}` store uses `{}`",
                query.soft_delete_field(),
                self.table,
                field
            )));
        }

        query.validate()?;
        Ok(())
    }
}
