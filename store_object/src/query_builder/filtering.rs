//! Active-filter query wrapper
//!
//! [`FilteringQuery`] wraps a [`QueryBuilder`] and appends
//! `<soft delete field> != false` to the caller's conditions whenever a read
//! statement is built. The predicate is added at build time, after every
//! chained modifier, so ordering, limits and custom selects cannot drop it.

use crate::query_builder::builder::{QueryBuilder, SortOrder};
use crate::query_builder::filter::QueryFilter;
use crate::query_builder::statement::{CountStatement, SelectStatement, Statement};
use crate::validation::{ValidatedFieldName, ValidatedTableName, ValidationError};
use serde_json::Value;

/// Whether a read hides soft-deleted rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Default: only rows whose soft-delete field is not false
    #[default]
    ActiveOnly,
    /// Explicit bypass for a single query
    WithInactive,
}

#[derive(Debug, Clone)]
pub struct FilteringQuery {
    table: ValidatedTableName,
    soft_delete_field: ValidatedFieldName,
    mode: FilterMode,
    inner: QueryBuilder,
}

impl FilteringQuery {
    /// Built by [`crate::RecordStore::query`], which resolves the column first
    pub(crate) fn new(table: ValidatedTableName, soft_delete_field: ValidatedFieldName) -> Self {
        Self::wrap(table, soft_delete_field, QueryBuilder::new())
    }

    /// Filter an already-built query
    pub(crate) fn wrap(
        table: ValidatedTableName,
        soft_delete_field: ValidatedFieldName,
        inner: QueryBuilder,
    ) -> Self {
        Self {
            table,
            soft_delete_field,
            mode: FilterMode::ActiveOnly,
            inner,
        }
    }

    /// Include soft-deleted rows in this query
    pub fn with_inactive(mut self) -> Self {
        self.mode = FilterMode::WithInactive;
        self
    }

    /// Only soft-deleted rows
    pub fn only_inactive(self) -> Self {
        let field = self.soft_delete_field.to_string();
        self.with_inactive().filter(QueryFilter::eq(&field, false))
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn table(&self) -> &ValidatedTableName {
        &self.table
    }

    pub fn soft_delete_field(&self) -> &ValidatedFieldName {
        &self.soft_delete_field
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.inner = self.inner.filter(filter);
        self
    }

    pub fn filters(mut self, filters: Vec<QueryFilter>) -> Self {
        self.inner = self.inner.filters(filters);
        self
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.inner = self.inner.select(fields);
        self
    }

    pub fn select_literal(mut self, value: i64, alias: &str) -> Self {
        self.inner = self.inner.select_literal(value, alias);
        self
    }

    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.inner = self.inner.order_by(field, order);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.inner = self.inner.limit(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.inner = self.inner.offset(offset);
        self
    }

    /// Every caller-supplied column, sort key and alias must be a plain identifier
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.to_select().validate()
    }

    /// The predicate injected in active-only mode
    pub fn active_filter(&self) -> QueryFilter {
        QueryFilter::ne(self.soft_delete_field.as_str(), Value::Bool(false))
    }

    /// Caller conditions, AND-combined with the active-filter unless bypassed
    pub fn conditions(&self) -> Vec<QueryFilter> {
        let mut conditions = self.inner.conditions.clone();
        if self.mode == FilterMode::ActiveOnly {
            conditions.push(self.active_filter());
        }
        conditions
    }

    pub fn to_select(&self) -> Statement {
        Statement::Select(SelectStatement {
            table: self.table.to_string(),
            fields: self.inner.select.clone(),
            conditions: self.conditions(),
            order_by: self.inner.order_by.clone(),
            limit: self.inner.limit,
            offset: self.inner.offset,
        })
    }

    /// First matching row only
    pub fn to_select_one(&self) -> Statement {
        self.clone().limit(1).to_select()
    }

    pub fn to_count(&self) -> Statement {
        Statement::Count(CountStatement {
            table: self.table.to_string(),
            conditions: self.conditions(),
        })
    }

    /// `SELECT 1 AS existing ... LIMIT 1`
    pub fn to_exists(&self) -> Statement {
        let mut probe = self.clone();
        probe.inner.select.clear();
        probe.select_literal(1, "existing").limit(1).to_select()
    }
}
