//! Query builder
//!
//! The unfiltered base builder. Record stores never read through it directly;
//! reads are wrapped in [`crate::query_builder::FilteringQuery`].

use crate::query_builder::filter::QueryFilter;
use crate::query_builder::sql_generation::SqlGenerator;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Column list of a SELECT
#[derive(Debug, Clone, PartialEq)]
pub enum SelectField {
    Field(String),
    /// A constant integer under an alias, e.g. `1 AS existing`
    Literal { value: i64, alias: String },
}

/// Query builder for constructing WHERE / ORDER BY / LIMIT parts
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    pub(crate) conditions: Vec<QueryFilter>,
    pub(crate) select: Vec<SelectField>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.conditions.push(filter);
        self
    }

    /// Add multiple filters (combined with AND)
    pub fn filters(mut self, filters: Vec<QueryFilter>) -> Self {
        self.conditions.extend(filters);
        self
    }

    /// Restrict the selected columns
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select
            .extend(fields.iter().map(|f| SelectField::Field(f.to_string())));
        self
    }

    /// Select a constant under an alias
    pub fn select_literal(mut self, value: i64, alias: &str) -> Self {
        self.select.push(SelectField::Literal {
            value,
            alias: alias.to_string(),
        });
        self
    }

    /// Add ordering
    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by.push((field.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn conditions(&self) -> &[QueryFilter] {
        &self.conditions
    }

    /// Build WHERE clause
    pub fn build_where_clause(&self) -> (String, Vec<Value>) {
        SqlGenerator::build_where_clause(&self.conditions, 1)
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(&self) -> String {
        SqlGenerator::build_order_clause(&self.order_by)
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(&self) -> String {
        SqlGenerator::build_limit_clause(self.limit, self.offset)
    }
}
