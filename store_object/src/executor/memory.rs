//! In-process executor
//!
//! Evaluates statements against tables held in memory. Row counts follow
//! PostgreSQL: an UPDATE reports every row its WHERE clause matched, whether
//! or not the value changed. Every statement is recorded so tests can assert
//! what was (or was not) issued.

use super::StatementExecutor;
use crate::entity::{is_truthy, Row};
use crate::errors::StoreError;
use crate::query_builder::{
    LogicalOperator, QueryCondition, QueryFilter, QueryOperator, SelectField, SortOrder, Statement,
};
use crate::schema::SchemaProvider;
use crate::trace_log;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: RwLock<HashMap<String, MemoryTable>>,
    history: RwLock<Vec<Statement>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a table with the given columns
    pub fn create_table(&self, table: &str, columns: &[&str]) {
        if let Ok(mut tables) = self.tables.write() {
            tables.insert(
                table.to_string(),
                MemoryTable {
                    columns: columns.iter().map(|c| c.to_string()).collect(),
                    rows: Vec::new(),
                },
            );
        }
    }

    /// Insert a row; columns the table does not declare are rejected
    pub fn insert(&self, table: &str, row: Row) -> Result<(), StoreError> {
        let mut tables = self.write_tables()?;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| Self::unknown_table(table))?;
        if let Some(column) = row.keys().find(|k| !target.columns.contains(k)) {
            return Err(Self::unknown_column(table, column));
        }
        target.rows.push(row);
        Ok(())
    }

    /// Snapshot of every row in a table, ignoring soft-delete state
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table).map(|t| t.rows.clone()))
            .unwrap_or_default()
    }

    /// Statements executed so far, oldest first
    pub fn history(&self) -> Vec<Statement> {
        self.history.read().map(|h| h.clone()).unwrap_or_default()
    }

    /// Number of executed statements with the given operation name
    pub fn count_operations(&self, operation: &str) -> usize {
        self.history
            .read()
            .map(|h| h.iter().filter(|s| s.operation() == operation).count())
            .unwrap_or(0)
    }

    pub fn clear_history(&self) {
        if let Ok(mut history) = self.history.write() {
            history.clear();
        }
    }

    fn record(&self, statement: &Statement) {
        trace_log!("[MEMORY] {}", statement.to_sql().0);
        if let Ok(mut history) = self.history.write() {
            history.push(statement.clone());
        }
    }

    fn write_tables(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, MemoryTable>>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Transaction("memory tables lock poisoned".to_string()))
    }

    fn read_tables(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, MemoryTable>>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Transaction("memory tables lock poisoned".to_string()))
    }

    fn unknown_table(table: &str) -> StoreError {
        StoreError::invalid_argument(format!("relation \"{}\" does not exist", table))
    }

    fn unknown_column(table: &str, column: &str) -> StoreError {
        StoreError::invalid_argument(format!(
            "column \"{}\" of relation \"{}\" does not exist",
            column, table
        ))
    }
}

#[async_trait]
impl StatementExecutor for MemoryExecutor {
    async fn execute(&self, statement: &Statement) -> Result<u64, StoreError> {
        statement.validate()?;
        self.record(statement);
        let mut tables = self.write_tables()?;
        let table = tables
            .get_mut(statement.table())
            .ok_or_else(|| Self::unknown_table(statement.table()))?;

        match statement {
            Statement::Update(update) => {
                if let Some((column, _)) = update
                    .assignments()
                    .iter()
                    .find(|(column, _)| !table.columns.contains(column))
                {
                    return Err(Self::unknown_column(statement.table(), column));
                }

                let mut matched = 0;
                for row in table.rows.iter_mut() {
                    if matches_all(statement.conditions(), row) {
                        for (column, value) in update.assignments() {
                            row.insert(column.clone(), value.clone());
                        }
                        matched += 1;
                    }
                }
                Ok(matched)
            }
            Statement::Delete(_) => {
                let before = table.rows.len();
                table
                    .rows
                    .retain(|row| !matches_all(statement.conditions(), row));
                Ok((before - table.rows.len()) as u64)
            }
            _ => Err(StoreError::invalid_argument(format!(
                "{} statements must be fetched, not executed",
                statement.operation()
            ))),
        }
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>, StoreError> {
        statement.validate()?;
        self.record(statement);
        let Statement::Select(select) = statement else {
            return Err(StoreError::invalid_argument(format!(
                "{} statements cannot be fetched as rows",
                statement.operation()
            )));
        };

        let tables = self.read_tables()?;
        let table = tables
            .get(statement.table())
            .ok_or_else(|| Self::unknown_table(statement.table()))?;

        let mut rows: Vec<&Row> = table
            .rows
            .iter()
            .filter(|row| matches_all(statement.conditions(), row))
            .collect();

        rows.sort_by(|a, b| {
            select
                .order_by()
                .iter()
                .map(|(field, order)| {
                    let ordering = compare_values(field_value(a, field), field_value(b, field))
                        .unwrap_or(Ordering::Equal);
                    match order {
                        SortOrder::Asc => ordering,
                        SortOrder::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let offset = select.offset().unwrap_or(0).max(0) as usize;
        let limit = select
            .limit()
            .map(|l| l.max(0) as usize)
            .unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, select.fields()))
            .collect())
    }

    async fn fetch_count(&self, statement: &Statement) -> Result<i64, StoreError> {
        statement.validate()?;
        self.record(statement);
        if !matches!(statement, Statement::Count(_)) {
            return Err(StoreError::invalid_argument(format!(
                "{} statements cannot be counted",
                statement.operation()
            )));
        }

        let tables = self.read_tables()?;
        let table = tables
            .get(statement.table())
            .ok_or_else(|| Self::unknown_table(statement.table()))?;

        Ok(table
            .rows
            .iter()
            .filter(|row| matches_all(statement.conditions(), row))
            .count() as i64)
    }
}

#[async_trait]
impl SchemaProvider for MemoryExecutor {
    async fn column_exists(&self, table: &str, field: &str) -> anyhow::Result<bool> {
        let tables = self
            .tables
            .read()
            .map_err(|_| anyhow::anyhow!("memory tables lock poisoned"))?;
        Ok(tables
            .get(table)
            .is_some_and(|t| t.columns.iter().any(|c| c == field)))
    }
}

fn field_value<'a>(row: &'a Row, field: &str) -> &'a Value {
    row.get(field).unwrap_or(&Value::Null)
}

fn project(row: &Row, fields: &[SelectField]) -> Row {
    if fields.is_empty() {
        return row.clone();
    }

    fields
        .iter()
        .map(|field| match field {
            SelectField::Field(name) => (name.clone(), field_value(row, name).clone()),
            SelectField::Literal { value, alias } => (alias.clone(), Value::from(*value)),
        })
        .collect()
}

fn matches_all(conditions: &[QueryFilter], row: &Row) -> bool {
    conditions.iter().all(|filter| matches_filter(filter, row))
}

fn matches_filter(filter: &QueryFilter, row: &Row) -> bool {
    match filter {
        QueryFilter::Condition(condition) => matches_condition(condition, row),
        QueryFilter::Group { operator, filters } => match operator {
            LogicalOperator::And => filters.iter().all(|f| matches_filter(f, row)),
            LogicalOperator::Or => filters.iter().any(|f| matches_filter(f, row)),
        },
    }
}

/// SQL semantics: any comparison involving NULL is not a match
fn matches_condition(condition: &QueryCondition, row: &Row) -> bool {
    let actual = field_value(row, &condition.field);

    match (&condition.operator, &condition.value) {
        (QueryOperator::IsNull, _) | (QueryOperator::Eq, None) => actual.is_null(),
        (QueryOperator::IsNotNull, _) | (QueryOperator::Ne, None) => !actual.is_null(),
        // Rendered as constants, so NULL never enters the comparison
        (QueryOperator::In, Some(Value::Array(items))) if items.is_empty() => false,
        (QueryOperator::NotIn, Some(Value::Array(items))) if items.is_empty() => true,
        (_, Some(expected)) if actual.is_null() || expected.is_null() => false,
        (QueryOperator::Eq, Some(expected)) => loose_eq(actual, expected),
        (QueryOperator::Ne, Some(expected)) => !loose_eq(actual, expected),
        (QueryOperator::Gt, Some(expected)) => {
            compare_values(actual, expected) == Some(Ordering::Greater)
        }
        (QueryOperator::Gte, Some(expected)) => matches!(
            compare_values(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        (QueryOperator::Lt, Some(expected)) => {
            compare_values(actual, expected) == Some(Ordering::Less)
        }
        (QueryOperator::Lte, Some(expected)) => matches!(
            compare_values(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        (QueryOperator::Like, Some(Value::String(pattern))) => actual
            .as_str()
            .is_some_and(|text| like_match(text, pattern)),
        (QueryOperator::ILike, Some(Value::String(pattern))) => actual.as_str().is_some_and(
            |text| like_match(&text.to_lowercase(), &pattern.to_lowercase()),
        ),
        (QueryOperator::In, Some(Value::Array(items))) => {
            items.iter().any(|item| loose_eq(actual, item))
        }
        (QueryOperator::NotIn, Some(Value::Array(items))) => {
            !items.iter().any(|item| loose_eq(actual, item))
        }
        (QueryOperator::NotIn, None) => true,
        _ => false,
    }
}

/// Booleans compare by truthiness so `0`/`1` flags match `false`/`true`
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(_), _) | (_, Value::Bool(_)) => is_truthy(a) == is_truthy(b),
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        // NULLS LAST, as PostgreSQL sorts ascending
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Greater),
        (_, Value::Null) => Some(Ordering::Less),
        _ => None,
    }
}

/// `%` matches any run of characters, `_` exactly one
fn like_match(text: &str, pattern: &str) -> bool {
    fn matches(text: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => text.is_empty(),
            Some(('%', rest)) => (0..=text.len()).any(|skip| matches(&text[skip..], rest)),
            Some(('_', rest)) => !text.is_empty() && matches(&text[1..], rest),
            Some((c, rest)) => text.first() == Some(c) && matches(&text[1..], rest),
        }
    }

    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    matches(&text, &pattern)
}
