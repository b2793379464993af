//! SQL text generation
//!
//! Placeholders are numbered `$1..$n` in the order values are returned.

use crate::query_builder::builder::{SelectField, SortOrder};
use crate::query_builder::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query_builder::statement::Statement;
use serde_json::Value;

pub struct SqlGenerator;

impl SqlGenerator {
    /// Render a complete statement and its bound values
    pub fn build_statement(statement: &Statement) -> (String, Vec<Value>) {
        match statement {
            Statement::Select(select) => {
                let (where_clause, values) = Self::build_where_clause(&select.conditions, 1);
                let sql = Self::join_parts(&[
                    format!(
                        "SELECT {} FROM {}",
                        Self::build_select_clause(&select.fields),
                        select.table
                    ),
                    where_clause,
                    Self::build_order_clause(&select.order_by),
                    Self::build_limit_clause(select.limit, select.offset),
                ]);
                (sql, values)
            }
            Statement::Count(count) => {
                let (where_clause, values) = Self::build_where_clause(&count.conditions, 1);
                let sql = Self::join_parts(&[
                    format!("SELECT COUNT(*) AS total FROM {}", count.table),
                    where_clause,
                ]);
                (sql, values)
            }
            Statement::Update(update) => {
                let mut values = Vec::with_capacity(update.assignments.len());
                let assignments = update
                    .assignments
                    .iter()
                    .enumerate()
                    .map(|(i, (field, value))| {
                        values.push(value.clone());
                        format!("{} = ${}", field, i + 1)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");

                let (where_clause, where_values) =
                    Self::build_where_clause(&update.conditions, values.len() + 1);
                values.extend(where_values);

                let sql = Self::join_parts(&[
                    format!("UPDATE {} SET {}", update.table, assignments),
                    where_clause,
                ]);
                (sql, values)
            }
            Statement::Delete(delete) => {
                let (where_clause, values) = Self::build_where_clause(&delete.conditions, 1);
                let sql = Self::join_parts(&[format!("DELETE FROM {}", delete.table), where_clause]);
                (sql, values)
            }
        }
    }

    /// Build WHERE clause from conditions, numbering placeholders from `first_param`
    pub fn build_where_clause(conditions: &[QueryFilter], first_param: usize) -> (String, Vec<Value>) {
        if conditions.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut values = Vec::new();
        let mut param_counter = first_param;

        // Groups render their own parentheses; bare conditions get them once
        // there is more than one, so every top-level term stays AND-ed
        let wrap = conditions.len() > 1;
        let conditions_sql = conditions
            .iter()
            .map(|condition| {
                let sql = Self::build_condition_sql(condition, &mut values, &mut param_counter);
                match condition {
                    QueryFilter::Condition(_) if wrap => format!("({})", sql),
                    _ => sql,
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        (format!("WHERE {}", conditions_sql), values)
    }

    fn build_condition_sql(
        filter: &QueryFilter,
        values: &mut Vec<Value>,
        param_counter: &mut usize,
    ) -> String {
        match filter {
            QueryFilter::Condition(condition) => {
                Self::build_single_condition_sql(condition, values, param_counter)
            }
            QueryFilter::Group { operator, filters } => {
                if filters.is_empty() {
                    return match operator {
                        LogicalOperator::And => "1=1".to_string(),
                        LogicalOperator::Or => "1=0".to_string(),
                    };
                }

                let operator_str = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                };

                let group_conditions = filters
                    .iter()
                    .map(|f| Self::build_condition_sql(f, values, param_counter))
                    .collect::<Vec<_>>()
                    .join(operator_str);

                format!("({})", group_conditions)
            }
        }
    }

    fn next_param(value: &Value, values: &mut Vec<Value>, param_counter: &mut usize) -> String {
        values.push(value.clone());
        let param = format!("${}", param_counter);
        *param_counter += 1;
        param
    }

    fn build_single_condition_sql(
        condition: &QueryCondition,
        values: &mut Vec<Value>,
        param_counter: &mut usize,
    ) -> String {
        let field = &condition.field;

        match (&condition.operator, &condition.value) {
            (QueryOperator::Eq, None) | (QueryOperator::IsNull, _) => format!("{} IS NULL", field),
            (QueryOperator::Ne, None) | (QueryOperator::IsNotNull, _) => {
                format!("{} IS NOT NULL", field)
            }
            (QueryOperator::In, Some(Value::Array(items)))
            | (QueryOperator::NotIn, Some(Value::Array(items))) => {
                let negated = condition.operator == QueryOperator::NotIn;
                if items.is_empty() {
                    // IN () is not valid SQL
                    return if negated { "1=1" } else { "1=0" }.to_string();
                }
                let placeholders = items
                    .iter()
                    .map(|item| Self::next_param(item, values, param_counter))
                    .collect::<Vec<_>>()
                    .join(", ");
                let keyword = if negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", field, keyword, placeholders)
            }
            (QueryOperator::In, _) => "1=0".to_string(),
            (QueryOperator::NotIn, _) => "1=1".to_string(),
            (operator, Some(value)) => match operator.comparison_sql() {
                Some(op) => format!(
                    "{} {} {}",
                    field,
                    op,
                    Self::next_param(value, values, param_counter)
                ),
                None => "1=0".to_string(),
            },
            (_, None) => "1=0".to_string(), // comparison without a value
        }
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(order_by: &[(String, SortOrder)]) -> String {
        if order_by.is_empty() {
            return String::new();
        }

        let order_items: Vec<String> = order_by
            .iter()
            .map(|(field, order)| format!("{} {}", field, order.to_sql()))
            .collect();

        format!("ORDER BY {}", order_items.join(", "))
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(limit: Option<i64>, offset: Option<i64>) -> String {
        let mut clauses = Vec::new();

        if let Some(limit) = limit {
            clauses.push(format!("LIMIT {}", limit));
        }

        if let Some(offset) = offset {
            clauses.push(format!("OFFSET {}", offset));
        }

        clauses.join(" ")
    }

    /// Build SELECT column list
    pub fn build_select_clause(fields: &[SelectField]) -> String {
        if fields.is_empty() {
            return "*".to_string();
        }

        fields
            .iter()
            .map(|field| match field {
                SelectField::Field(name) => name.clone(),
                SelectField::Literal { value, alias } => format!("{} AS {}", value, alias),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn join_parts(parts: &[String]) -> String {
        parts
            .iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
