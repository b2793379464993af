//! Statements handed to a [`crate::executor::StatementExecutor`]
//!
//! Reads (`Select`, `Count`) can only be built by
//! [`crate::query_builder::FilteringQuery`], so they always carry the
//! active-filter unless the query was explicitly built in with-inactive mode.

use crate::query_builder::builder::{SelectField, SortOrder};
use crate::query_builder::filter::QueryFilter;
use crate::query_builder::sql_generation::SqlGenerator;
use crate::validation::{ValidatedFieldName, ValidatedTableName, ValidationError};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Count(CountStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    /// Render SQL text and the values bound to its placeholders
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        SqlGenerator::build_statement(self)
    }

    pub fn table(&self) -> &str {
        match self {
            Statement::Select(s) => &s.table,
            Statement::Count(s) => &s.table,
            Statement::Update(s) => &s.table,
            Statement::Delete(s) => &s.table,
        }
    }

    pub fn conditions(&self) -> &[QueryFilter] {
        match self {
            Statement::Select(s) => &s.conditions,
            Statement::Count(s) => &s.conditions,
            Statement::Update(s) => &s.conditions,
            Statement::Delete(s) => &s.conditions,
        }
    }

    /// Check every name that ends up in SQL text: table, condition columns,
    /// selected columns and aliases, sort columns and assigned columns
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidatedTableName::new(self.table())?;
        self.conditions().iter().try_for_each(QueryFilter::validate)?;

        match self {
            Statement::Select(select) => {
                for field in &select.fields {
                    match field {
                        SelectField::Field(name) => ValidatedFieldName::new(name)?,
                        SelectField::Literal { alias, .. } => ValidatedFieldName::new(alias)?,
                    };
                }
                for (field, _) in &select.order_by {
                    ValidatedFieldName::new(field)?;
                }
            }
            Statement::Update(update) => {
                for (field, _) in &update.assignments {
                    ValidatedFieldName::new(field)?;
                }
            }
            Statement::Count(_) | Statement::Delete(_) => {}
        }
        Ok(())
    }

    /// Short operation name used in logs and errors
    pub fn operation(&self) -> &'static str {
        match self {
            Statement::Select(_) => "select",
            Statement::Count(_) => "count",
            Statement::Update(_) => "update",
            Statement::Delete(_) => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub(crate) table: String,
    pub(crate) fields: Vec<SelectField>,
    pub(crate) conditions: Vec<QueryFilter>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl SelectStatement {
    pub fn fields(&self) -> &[SelectField] {
        &self.fields
    }

    pub fn order_by(&self) -> &[(String, SortOrder)] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountStatement {
    pub(crate) table: String,
    pub(crate) conditions: Vec<QueryFilter>,
}

/// `UPDATE <table> SET <field> = <value>, ... WHERE <conditions>`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub(crate) table: String,
    pub(crate) assignments: Vec<(String, Value)>,
    pub(crate) conditions: Vec<QueryFilter>,
}

impl UpdateStatement {
    pub fn new(table: &ValidatedTableName) -> Self {
        Self {
            table: table.to_string(),
            assignments: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.assignments.push((field.to_string(), value.into()));
        self
    }

    pub fn filters(mut self, filters: Vec<QueryFilter>) -> Self {
        self.conditions.extend(filters);
        self
    }

    pub fn assignments(&self) -> &[(String, Value)] {
        &self.assignments
    }
}

impl From<UpdateStatement> for Statement {
    fn from(statement: UpdateStatement) -> Self {
        Statement::Update(statement)
    }
}

/// `DELETE FROM <table> WHERE <conditions>`
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub(crate) table: String,
    pub(crate) conditions: Vec<QueryFilter>,
}

impl DeleteStatement {
    pub fn new(table: &ValidatedTableName) -> Self {
        Self {
            table: table.to_string(),
            conditions: Vec::new(),
        }
    }

    pub fn filters(mut self, filters: Vec<QueryFilter>) -> Self {
        self.conditions.extend(filters);
        self
    }
}

impl From<DeleteStatement> for Statement {
    fn from(statement: DeleteStatement) -> Self {
        Statement::Delete(statement)
    }
}
