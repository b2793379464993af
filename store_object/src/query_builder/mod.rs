//! Query builder utilities
//!
//! This module provides SQL query construction and the active-filter wrapper
//! every read goes through.

pub mod builder;
pub mod filter;
pub mod filtering;
pub mod sql_generation;
pub mod statement;


pub use builder::{QueryBuilder, SelectField, SortOrder};
pub use filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
pub use filtering::{FilterMode, FilteringQuery};
pub use statement::{CountStatement, DeleteStatement, SelectStatement, Statement, UpdateStatement};
