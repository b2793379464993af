//! Column existence lookups
//!
//! A record store asks its schema provider whether the configured soft-delete
//! column exists before it builds any statement that references it.

use crate::debug_log;
use crate::DbPool;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn column_exists(&self, table: &str, field: &str) -> anyhow::Result<bool>;
}

/// Fixed table layouts declared up front
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    tables: HashMap<String, HashSet<String>>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: &str, columns: &[&str]) -> Self {
        self.tables.insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl SchemaProvider for StaticSchema {
    async fn column_exists(&self, table: &str, field: &str) -> anyhow::Result<bool> {
        Ok(self
            .tables
            .get(table)
            .is_some_and(|columns| columns.contains(field)))
    }
}

/// Looks columns up in `information_schema` on every call
#[derive(Debug, Clone)]
pub struct PgSchemaProvider {
    pool: DbPool,
}

impl PgSchemaProvider {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaProvider for PgSchemaProvider {
    async fn column_exists(&self, table: &str, field: &str) -> anyhow::Result<bool> {
        debug_log!("[SCHEMA] Checking {}.{}", table, field);

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2)",
        )
        .bind(table)
        .bind(field)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_schema() {
        let schema = StaticSchema::new()
            .table("articles", &["id", "active"])
            .table("tags", &["id"]);

        assert!(schema.column_exists("articles", "active").await.unwrap());
        assert!(!schema.column_exists("tags", "active").await.unwrap());
        assert!(!schema.column_exists("comments", "id").await.unwrap());
    }
}
