//! PostgreSQL executors
//!
//! [`PgExecutor`] runs every statement on its own pooled connection.
//! [`PgTransactionExecutor`] pins statements to one transaction so a caller can
//! make multi-statement operations such as `hard_delete` atomic:
//!
//! ```ignore
//! let tx = Arc::new(PgTransactionExecutor::begin(&pool).await?);
//! let store = articles.with_executor(tx.clone());
//!
//! if store.hard_delete(&mut article, &DeleteOptions::default()).await? {
//!     tx.commit().await?;
//! } else {
//!     tx.rollback().await?;
//! }
//! ```

use super::StatementExecutor;
use crate::entity::Row;
use crate::errors::StoreError;
use crate::query_builder::Statement;
use crate::{debug_log, DbPool};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Postgres, Transaction};
use tokio::sync::Mutex;

/// How a JSON value is bound to a placeholder
///
/// Strings that parse as RFC 3339 timestamps or UUIDs are bound with those
/// types so they compare against `timestamptz` and `uuid` columns. A `text`
/// column holding such a string cannot be matched this way.
#[derive(Debug, PartialEq)]
enum PgParam {
    Timestamp(chrono::DateTime<chrono::Utc>),
    Uuid(uuid::Uuid),
    Text(String),
    Int(i32),
    BigInt(i64),
    Float(f64),
    Bool(bool),
    Null,
    Json(Value),
}

impl From<Value> for PgParam {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => {
                if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&s) {
                    PgParam::Timestamp(dt.with_timezone(&chrono::Utc))
                } else if let Ok(uuid) = uuid::Uuid::parse_str(&s) {
                    PgParam::Uuid(uuid)
                } else {
                    PgParam::Text(s)
                }
            }
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => i32::try_from(i).map_or(PgParam::BigInt(i), PgParam::Int),
                (None, Some(f)) => PgParam::Float(f),
                (None, None) => PgParam::Text(n.to_string()),
            },
            Value::Bool(b) => PgParam::Bool(b),
            Value::Null => PgParam::Null,
            other => PgParam::Json(other),
        }
    }
}

// Shared parameter binding for every query flavour
macro_rules! bind_json_param {
    ($query:expr, $param:expr) => {
        match PgParam::from($param) {
            PgParam::Timestamp(dt) => $query.bind(dt),
            PgParam::Uuid(uuid) => $query.bind(uuid),
            PgParam::Text(s) => $query.bind(s),
            PgParam::Int(i) => $query.bind(i),
            PgParam::BigInt(i) => $query.bind(i),
            PgParam::Float(f) => $query.bind(f),
            PgParam::Bool(b) => $query.bind(b),
            PgParam::Null => $query.bind(Option::<String>::None),
            PgParam::Json(other) => $query.bind(sqlx::types::Json(other)),
        }
    };
}

fn database_error(statement: &Statement, error: sqlx::Error) -> StoreError {
    StoreError::database_operation(statement.table(), statement.operation(), error)
}

async fn execute_on<'c, E>(executor: E, statement: &Statement) -> Result<u64, StoreError>
where
    E: sqlx::PgExecutor<'c>,
{
    if matches!(statement, Statement::Select(_) | Statement::Count(_)) {
        return Err(StoreError::invalid_argument(format!(
            "{} statements must be fetched, not executed",
            statement.operation()
        )));
    }

    statement.validate()?;
    let (sql, params) = statement.to_sql();
    debug_log!("[EXECUTE] {} ({} params)", sql, params.len());

    let mut query = sqlx::query(&sql);
    for param in params {
        query = bind_json_param!(query, param);
    }

    let result = query
        .execute(executor)
        .await
        .map_err(|e| database_error(statement, e))?;
    Ok(result.rows_affected())
}

async fn fetch_all_on<'c, E>(executor: E, statement: &Statement) -> Result<Vec<Row>, StoreError>
where
    E: sqlx::PgExecutor<'c>,
{
    statement.validate()?;
    let (sql, params) = statement.to_sql();
    // Let the server build the JSON rows so no column types need mapping here
    let wrapped = format!("SELECT row_to_json(q) AS row FROM ({}) q", sql);
    debug_log!("[FETCH] {} ({} params)", wrapped, params.len());

    let mut query = sqlx::query_scalar::<_, sqlx::types::Json<Row>>(&wrapped);
    for param in params {
        query = bind_json_param!(query, param);
    }

    let rows = query
        .fetch_all(executor)
        .await
        .map_err(|e| database_error(statement, e))?;
    Ok(rows.into_iter().map(|row| row.0).collect())
}

async fn fetch_count_on<'c, E>(executor: E, statement: &Statement) -> Result<i64, StoreError>
where
    E: sqlx::PgExecutor<'c>,
{
    statement.validate()?;
    let (sql, params) = statement.to_sql();
    debug_log!("[COUNT] {} ({} params)", sql, params.len());

    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for param in params {
        query = bind_json_param!(query, param);
    }

    query
        .fetch_one(executor)
        .await
        .map_err(|e| database_error(statement, e))
}

/// Executor backed by a connection pool
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: DbPool,
}

impl PgExecutor {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl StatementExecutor for PgExecutor {
    async fn execute(&self, statement: &Statement) -> Result<u64, StoreError> {
        execute_on(&self.pool, statement).await
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>, StoreError> {
        fetch_all_on(&self.pool, statement).await
    }

    async fn fetch_count(&self, statement: &Statement) -> Result<i64, StoreError> {
        fetch_count_on(&self.pool, statement).await
    }
}

/// Executor pinned to a single database transaction
///
/// Once committed or rolled back every further statement fails with
/// [`StoreError::Transaction`].
pub struct PgTransactionExecutor {
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl std::fmt::Debug for PgTransactionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTransactionExecutor").finish_non_exhaustive()
    }
}

impl PgTransactionExecutor {
    /// Begin a new database transaction
    pub async fn begin(pool: &DbPool) -> Result<Self, StoreError> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| StoreError::Transaction(format!("Failed to begin transaction: {}", e)))?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
        })
    }

    /// Commit the transaction
    pub async fn commit(&self) -> Result<(), StoreError> {
        let tx = self.take().await?;
        tx.commit()
            .await
            .map_err(|e| StoreError::Transaction(format!("Failed to commit transaction: {}", e)))
    }

    /// Rollback the transaction
    pub async fn rollback(&self) -> Result<(), StoreError> {
        let tx = self.take().await?;
        tx.rollback()
            .await
            .map_err(|e| StoreError::Transaction(format!("Failed to rollback transaction: {}", e)))
    }

    async fn take(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.tx.lock().await.take().ok_or_else(Self::finished)
    }

    fn finished() -> StoreError {
        StoreError::Transaction("Transaction already committed or rolled back".to_string())
    }
}

#[async_trait]
impl StatementExecutor for PgTransactionExecutor {
    async fn execute(&self, statement: &Statement) -> Result<u64, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(Self::finished)?;
        execute_on(&mut **tx, statement).await
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(Self::finished)?;
        fetch_all_on(&mut **tx, statement).await
    }

    async fn fetch_count(&self, statement: &Statement) -> Result<i64, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(Self::finished)?;
        fetch_count_on(&mut **tx, statement).await
    }
}
