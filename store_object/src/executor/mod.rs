//! Statement execution boundary
//!
//! Record stores build [`Statement`]s and hand them to an executor; they never
//! talk to a connection directly. Connection and transaction lifetimes belong
//! to whoever owns the executor.

pub mod memory;
pub mod postgres;

pub use memory::MemoryExecutor;
pub use postgres::{PgExecutor, PgTransactionExecutor};

use crate::entity::Row;
use crate::errors::StoreError;
use crate::query_builder::Statement;
use async_trait::async_trait;

#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Run an UPDATE or DELETE, returning the number of rows it matched
    async fn execute(&self, statement: &Statement) -> Result<u64, StoreError>;

    /// Run a SELECT
    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>, StoreError>;

    /// Run a COUNT
    async fn fetch_count(&self, statement: &Statement) -> Result<i64, StoreError>;
}
