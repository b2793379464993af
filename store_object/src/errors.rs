use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The configured soft-delete column does not exist on the table
    #[error("Configured field `{field}` is missing from the table `{table}`.")]
    MissingColumn { field: String, table: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error in {operation} on {table}: {source}")]
    Database {
        table: String,
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Errors raised by schema providers, rule checkers, dispatchers or cascades
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl StoreError {
    pub fn database_operation(table: &str, operation: &str, source: sqlx::Error) -> Self {
        Self::Database {
            table: table.to_string(),
            operation: operation.to_string(),
            source,
        }
    }

    pub fn missing_column(field: &str, table: &str) -> Self {
        Self::MissingColumn {
            field: field.to_string(),
            table: table.to_string(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Configuration errors should not be retried
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingColumn { .. } | Self::Validation(_))
    }
}
