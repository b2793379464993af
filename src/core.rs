//! Core SoftHaus functionality
//!
//! This module contains the main SoftHaus struct, which owns the connection
//! pool and the collaborators every record store shares: statement executor,
//! schema provider and signal manager.

use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::debug_log;
use crate::errors::SoftHausError;
use config::{AppConfig, SoftDeleteConfig};
use signal_system::SignalManager;
use store_object::{
    PgExecutor, PgSchemaProvider, PgTransactionExecutor, RecordStore, SchemaProvider,
    StatementExecutor,
};

/// Main SoftHaus coordinator that manages the database connection and record stores
pub struct SoftHaus {
    pool: Option<PgPool>,
    executor: Arc<dyn StatementExecutor>,
    schema: Arc<dyn SchemaProvider>,
    signals: Arc<SignalManager>,
    settings: SoftDeleteConfig,
    stores: HashMap<String, Arc<RecordStore>>,
}

impl std::fmt::Debug for SoftHaus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftHaus")
            .field("has_pool", &self.pool.is_some())
            .field("settings", &self.settings)
            .field("stores", &self.list_stores())
            .finish()
    }
}

impl SoftHaus {
    /// Create new SoftHaus with database connection
    pub async fn new(config: &AppConfig) -> Result<Self, SoftHausError> {
        config.validate()?;
        let database = &config.database;

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(database.max_connections)
            .min_connections(database.min_connections)
            .acquire_timeout(Duration::from_secs(database.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(database.idle_timeout_seconds));

        // Set max lifetime if specified
        if database.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(database.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&database.connection_string()).await?;
        debug_log!(
            "[SOFTHAUS] Connected to {}:{}/{}",
            database.host,
            database.port,
            database.database
        );

        Ok(Self {
            executor: Arc::new(PgExecutor::new(pool.clone())),
            schema: Arc::new(PgSchemaProvider::new(pool.clone())),
            pool: Some(pool),
            signals: Arc::new(SignalManager::new()),
            settings: config.soft_delete.clone(),
            stores: HashMap::new(),
        })
    }

    /// Build SoftHaus around any executor and schema provider, without a pool
    pub fn from_parts(
        executor: Arc<dyn StatementExecutor>,
        schema: Arc<dyn SchemaProvider>,
        settings: SoftDeleteConfig,
    ) -> Self {
        Self {
            pool: None,
            executor,
            schema,
            signals: Arc::new(SignalManager::new()),
            settings,
            stores: HashMap::new(),
        }
    }

    /// Get database pool reference, `None` when built from parts
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Signal manager shared by every store this coordinator builds
    pub fn signals(&self) -> Arc<SignalManager> {
        self.signals.clone()
    }

    pub fn settings(&self) -> &SoftDeleteConfig {
        &self.settings
    }

    pub fn executor(&self) -> Arc<dyn StatementExecutor> {
        self.executor.clone()
    }

    /// Build a record store wired to the shared executor, schema and signals
    pub fn store(&self, table: &str, primary_key: &[&str]) -> Result<RecordStore, SoftHausError> {
        let store = RecordStore::new(
            table,
            primary_key,
            self.executor.clone(),
            self.schema.clone(),
        )?
        .with_config(&self.settings)
        .with_events(self.signals.clone());
        Ok(store)
    }

    /// Begin a transaction; run stores on it with `RecordStore::with_executor`
    pub async fn begin(&self) -> Result<Arc<PgTransactionExecutor>, SoftHausError> {
        let pool = self.pool.as_ref().ok_or(SoftHausError::NoDatabase)?;
        Ok(Arc::new(PgTransactionExecutor::begin(pool).await?))
    }

    /// Register a record store with a given name
    pub fn register_store(
        &mut self,
        name: String,
        store: RecordStore,
    ) -> Result<Arc<RecordStore>, SoftHausError> {
        if self.stores.contains_key(&name) {
            return Err(SoftHausError::StoreAlreadyRegistered(name));
        }

        let store = Arc::new(store);
        self.stores.insert(name, store.clone());
        Ok(store)
    }

    /// Get a registered record store by name
    pub fn get_store(&self, name: &str) -> Result<Arc<RecordStore>, SoftHausError> {
        self.stores
            .get(name)
            .cloned()
            .ok_or_else(|| SoftHausError::StoreNotFound(name.to_string()))
    }

    /// List all registered store names
    pub fn list_stores(&self) -> Vec<&String> {
        self.stores.keys().collect()
    }

    /// Remove a record store by name
    pub fn unregister_store(&mut self, name: &str) -> Result<(), SoftHausError> {
        self.stores
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SoftHausError::StoreNotFound(name.to_string()))
    }

    /// Check database connection health; always healthy without a pool
    pub async fn health_check(&self) -> Result<(), SoftHausError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").fetch_one(pool).await?;
        }
        Ok(())
    }
}
