//! # SoftHaus
//!
//! Soft deletion for PostgreSQL data access. Deleting a record flips its
//! `active` column to false instead of removing the row, and every read built
//! through a record store hides inactive rows unless the query asks for them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use softhaus::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let mut softhaus = SoftHaus::new(&config).await?;
//!
//!     let articles = softhaus.store("articles", &["id"])?;
//!     let articles = softhaus.register_store("articles".to_string(), articles)?;
//!
//!     // Vetoes and failed rules come back as `false`, not as errors
//!     softhaus.signals().on(EventType::BeforeDelete, |event| {
//!         match event.entity().and_then(|e| e.get("locked")) {
//!             Some(Value::Bool(true)) => EventResult::stop(false),
//!             _ => EventResult::Continue,
//!         }
//!     });
//!
//!     let mut article = Record::persisted(Row::new()).with("id", 1).with("active", true);
//!     if articles.soft_delete(&mut article, &DeleteOptions::default()).await? {
//!         println!("Article hidden");
//!     }
//!
//!     // Default reads skip inactive rows, `with_inactive` opts out
//!     let visible = articles.count(articles.query().await?).await?;
//!     let everything = articles.count(articles.query().await?.with_inactive()).await?;
//!     println!("{visible} of {everything} articles visible");
//!
//!     articles.restore(&mut article).await?;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::SoftHaus;
pub use errors::SoftHausError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, SoftDeleteConfig};

// Re-export member crates used in the public API
pub use signal_system;
pub use store_object;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
