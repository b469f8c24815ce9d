//! InkLoc Cache - Local key-value persistence
//!
//! SQLite-backed storage for the resolver's persisted documents:
//! - Last-known location record
//! - Cumulative metrics
//! - User preferences
//! - The site's consent record
//!
//! ## Architecture
//!
//! This crate implements the `IKeyValueStore` port from `inkloc-core`
//! using SQLite as the storage backend. Values are opaque strings; the
//! resolver owns their JSON shape.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use inkloc_cache::{DatabasePool, SqliteKeyValueStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/inkloc/inkloc.db")).await?;
//! let store = SqliteKeyValueStore::new(pool.pool().clone());
//! // Use store as IKeyValueStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod store;

pub use pool::DatabasePool;
pub use store::SqliteKeyValueStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
