//! Durable key-value storage for client state.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStore`] | Tests and one-shot commands |
//! | [`SqliteStore`] | Credentials that outlive the process |
//!
//! [`MemoryStore`]: memory::MemoryStore
//! [`SqliteStore`]: sqlite::SqliteStore

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::ClientConfig;

/// Errors that store operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An unexpected error in the underlying storage backend.
    #[error("internal store error: {0}")]
    Internal(String),
}

/// A string-to-string map that survives as long as its backend does.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// The store selected by `config.token_db`.
pub fn open(config: &ClientConfig) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    match &config.token_db {
        Some(path) => {
            let store = SqliteStore::open(path).map_err(|e| StoreError::Internal(e.to_string()))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}
