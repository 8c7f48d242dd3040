//! Cache store for aggregated player stats.
//!
//! The store is write-only from the point of view of this service: every
//! batch upserts one [`CachedRecord`] per player, keyed by battle tag.
//! Backends:
//! - MongoDB (production)
//! - JSONL file (local runs without a database)
//! - In-memory (tests and dry runs)

pub mod jsonl;
pub mod memory;
pub mod mongo;
mod writer;

pub use jsonl::JsonlStore;
pub use memory::InMemoryStore;
pub use mongo::MongoStore;
pub use writer::{CacheReport, CacheWriter};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{CacheBackend, CacheConfig};
use crate::models::CachedRecord;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("BSON serialization error: {0}")]
    Bson(#[from] bson::ser::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Keyed write access to the stats cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Insert or replace the record for `record.battle_tag()`.
    ///
    /// Must be atomic per key: a failed or abandoned call leaves either the
    /// previous record or the new one, never a mix.
    async fn upsert(&self, record: &CachedRecord) -> Result<(), StorageError>;

    /// Check if the store is reachable.
    async fn health_check(&self) -> Result<bool, StorageError>;
}

/// Open the configured cache store.
pub async fn connect(
    config: &CacheConfig,
    timeout: Duration,
) -> Result<Arc<dyn CacheStore>, StorageError> {
    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Mongodb => Arc::new(
            MongoStore::connect(&config.mongo_url, &config.database, &config.collection, timeout)
                .await?,
        ),
        CacheBackend::Jsonl => Arc::new(JsonlStore::open(&config.data_dir, &config.collection)?),
        CacheBackend::Memory => Arc::new(InMemoryStore::new()),
    };

    tracing::info!("Cache store ready: {}", store.name());
    Ok(store)
}
