//! In-memory cache store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheStore, StorageError};
use crate::models::{BattleTag, CachedRecord};

/// Cache store backed by a map; contents are lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<BattleTag, CachedRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, battle_tag: &BattleTag) -> Option<CachedRecord> {
        self.records.read().await.get(battle_tag).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, record: &CachedRecord) -> Result<(), StorageError> {
        self.records
            .write()
            .await
            .insert(record.battle_tag().clone(), record.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, StorageError> {
        Ok(true)
    }
}
