//! Bounded concurrent cache writes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::CacheStore;
use crate::models::{CachedRecord, PlayerSummary};

/// Outcome of caching one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheReport {
    pub attempted: usize,
    pub written: usize,
    pub failed: usize,
    /// Upserts still running when the deadline expired
    pub timed_out: usize,
}

impl CacheReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.timed_out == 0
    }
}

/// Upserts summaries into a [`CacheStore`], one task per player, all under
/// a single deadline.
#[derive(Clone)]
pub struct CacheWriter {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    deadline: Duration,
}

impl CacheWriter {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, deadline: Duration) -> Self {
        Self {
            store,
            ttl,
            deadline,
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Write every summary, never failing.
    ///
    /// Per-record errors are logged and counted. Upserts still pending at the
    /// deadline are aborted and counted as timed out.
    pub async fn write(&self, summaries: &[PlayerSummary]) -> CacheReport {
        if summaries.is_empty() {
            return CacheReport::default();
        }

        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let mut set = JoinSet::new();

        for summary in summaries {
            let store = Arc::clone(&self.store);
            let summary = summary.clone();
            set.spawn(async move {
                let record = CachedRecord::new(summary, Utc::now(), ttl);
                let result = store.upsert(&record).await;
                (record.summary.battle_tag, result)
            });
        }

        let mut report = CacheReport {
            attempted: summaries.len(),
            ..CacheReport::default()
        };

        let drain = async {
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((_, Ok(()))) => report.written += 1,
                    Ok((battle_tag, Err(e))) => {
                        warn!("Failed to cache stats for {}: {}", battle_tag, e);
                        report.failed += 1;
                    }
                    Err(e) => {
                        warn!("Cache write task failed: {}", e);
                        report.failed += 1;
                    }
                }
            }
        };

        if tokio::time::timeout(self.deadline, drain).await.is_err() {
            report.timed_out = report.attempted - report.written - report.failed;
            set.abort_all();
            warn!(
                "Cache write deadline of {:?} expired with {} upserts pending",
                self.deadline, report.timed_out
            );
        }

        if report.is_clean() {
            info!(
                "Cached {} player stats in {}",
                report.written,
                self.store.name()
            );
        } else {
            warn!(
                "{} cache errors occurred (out of {} players)",
                report.failed + report.timed_out,
                report.attempted
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BattleTag;
    use crate::storage::{InMemoryStore, StorageError};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails for selected tags and hangs for others; everything else goes
    /// to an in-memory store.
    #[derive(Default)]
    struct ScriptedStore {
        inner: InMemoryStore,
        failing: HashSet<BattleTag>,
        hanging: HashSet<BattleTag>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for ScriptedStore {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn upsert(&self, record: &CachedRecord) -> Result<(), StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(record.battle_tag()) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            if self.hanging.contains(record.battle_tag()) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.inner.upsert(record).await
        }

        async fn health_check(&self) -> Result<bool, StorageError> {
            Ok(true)
        }
    }

    fn summaries(tags: &[&str]) -> Vec<PlayerSummary> {
        tags.iter()
            .map(|t| PlayerSummary::empty((*t).into(), Utc::now()))
            .collect()
    }

    fn writer(store: Arc<ScriptedStore>, deadline: Duration) -> CacheWriter {
        CacheWriter::new(store, Duration::from_secs(600), deadline)
    }

    #[tokio::test]
    async fn test_empty_batch_touches_nothing() {
        let store = Arc::new(ScriptedStore::default());
        let report = writer(store.clone(), Duration::from_secs(1)).write(&[]).await;

        assert_eq!(report, CacheReport::default());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_writes_every_summary_with_ttl() {
        let store = Arc::new(ScriptedStore::default());
        let before = Utc::now();
        let report = writer(store.clone(), Duration::from_secs(5))
            .write(&summaries(&["a", "b", "c"]))
            .await;

        assert_eq!(
            report,
            CacheReport {
                attempted: 3,
                written: 3,
                failed: 0,
                timed_out: 0
            }
        );
        assert!(report.is_clean());
        assert_eq!(store.inner.len().await, 3);

        let record = store.inner.get(&"b".into()).await.unwrap();
        assert!(record.expires_at >= before + chrono::Duration::minutes(10));
        assert!(record.expires_at <= Utc::now() + chrono::Duration::minutes(10));
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_writes() {
        let store = Arc::new(ScriptedStore {
            failing: ["b".into()].into_iter().collect(),
            ..ScriptedStore::default()
        });
        let report = writer(store.clone(), Duration::from_secs(5))
            .write(&summaries(&["a", "b", "c"]))
            .await;

        assert_eq!(report.written, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.is_clean());
        assert!(store.inner.get(&"b".into()).await.is_none());
        assert!(store.inner.get(&"c".into()).await.is_some());
    }

    #[tokio::test]
    async fn test_deadline_abandons_pending_writes() {
        let store = Arc::new(ScriptedStore {
            hanging: ["slow".into()].into_iter().collect(),
            ..ScriptedStore::default()
        });
        let report = writer(store.clone(), Duration::from_millis(200))
            .write(&summaries(&["a", "slow"]))
            .await;

        assert_eq!(report.written, 1);
        assert_eq!(report.timed_out, 1);
        assert_eq!(store.inner.len().await, 1);
    }
}
