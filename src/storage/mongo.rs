//! MongoDB cache store.
//!
//! Records live in one collection keyed by `battleTag`. Each upsert sets
//! every summary field plus `expiresAt` as a BSON date, so a TTL index on
//! that field can evict stale entries.

use std::future::IntoFuture;
use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{self, doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use super::{CacheStore, StorageError};
use crate::models::CachedRecord;

pub struct MongoStore {
    database: Database,
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect and ping, failing if the server does not answer within `timeout`.
    pub async fn connect(
        url: &str,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let mut options = ClientOptions::parse(url).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options)?;
        let database = client.database(database);

        tokio::time::timeout(timeout, database.run_command(doc! { "ping": 1 }).into_future())
            .await
            .map_err(|_| StorageError::Timeout(timeout))??;

        info!("Connected to MongoDB ({}.{})", database.name(), collection);

        Ok(Self {
            collection: database.collection::<Document>(collection),
            database,
        })
    }
}

/// Filter selecting the record for one player.
pub fn record_filter(record: &CachedRecord) -> Document {
    doc! { "battleTag": record.battle_tag().as_str() }
}

/// `$set` update carrying every field of the record.
pub fn record_update(record: &CachedRecord) -> Result<Document, StorageError> {
    let summary = &record.summary;
    let achievements: Vec<&str> = summary.achievements.iter().map(|a| a.as_str()).collect();

    Ok(doc! {
        "$set": {
            "battleTag": summary.battle_tag.as_str(),
            "wins": i64::from(summary.wins),
            "losses": i64::from(summary.losses),
            "points": summary.points,
            "mmr": summary.mmr,
            "achievements": achievements,
            "raceProfiles": bson::to_bson(&summary.race_profiles)?,
            "lastUpdated": bson::DateTime::from_chrono(summary.last_updated),
            "expiresAt": bson::DateTime::from_chrono(record.expires_at),
        }
    })
}

#[async_trait]
impl CacheStore for MongoStore {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn upsert(&self, record: &CachedRecord) -> Result<(), StorageError> {
        let result = self
            .collection
            .update_one(record_filter(record), record_update(record)?)
            .upsert(true)
            .await?;

        debug!(
            battle_tag = %record.battle_tag(),
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "upserted cache record"
        );
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, StorageError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Achievement, PlayerSummary, RaceProfile};
    use chrono::{TimeZone, Utc};

    fn record() -> CachedRecord {
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).unwrap();
        let summary = PlayerSummary::from_profiles(
            "Grubby#1278".into(),
            vec![RaceProfile {
                race: 2,
                wins: 120,
                losses: 10,
                points: 5500,
                mmr: 2100,
            }],
            now,
        );
        CachedRecord::new(summary, now, chrono::Duration::minutes(10))
    }

    #[test]
    fn test_filter_by_battle_tag() {
        assert_eq!(record_filter(&record()), doc! { "battleTag": "Grubby#1278" });
    }

    #[test]
    fn test_update_sets_all_fields() {
        let update = record_update(&record()).unwrap();
        let set = update.get_document("$set").unwrap();

        assert_eq!(set.get_str("battleTag").unwrap(), "Grubby#1278");
        assert_eq!(set.get_i64("wins").unwrap(), 120);
        assert_eq!(set.get_i64("losses").unwrap(), 10);
        assert_eq!(set.get_i64("points").unwrap(), 5500);
        assert_eq!(set.get_i64("mmr").unwrap(), 2100);

        let achievements = set.get_array("achievements").unwrap();
        assert_eq!(achievements.len(), Achievement::ALL.len());
        assert_eq!(achievements[2].as_str(), Some("goldRush"));

        let profiles = set.get_array("raceProfiles").unwrap();
        let first = profiles[0].as_document().unwrap();
        assert_eq!(first.get_i32("race").unwrap(), 2);

        let expires = set.get_datetime("expiresAt").unwrap().to_chrono();
        let updated = set.get_datetime("lastUpdated").unwrap().to_chrono();
        assert_eq!(expires - updated, chrono::Duration::minutes(10));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let result =
            MongoStore::connect("not-a-mongo-url", "db", "c", Duration::from_millis(200)).await;
        assert!(matches!(result, Err(StorageError::Mongo(_))));
    }
}
