//! The compute-stats operation.
//!
//! Decodes a batch, aggregates every player in parallel, caches the results
//! and wraps everything in the response envelope. Only malformed input fails
//! a request; cache problems are logged and never change the outcome.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch::process_players;
use crate::config::StatsConfig;
use crate::models::{ComputeStatsRequest, PlayerSummary};
use crate::storage::CacheWriter;

/// Response envelope of a compute-stats call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeStatsResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<PlayerSummary>,
    pub processing_time_ms: u64,
}

impl ComputeStatsResponse {
    fn failure(message: String, started: Instant) -> Self {
        Self {
            success: false,
            message,
            results: Vec::new(),
            processing_time_ms: elapsed_ms(started),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// How the cache write relates to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Respond after the bounded write finished
    Inline,
    /// Spawn the write and respond immediately
    Background,
}

/// Runs compute-stats batches against an optional cache.
#[derive(Clone)]
pub struct StatsService {
    stats: StatsConfig,
    cache: Option<CacheWriter>,
    write_mode: WriteMode,
}

impl StatsService {
    pub fn new(stats: StatsConfig, cache: CacheWriter) -> Self {
        Self {
            stats,
            cache: Some(cache),
            write_mode: WriteMode::Inline,
        }
    }

    /// A service that computes but never caches.
    pub fn without_cache(stats: StatsConfig) -> Self {
        Self {
            stats,
            cache: None,
            write_mode: WriteMode::Inline,
        }
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn cache(&self) -> Option<&CacheWriter> {
        self.cache.as_ref()
    }

    /// Decode a raw request body and run the batch.
    pub async fn compute_from_slice(&self, body: &[u8]) -> ComputeStatsResponse {
        let started = Instant::now();
        match serde_json::from_slice::<ComputeStatsRequest>(body) {
            Ok(request) => self.run(request, started).await,
            Err(e) => {
                warn!("JSON decode error: {}", e);
                ComputeStatsResponse::failure(format!("Invalid JSON: {}", e), started)
            }
        }
    }

    async fn run(&self, request: ComputeStatsRequest, started: Instant) -> ComputeStatsResponse {
        if request.players.is_empty() {
            return ComputeStatsResponse {
                success: true,
                message: "No players provided".to_string(),
                results: Vec::new(),
                processing_time_ms: 0,
            };
        }

        info!("Processing {} players", request.players.len());

        let results = process_players(self.stats, request.players).await;

        if let Some(cache) = &self.cache {
            match self.write_mode {
                WriteMode::Inline => {
                    cache.write(&results).await;
                }
                WriteMode::Background => {
                    let cache = cache.clone();
                    let summaries = results.clone();
                    tokio::spawn(async move {
                        cache.write(&summaries).await;
                    });
                }
            }
        }

        let processing_time_ms = elapsed_ms(started);
        let processed = results.len();
        info!("Processed {} players in {}ms", processed, processing_time_ms);

        ComputeStatsResponse {
            success: true,
            message: format!("Processed {} players", processed),
            results,
            processing_time_ms,
        }
    }
}
