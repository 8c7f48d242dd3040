//! Parallel aggregation of a batch of players.

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::calculate::aggregate_player;
use crate::config::StatsConfig;
use crate::models::{PlayerSubmission, PlayerSummary};

/// Aggregate every submission on the blocking pool, one task per player.
///
/// Results come back in completion order. A task that panics is logged and
/// its player is left out; the rest of the batch is unaffected.
pub async fn process_players(
    config: StatsConfig,
    players: Vec<PlayerSubmission>,
) -> Vec<PlayerSummary> {
    let mut set = JoinSet::new();
    for player in players {
        set.spawn_blocking(move || aggregate_player(&config, &player, Utc::now()));
    }

    let mut results = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(summary) => results.push(summary),
            Err(e) => error!("Player aggregation task failed: {}", e),
        }
    }

    debug!("Aggregated {} players", results.len());
    results
}
