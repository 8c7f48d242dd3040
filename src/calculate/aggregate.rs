//! Per-player aggregation of an eligible match window.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::trace;

use super::score_match;
use crate::config::StatsConfig;
use crate::models::{MatchRecord, PlayerSubmission, PlayerSummary, RaceProfile};

/// Matches inside the stats window, oldest first.
///
/// A match is eligible when it started strictly after the cutoff and was
/// played in the eligible mode. Equal start times keep submission order.
pub fn eligible_matches<'a>(
    config: &StatsConfig,
    matches: &'a [MatchRecord],
) -> Vec<&'a MatchRecord> {
    let mut eligible: Vec<_> = matches
        .iter()
        .filter(|m| m.start_time > config.cutoff && m.game_mode == config.eligible_mode)
        .collect();
    eligible.sort_by_key(|m| m.start_time);
    eligible
}

/// Aggregate one player's submission into a summary.
///
/// Never fails: matches that cannot be attributed to a race or scored are
/// dropped, and a player with nothing left gets an all-zero summary.
#[tracing::instrument(skip_all, fields(battle_tag = %submission.battle_tag))]
pub fn aggregate_player(
    config: &StatsConfig,
    submission: &PlayerSubmission,
    computed_at: DateTime<Utc>,
) -> PlayerSummary {
    let tag = &submission.battle_tag;
    let eligible = eligible_matches(config, &submission.match_data);
    if eligible.is_empty() {
        return PlayerSummary::empty(tag.clone(), computed_at);
    }

    let mut by_race: BTreeMap<i32, RaceProfile> = BTreeMap::new();
    let mut skipped = 0usize;

    for match_ in eligible {
        if !match_.is_playable() {
            skipped += 1;
            continue;
        }
        let Some((_, player)) = match_.find_player(tag) else {
            skipped += 1;
            continue;
        };
        if !player.has_known_race() {
            skipped += 1;
            continue;
        }

        let profile = by_race.entry(player.race).or_insert_with(|| RaceProfile {
            race: player.race,
            ..RaceProfile::default()
        });

        // Chronological order, so the last known rating is the latest one.
        if player.current_mmr > 0 {
            profile.mmr = player.current_mmr;
        }

        match score_match(match_, tag) {
            Some(outcome) => {
                if outcome.won {
                    profile.wins += 1;
                } else {
                    profile.losses += 1;
                }
                profile.points += outcome.points;
            }
            None => skipped += 1,
        }
    }

    trace!(races = by_race.len(), skipped, "aggregated match window");

    PlayerSummary::from_profiles(tag.clone(), by_race.into_values().collect(), computed_at)
}
