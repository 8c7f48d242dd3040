//! Statistics calculation engine.
//!
//! Turns raw match histories into per-player stats:
//! - Match scoring based on the rating differential to the opponent
//! - Per-race aggregation of wins, losses, points and rating
//! - Achievement derivation from totals

mod aggregate;

pub use aggregate::{aggregate_player, eligible_matches};

use crate::models::{BattleTag, MatchRecord};

/// Win/loss and point delta of a single scored match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub won: bool,
    pub points: i64,
}

/// Points for a result given `diff = opponent_mmr - player_mmr`.
///
/// The win and loss tables do not mirror each other exactly: a win at -20
/// scores +30, a loss at +20 scores -30, and a loss at -20 scores -70.
pub fn points_for(won: bool, diff: i64) -> i64 {
    if won {
        if diff >= 20 {
            70
        } else if diff >= -19 {
            50
        } else {
            30
        }
    } else if diff <= -20 {
        -70
    } else if (-19..=19).contains(&diff) {
        -50
    } else {
        -30
    }
}

/// Score one match from the point of view of `battle_tag`.
///
/// Returns `None` when the match cannot be scored: fewer than two teams, the
/// player is not in it, or no other team has a participant.
pub fn score_match(match_: &MatchRecord, battle_tag: &BattleTag) -> Option<MatchOutcome> {
    if !match_.is_playable() {
        return None;
    }

    let (team_idx, player) = match_.find_player(battle_tag)?;
    let opponent = match_.opponent_of(team_idx)?;

    let won = match_.teams[team_idx].won;
    let diff = opponent.effective_mmr().saturating_sub(player.effective_mmr());

    Some(MatchOutcome {
        won,
        points: points_for(won, diff),
    })
}
