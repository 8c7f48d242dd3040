//! Raw match history as submitted by the league backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BattleTag;

/// Rating assumed for a participant whose old and current MMR are both unknown.
pub const DEFAULT_MMR: i64 = 1500;

/// Race code meaning "not reported".
pub const UNKNOWN_RACE: i32 = 0;

fn default_start_time() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}

/// One participant on one side of a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantRecord {
    pub battle_tag: BattleTag,

    /// Race played in this match; 0 = unknown
    pub race: i32,

    /// Rating before the match; 0 = unknown
    pub old_mmr: i64,

    /// Rating after the match; 0 = unknown
    pub current_mmr: i64,
}

impl ParticipantRecord {
    pub fn new(
        battle_tag: impl Into<BattleTag>,
        race: i32,
        old_mmr: i64,
        current_mmr: i64,
    ) -> Self {
        Self {
            battle_tag: battle_tag.into(),
            race,
            old_mmr,
            current_mmr,
        }
    }

    /// Rating used for scoring: old MMR, then current MMR, then [`DEFAULT_MMR`].
    pub fn effective_mmr(&self) -> i64 {
        [self.old_mmr, self.current_mmr]
            .into_iter()
            .find(|&mmr| mmr != 0)
            .unwrap_or(DEFAULT_MMR)
    }

    pub fn has_known_race(&self) -> bool {
        self.race != UNKNOWN_RACE
    }
}

/// One side of a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamRecord {
    pub won: bool,
    pub players: Vec<ParticipantRecord>,
}

impl TeamRecord {
    pub fn new(won: bool, players: Vec<ParticipantRecord>) -> Self {
        Self { won, players }
    }

    /// Find a participant on this team by battle tag.
    pub fn participant(&self, battle_tag: &BattleTag) -> Option<&ParticipantRecord> {
        self.players.iter().find(|p| &p.battle_tag == battle_tag)
    }
}

/// A single played match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchRecord {
    pub start_time: DateTime<Utc>,

    /// Competitive format code
    pub game_mode: i32,

    pub teams: Vec<TeamRecord>,
}

impl Default for MatchRecord {
    fn default() -> Self {
        Self {
            start_time: default_start_time(),
            game_mode: 0,
            teams: Vec::new(),
        }
    }
}

impl MatchRecord {
    pub fn new(start_time: DateTime<Utc>, game_mode: i32, teams: Vec<TeamRecord>) -> Self {
        Self {
            start_time,
            game_mode,
            teams,
        }
    }

    /// A match needs two sides to say anything about a player.
    pub fn is_playable(&self) -> bool {
        self.teams.len() >= 2
    }

    /// Locate the player: index of their team and their participant record.
    ///
    /// The first team containing the tag wins.
    pub fn find_player(&self, battle_tag: &BattleTag) -> Option<(usize, &ParticipantRecord)> {
        self.teams
            .iter()
            .enumerate()
            .find_map(|(idx, team)| team.participant(battle_tag).map(|p| (idx, p)))
    }

    /// First participant of the first non-empty team other than `own_team`.
    pub fn opponent_of(&self, own_team: usize) -> Option<&ParticipantRecord> {
        self.teams
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != own_team)
            .find_map(|(_, team)| team.players.first())
    }
}

/// One player's submission inside a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerSubmission {
    pub battle_tag: BattleTag,

    pub match_data: Vec<MatchRecord>,

    pub current_mmr: i64,

    /// Display name; informational only
    pub name: String,
}

impl PlayerSubmission {
    pub fn new(battle_tag: impl Into<BattleTag>, match_data: Vec<MatchRecord>) -> Self {
        Self {
            battle_tag: battle_tag.into(),
            match_data,
            current_mmr: 0,
            name: String::new(),
        }
    }
}

/// Body of a `compute-stats` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeStatsRequest {
    pub players: Vec<PlayerSubmission>,
}
