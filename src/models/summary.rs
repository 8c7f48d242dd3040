//! Aggregated per-player statistics and their cached form.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::BattleTag;

/// Achievement tags derived from a player's totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Achievement {
    /// 100 or more wins
    #[serde(rename = "centurion")]
    Centurion,

    /// 50 or more wins
    #[serde(rename = "warrior")]
    Warrior,

    /// 1000 or more points
    #[serde(rename = "goldRush")]
    GoldRush,
}

impl Achievement {
    /// Evaluation order of the achievement rules.
    pub const ALL: [Achievement; 3] = [
        Achievement::Centurion,
        Achievement::Warrior,
        Achievement::GoldRush,
    ];

    /// Whether the totals qualify for this achievement.
    pub fn is_earned(&self, wins: u32, points: i64) -> bool {
        match self {
            Achievement::Centurion => wins >= 100,
            Achievement::Warrior => wins >= 50,
            Achievement::GoldRush => points >= 1000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Achievement::Centurion => "centurion",
            Achievement::Warrior => "warrior",
            Achievement::GoldRush => "goldRush",
        }
    }
}

impl std::fmt::Display for Achievement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stats for one race within a player's summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceProfile {
    pub race: i32,
    pub wins: u32,
    pub losses: u32,
    pub points: i64,

    /// Latest known rating seen for this race, 0 if none
    pub mmr: i64,
}

/// Aggregated stats for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub battle_tag: BattleTag,
    pub wins: u32,
    pub losses: u32,
    pub points: i64,

    /// Highest race rating, 0 if no race profiles
    pub mmr: i64,

    pub achievements: Vec<Achievement>,
    pub race_profiles: Vec<RaceProfile>,

    /// When these stats were computed
    pub last_updated: DateTime<Utc>,
}

impl PlayerSummary {
    /// A summary with no eligible matches.
    pub fn empty(battle_tag: BattleTag, computed_at: DateTime<Utc>) -> Self {
        Self {
            battle_tag,
            wins: 0,
            losses: 0,
            points: 0,
            mmr: 0,
            achievements: Vec::new(),
            race_profiles: Vec::new(),
            last_updated: computed_at,
        }
    }

    /// Build a summary from race profiles, deriving totals, rating and achievements.
    pub fn from_profiles(
        battle_tag: BattleTag,
        race_profiles: Vec<RaceProfile>,
        computed_at: DateTime<Utc>,
    ) -> Self {
        let wins: u32 = race_profiles.iter().map(|p| p.wins).sum();
        let losses: u32 = race_profiles.iter().map(|p| p.losses).sum();
        let points: i64 = race_profiles.iter().map(|p| p.points).sum();
        let mmr = race_profiles.iter().map(|p| p.mmr).max().unwrap_or(0);

        let achievements = Achievement::ALL
            .into_iter()
            .filter(|a| a.is_earned(wins, points))
            .collect();

        Self {
            battle_tag,
            wins,
            losses,
            points,
            mmr,
            achievements,
            race_profiles,
            last_updated: computed_at,
        }
    }

    pub fn has_achievement(&self, achievement: Achievement) -> bool {
        self.achievements.contains(&achievement)
    }

    pub fn race_profile(&self, race: i32) -> Option<&RaceProfile> {
        self.race_profiles.iter().find(|p| p.race == race)
    }
}

/// The persisted form of a [`PlayerSummary`]: the summary plus its expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRecord {
    #[serde(flatten)]
    pub summary: PlayerSummary,

    pub expires_at: DateTime<Utc>,
}

impl CachedRecord {
    /// Wrap a summary with an expiry of `now + ttl`, saturating at the
    /// latest representable instant.
    pub fn new(summary: PlayerSummary, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            summary,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn battle_tag(&self) -> &BattleTag {
        &self.summary.battle_tag
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
