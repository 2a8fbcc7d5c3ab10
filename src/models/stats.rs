//! Team set statistics and ranking metrics.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{PlayerId, TeamSet};

/// Rating assigned to a set that has never been played.
pub const DEFAULT_RATING: f64 = 750.0;

/// Per-player usage of a team set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerUsage {
    /// First time this player used the set
    pub first_seen: DateTime<Utc>,

    /// Games this player has played with the set
    pub game_count: u32,
}

/// Aggregated statistics for one team set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSetStats {
    #[serde(default = "default_rating")]
    pub rating: f64,

    #[serde(default)]
    pub game_count: u32,

    #[serde(default)]
    pub player_count: u32,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub created_by: Option<PlayerId>,

    #[serde(default)]
    pub player_ids: HashMap<PlayerId, PlayerUsage>,
}

fn default_rating() -> f64 {
    DEFAULT_RATING
}

impl Default for TeamSetStats {
    fn default() -> Self {
        Self {
            rating: default_rating(),
            game_count: 0,
            player_count: 0,
            updated_at: None,
            created_by: None,
            player_ids: HashMap::new(),
        }
    }
}

impl TeamSetStats {
    /// The player with the highest recorded game count.
    ///
    /// Ties resolve to the smaller player id so the answer is stable.
    pub fn most_played_by(&self) -> Option<&PlayerId> {
        self.player_ids
            .iter()
            .max_by(|(a_id, a), (b_id, b)| {
                a.game_count
                    .cmp(&b.game_count)
                    .then_with(|| b_id.cmp(a_id))
            })
            .map(|(id, _)| id)
    }

    /// Record one finished game played with this set.
    pub fn record_game(&mut self, player: &PlayerId, at: DateTime<Utc>) {
        self.game_count += 1;
        self.updated_at = Some(at);

        if !self.player_ids.contains_key(player) {
            self.player_count += 1;
        }
        self.player_ids
            .entry(player.clone())
            .or_insert(PlayerUsage {
                first_seen: at,
                game_count: 0,
            })
            .game_count += 1;
    }
}

/// Unknown metric name.
#[derive(Debug, Clone, Error)]
#[error("Unknown metric: {0}")]
pub struct UnknownMetric(pub String);

/// The value a search ranks team sets by (descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Rating,
    Games,
    Players,
    Updated,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Rating => "rating",
            Metric::Games => "games",
            Metric::Players => "players",
            Metric::Updated => "updated",
        }
    }

    /// Metric value of a set's stats.
    pub fn value(&self, stats: &TeamSetStats) -> f64 {
        match self {
            Metric::Rating => stats.rating,
            Metric::Games => stats.game_count as f64,
            Metric::Players => stats.player_count as f64,
            Metric::Updated => stats
                .updated_at
                .map(|t| t.timestamp_millis() as f64)
                .unwrap_or(0.0),
        }
    }

    /// Ranking order: metric descending, then id ascending.
    pub fn compare(&self, a: &TeamSet, b: &TeamSet) -> std::cmp::Ordering {
        self.value(&b.stats)
            .total_cmp(&self.value(&a.stats))
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rating" => Ok(Metric::Rating),
            "games" | "gamecount" | "game_count" => Ok(Metric::Games),
            "players" | "playercount" | "player_count" => Ok(Metric::Players),
            "updated" | "updatedat" | "updated_at" => Ok(Metric::Updated),
            other => Err(UnknownMetric(other.to_string())),
        }
    }
}
