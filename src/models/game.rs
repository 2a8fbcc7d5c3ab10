//! Finished games between team sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GameId, PlayerId, TeamSetId};

/// Outcome of a game from one team's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

impl std::str::FromStr for GameResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "win" | "won" => Ok(GameResult::Win),
            "loss" | "lose" | "lost" => Ok(GameResult::Loss),
            "draw" => Ok(GameResult::Draw),
            other => Err(format!("Unknown game result: {}", other)),
        }
    }
}

/// One side of a game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameTeam {
    pub player_id: PlayerId,
    pub set_id: TeamSetId,
}

impl GameTeam {
    pub fn new(player_id: impl Into<PlayerId>, set_id: impl Into<TeamSetId>) -> Self {
        Self {
            player_id: player_id.into(),
            set_id: set_id.into(),
        }
    }
}

/// Summary emitted when a game ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: GameId,

    pub game_type_id: String,

    pub teams: Vec<GameTeam>,

    /// Index into `teams` of the winner; `None` for a draw
    #[serde(default)]
    pub winner: Option<usize>,

    /// Rating used for ranking; unrated games are never listed
    #[serde(default)]
    pub rating: Option<f64>,

    pub ended_at: DateTime<Utc>,
}

impl GameSummary {
    pub fn new(id: impl Into<GameId>, game_type_id: impl Into<String>, teams: Vec<GameTeam>) -> Self {
        Self {
            id: id.into(),
            game_type_id: game_type_id.into(),
            teams,
            winner: None,
            rating: None,
            ended_at: Utc::now(),
        }
    }

    pub fn with_winner(mut self, team: usize) -> Self {
        self.winner = Some(team);
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Result for the team at `index`.
    pub fn result_for(&self, index: usize) -> GameResult {
        match self.winner {
            None => GameResult::Draw,
            Some(w) if w == index => GameResult::Win,
            Some(_) => GameResult::Loss,
        }
    }
}
