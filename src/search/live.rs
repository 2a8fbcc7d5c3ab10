//! Incrementally sorted game results.

use tracing::debug;

use crate::models::{GameId, GameResult, GameSummary, TeamSetId};

/// Rated games involving a set, kept sorted as games end.
///
/// History is materialized page by page with `push_page`; live games are
/// slotted in with `sort_in_if_included`. Until the history is complete a
/// game ranking below the last known entry is rejected, since its true
/// position may lie in pages not loaded yet.
#[derive(Debug, Clone)]
pub struct LiveRankedGameSearch {
    set_id: TeamSetId,
    vs_set_id: Option<TeamSetId>,
    result: Option<GameResult>,
    games: Vec<GameSummary>,
    completed: bool,
}

impl LiveRankedGameSearch {
    pub fn new(set_id: TeamSetId, vs_set_id: Option<TeamSetId>, result: Option<GameResult>) -> Self {
        Self {
            set_id,
            vs_set_id,
            result,
            games: Vec::new(),
            completed: false,
        }
    }

    pub fn set_id(&self) -> &TeamSetId {
        &self.set_id
    }

    /// Whether a game passes the set / vs-set / result filter.
    pub fn includes(&self, summary: &GameSummary) -> bool {
        let Some(own) = summary.teams.iter().position(|t| t.set_id == self.set_id) else {
            return false;
        };

        match &self.vs_set_id {
            Some(vs) if *vs == self.set_id => {
                summary.teams.len() == 2 && summary.teams.iter().all(|t| t.set_id == *vs)
            }
            Some(vs) => {
                let opposed = summary
                    .teams
                    .iter()
                    .enumerate()
                    .any(|(i, t)| i != own && t.set_id == *vs);
                opposed && self.result_holds(summary, own)
            }
            None => self.result_holds(summary, own),
        }
    }

    fn result_holds(&self, summary: &GameSummary, team: usize) -> bool {
        self.result.map_or(true, |r| summary.result_for(team) == r)
    }

    /// Insert a newly ended game at its rank. Returns whether it was added.
    pub fn sort_in_if_included(&mut self, summary: GameSummary) -> bool {
        let Some(rating) = summary.rating else {
            return false;
        };
        if !self.includes(&summary) || self.contains(&summary.id) {
            return false;
        }

        let idx = self
            .games
            .partition_point(|g| ranks_before(g, rating, &summary.id));
        if !self.completed && idx == self.games.len() {
            debug!("Game {} ranks past the loaded tail, skipped", summary.id);
            return false;
        }

        self.games.insert(idx, summary);
        true
    }

    /// Append a page of history, already in rank order.
    pub fn push_page(&mut self, games: Vec<GameSummary>, completed: bool) {
        for game in games {
            if game.rating.is_some() && self.includes(&game) && !self.contains(&game.id) {
                self.games.push(game);
            }
        }
        self.completed = completed;
    }

    pub fn get_results(&self, offset: usize, limit: usize) -> &[GameSummary] {
        let start = offset.min(self.games.len());
        let end = start.saturating_add(limit).min(self.games.len());
        &self.games[start..end]
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn contains(&self, id: &GameId) -> bool {
        self.games.iter().any(|g| g.id == *id)
    }
}

/// Rating descending, then id ascending.
fn ranks_before(game: &GameSummary, rating: f64, id: &GameId) -> bool {
    let game_rating = game.rating.unwrap_or(f64::NEG_INFINITY);
    match game_rating.total_cmp(&rating) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => game.id < *id,
    }
}
