//! Local team set data store.
//!
//! One directory per game type under the data dir:
//! - `vocab.toml` keyword and alias vocabulary
//! - `team_sets.jsonl` stored team sets with stats
//! - `predefined_sets.jsonl` designer sets
//! - `games.jsonl` finished game summaries
//! - `index.json` cardinality index snapshot

pub mod jsonl;
pub mod memory;

pub use jsonl::{JsonlReader, JsonlWriter};
pub use memory::MemoryPageProvider;

use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::index::CardinalityIndex;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown game type: {0}")]
    UnknownGameType(String),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn game_type_dir(&self, game_type_id: &str) -> PathBuf {
        self.data_dir.join(game_type_id)
    }

    pub fn vocab_path(&self, game_type_id: &str) -> PathBuf {
        self.game_type_dir(game_type_id).join("vocab.toml")
    }

    pub fn team_sets_path(&self, game_type_id: &str) -> PathBuf {
        self.game_type_dir(game_type_id).join("team_sets.jsonl")
    }

    /// Designer-authored sets offered even before anyone stores them.
    pub fn predefined_sets_path(&self, game_type_id: &str) -> PathBuf {
        self.game_type_dir(game_type_id).join("predefined_sets.jsonl")
    }

    pub fn games_path(&self, game_type_id: &str) -> PathBuf {
        self.game_type_dir(game_type_id).join("games.jsonl")
    }

    pub fn index_path(&self, game_type_id: &str) -> PathBuf {
        self.game_type_dir(game_type_id).join("index.json")
    }

    /// Load the saved index snapshot of a game type, if any.
    pub fn load_index(&self, game_type_id: &str) -> Result<Option<CardinalityIndex>, StorageError> {
        let path = self.index_path(game_type_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Replace the index snapshot of a game type.
    pub fn save_index(&self, index: &CardinalityIndex) -> Result<PathBuf, StorageError> {
        let path = self.index_path(index.game_type_id());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(index)?)?;
        info!("Saved index snapshot with {} paths to {:?}", index.len(), path);
        Ok(path)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
