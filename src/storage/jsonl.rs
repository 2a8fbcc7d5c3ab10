//! JSON Lines files of team sets and game summaries.
//!
//! One entity per line. Unparseable lines are skipped with a warning when
//! reading a whole file so one bad record does not hide the rest.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::{StorageConfig, StorageError};
use crate::models::{GameSummary, TeamSet};

/// Typed JSONL writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with `entities`.
    pub fn write_all(&self, entities: &[T]) -> Result<usize, StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(&self.path)?);
        for entity in entities {
            serde_json::to_writer(&mut writer, entity)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        info!("Wrote {} entities to {:?}", entities.len(), self.path);
        Ok(entities.len())
    }
}

/// Typed JSONL reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read every parseable entity. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut entities = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entity) => entities.push(entity),
                Err(e) => warn!("Skipping line {} in {:?}: {}", i + 1, self.path, e),
            }
        }

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(entities)
    }

    /// Read entities matching a predicate.
    pub fn read_where<F>(&self, predicate: F) -> Result<Vec<T>, StorageError>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.read_all()?.into_iter().filter(predicate).collect())
    }
}

/// Stored team sets of a game type.
pub fn read_team_sets(config: &StorageConfig, game_type_id: &str) -> Result<Vec<TeamSet>, StorageError> {
    JsonlReader::new(config.team_sets_path(game_type_id))
        .read_where(|s: &TeamSet| s.game_type_id == game_type_id)
}

/// Designer sets of a game type.
pub fn read_predefined_sets(
    config: &StorageConfig,
    game_type_id: &str,
) -> Result<Vec<TeamSet>, StorageError> {
    JsonlReader::new(config.predefined_sets_path(game_type_id))
        .read_where(|s: &TeamSet| s.game_type_id == game_type_id)
}

/// Finished games of a game type, in file order.
pub fn read_games(config: &StorageConfig, game_type_id: &str) -> Result<Vec<GameSummary>, StorageError> {
    JsonlReader::new(config.games_path(game_type_id))
        .read_where(|g: &GameSummary| g.game_type_id == game_type_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameTeam, Tag, UnitPlacement};
    use tempfile::TempDir;

    fn team_set(x: i32) -> TeamSet {
        TeamSet::new(
            "classic",
            vec![UnitPlacement::new("Knight", x, 0)],
            vec![Tag::counted("unit", "Knight", 1)],
        )
    }

    #[test]
    fn test_write_and_read_team_sets() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        let sets = vec![team_set(0), team_set(1).with_name("Flank")];

        let writer = JsonlWriter::new(config.team_sets_path("classic"));
        assert_eq!(writer.write_all(&sets).unwrap(), 2);

        let read = read_team_sets(&config, "classic").unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].id, sets[0].id);
        assert_eq!(read[1].name.as_deref(), Some("Flank"));
        assert_eq!(read[1].tags, sets[1].tags);
    }

    #[test]
    fn test_read_filters_other_game_types() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        let stray = TeamSet::new("chaos", vec![], vec![]);

        let writer = JsonlWriter::new(config.team_sets_path("classic"));
        writer.write_all(&[team_set(0), stray]).unwrap();

        assert_eq!(read_team_sets(&config, "classic").unwrap().len(), 1);
    }

    #[test]
    fn test_read_games_in_file_order() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        let writer = JsonlWriter::new(config.games_path("classic"));

        let game = |id: &str| {
            GameSummary::new(
                id,
                "classic",
                vec![GameTeam::new("alice", "s1"), GameTeam::new("bob", "s2")],
            )
            .with_rating(800.0)
        };

        assert_eq!(writer.write_all(&[game("g2"), game("g1"), game("g3")]).unwrap(), 3);

        let read = read_games(&config, "classic").unwrap();
        let ids: Vec<&str> = read.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["g2", "g1", "g3"]);
        assert_eq!(read[2].rating, Some(800.0));
    }

    #[test]
    fn test_write_all_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sets.jsonl");
        let writer = JsonlWriter::new(path.clone());
        let reader: JsonlReader<TeamSet> = JsonlReader::new(path);

        writer.write_all(&[team_set(0), team_set(1)]).unwrap();
        writer.write_all(&[team_set(2)]).unwrap();

        let read = reader.read_all().unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].id, team_set(2).id);
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());

        assert!(read_games(&config, "classic").unwrap().is_empty());

        let reader: JsonlReader<TeamSet> = JsonlReader::new(config.team_sets_path("classic"));
        assert!(!reader.exists());
        assert!(reader.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_read_all_skips_bad_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sets.jsonl");
        let good = serde_json::to_string(&team_set(0)).unwrap();
        std::fs::write(&path, format!("{}\nnot-json\n\n{}\n", good, good)).unwrap();

        let reader: JsonlReader<TeamSet> = JsonlReader::new(path);
        assert_eq!(reader.read_all().unwrap().len(), 2);
    }
}
