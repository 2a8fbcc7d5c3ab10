//! Tag vocabulary for one game type.
//!
//! The game type owns the unit catalog and tagging rules. This crate only
//! consumes what it exposes:
//! - keyword → tag lookup (`tag_by_keyword`)
//! - alias phrases for the query grammar
//! - small in-memory candidate lists keyed by index path (`local_tag_by_path`)
//! - designer-authored predefined sets
//! - tags of a team set (`team_set_tags`)

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::models::{Tag, TeamSet};
use crate::query::{AliasTable, QueryGrammar};

/// Tag a keyword resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTag {
    #[serde(rename = "type")]
    pub tag_type: String,

    pub name: String,

    /// Whether the tag carries a cardinal count (unit counts do)
    #[serde(default)]
    pub countable: bool,
}

impl KeywordTag {
    pub fn new(tag_type: impl Into<String>, name: impl Into<String>, countable: bool) -> Self {
        Self {
            tag_type: tag_type.into(),
            name: name.into(),
            countable,
        }
    }
}

/// One `[[keywords]]` entry of a vocabulary file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    pub keyword: String,

    #[serde(flatten)]
    pub tag: KeywordTag,
}

/// Vocabulary file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameTypeConfig {
    pub id: String,

    #[serde(default)]
    pub keywords: Vec<KeywordConfig>,

    /// Alias phrase → OR-groups of terms
    #[serde(default)]
    pub aliases: HashMap<String, Vec<Vec<String>>>,
}

/// Tag vocabulary and designer sets of one game type.
#[derive(Debug, Clone, Default)]
pub struct GameType {
    id: String,
    keywords: HashMap<String, KeywordTag>,
    grammar: QueryGrammar,
    local_tags: HashMap<String, Vec<Arc<TeamSet>>>,
    sets: Vec<Arc<TeamSet>>,
}

impl GameType {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Build a game type from its vocabulary file contents.
    pub fn from_config(config: GameTypeConfig) -> Self {
        let mut game_type = Self::new(config.id);
        for entry in config.keywords {
            game_type.add_keyword(&entry.keyword, entry.tag);
        }
        let aliases = AliasTable::from_pairs(config.aliases);
        game_type.grammar.set_aliases(aliases);
        game_type
    }

    /// Load a vocabulary TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: GameTypeConfig = toml::from_str(&contents)?;
        if config.id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Game type id must not be empty".to_string(),
            ));
        }

        let game_type = Self::from_config(config);
        debug!(
            "Loaded game type {} with {} keywords",
            game_type.id,
            game_type.keywords.len()
        );
        Ok(game_type)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register a keyword (matched case-insensitively, whitespace-normalized).
    pub fn add_keyword(&mut self, keyword: &str, tag: KeywordTag) {
        let key = keyword
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        self.grammar.add_keyword(&key);
        self.keywords.insert(key, tag);
    }

    /// Builder method to add a keyword.
    pub fn with_keyword(mut self, keyword: &str, tag: KeywordTag) -> Self {
        self.add_keyword(keyword, tag);
        self
    }

    /// Builder method to set the alias table.
    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.grammar.set_aliases(aliases);
        self
    }

    /// Builder method to expose an in-memory candidate list for a path.
    pub fn with_local_tag(mut self, path: impl Into<String>, sets: Vec<TeamSet>) -> Self {
        self.local_tags
            .insert(path.into(), sets.into_iter().map(Arc::new).collect());
        self
    }

    /// Builder method to add designer-authored sets.
    pub fn with_sets(mut self, sets: Vec<TeamSet>) -> Self {
        self.sets.extend(sets.into_iter().map(Arc::new));
        self
    }

    /// Tag a lowercase keyword phrase resolves to.
    pub fn tag_by_keyword(&self, keyword: &str) -> Option<&KeywordTag> {
        self.keywords.get(keyword)
    }

    /// Number of words in the longest keyword.
    pub fn max_keyword_words(&self) -> usize {
        self.keywords
            .keys()
            .map(|k| k.split(' ').count())
            .max()
            .unwrap_or(0)
    }

    /// In-memory candidates for an index path, if the game type keeps any.
    pub fn local_tag_by_path(&self, path: &str) -> Option<&[Arc<TeamSet>]> {
        self.local_tags.get(path).map(Vec::as_slice)
    }

    /// Designer-authored predefined sets.
    pub fn sets(&self) -> &[Arc<TeamSet>] {
        &self.sets
    }

    /// Tags of a team set.
    pub fn team_set_tags<'a>(&self, team_set: &'a TeamSet) -> &'a [Tag] {
        &team_set.tags
    }

    /// Query grammar using this game type's aliases.
    pub fn grammar(&self) -> &QueryGrammar {
        &self.grammar
    }
}
