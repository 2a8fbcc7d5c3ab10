use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::path::{self, ROOT};
use super::IndexError;
use crate::models::TeamSet;
use crate::query::{parse_count, QueryError, TermGroups};
use crate::vocab::{GameType, KeywordTag};

/// Approximate cardinality of one facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: String,

    /// Upper bound on the number of sets under this path
    pub count: u64,

    /// Disabled indexes are still counted but never selected for scans
    pub disabled: bool,
}

/// Index chosen to scan for a query.
#[derive(Debug, Clone)]
pub enum IndexSelection {
    /// Small candidate list the game type keeps in memory
    Local {
        path: String,
        candidates: Vec<Arc<TeamSet>>,
    },
    /// Stored index served page by page
    Stored { path: String, count: u64 },
}

impl IndexSelection {
    pub fn path(&self) -> &str {
        match self {
            IndexSelection::Local { path, .. } | IndexSelection::Stored { path, .. } => path,
        }
    }

    /// Approximate number of sets the scan will visit.
    pub fn approximate_count(&self) -> u64 {
        match self {
            IndexSelection::Local { candidates, .. } => candidates.len() as u64,
            IndexSelection::Stored { count, .. } => *count,
        }
    }
}

/// Per-game-type facet counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardinalityIndex {
    game_type_id: String,
    indexes: BTreeMap<String, IndexEntry>,
}

impl CardinalityIndex {
    pub fn new(game_type_id: impl Into<String>) -> Self {
        let mut indexes = BTreeMap::new();
        indexes.insert(
            ROOT.to_string(),
            IndexEntry {
                path: ROOT.to_string(),
                count: 0,
                disabled: false,
            },
        );

        Self {
            game_type_id: game_type_id.into(),
            indexes,
        }
    }

    pub fn game_type_id(&self) -> &str {
        &self.game_type_id
    }

    pub fn entry(&self, path: &str) -> Option<&IndexEntry> {
        self.indexes.get(path)
    }

    /// Entries in path order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.indexes.values()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Number of sets ever applied.
    pub fn root_count(&self) -> u64 {
        self.indexes.get(ROOT).map(|e| e.count).unwrap_or(0)
    }

    fn check_game_type(&self, found: &str) -> Result<(), IndexError> {
        if found != self.game_type_id {
            return Err(IndexError::GameTypeMismatch {
                expected: self.game_type_id.clone(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    /// Resolve every AND-group of a parsed query to index paths.
    pub fn get_filters_from_query(
        &self,
        game_type: &GameType,
        groups: &TermGroups,
    ) -> Result<Vec<Vec<String>>, IndexError> {
        groups
            .iter()
            .map(|group| self.filters_for_group(game_type, group))
            .collect()
    }

    /// Resolve one AND-group to index paths.
    ///
    /// Words are matched greedily against the keyword vocabulary, longest
    /// window first. A count word is only consumed when the window starting
    /// at it is not itself a keyword.
    pub fn filters_for_group(
        &self,
        game_type: &GameType,
        group: &[String],
    ) -> Result<Vec<String>, IndexError> {
        self.check_game_type(game_type.id())?;

        let words: Vec<String> = group
            .iter()
            .flat_map(|term| term.split_whitespace())
            .map(str::to_lowercase)
            .collect();
        let max_window = game_type.max_keyword_words();
        let mut filters: Vec<String> = Vec::new();
        let mut i = 0;

        while i < words.len() {
            let start = i;
            let (tag, mut count) = match longest_match(game_type, &words[i..], max_window) {
                Some((tag, used)) => {
                    i += used;
                    (tag, None)
                }
                None => {
                    let count = parse_count(&words[i])
                        .ok_or_else(|| QueryError::UnrecognizedTerm(words[i].clone()))?;
                    i += 1;
                    let (tag, used) = longest_match(game_type, &words[i..], max_window)
                        .ok_or_else(|| {
                            QueryError::UnrecognizedTerm(words[start..].join(" "))
                        })?;
                    i += used;
                    (tag, Some(count))
                }
            };

            if words.get(i).map(String::as_str) == Some("less") {
                i += 1;
                if count.is_some() {
                    return Err(QueryError::IllegalCount(words[start..i].join(" ")).into());
                }
                count = Some(0);
            }

            let filter = match count {
                Some(_) if !tag.countable => {
                    return Err(QueryError::CountNotAllowed(words[start..i].join(" ")).into());
                }
                Some(c) => path::count_path(&tag.tag_type, &tag.name, c),
                None => path::tag_path(&tag.tag_type, &tag.name),
            };
            if !filters.contains(&filter) {
                filters.push(filter);
            }
        }

        Ok(filters)
    }

    /// Index paths implied by a set's tags, root included.
    ///
    /// Paths seen for the first time are registered disabled so a new facet
    /// never slows down scans before `optimize` has judged it.
    pub fn get_index_paths(&mut self, team_set: &TeamSet, include_disabled: bool) -> Vec<String> {
        path::tag_paths(&team_set.tags)
            .into_iter()
            .filter(|p| {
                let entry = self.indexes.entry(p.clone()).or_insert_with(|| {
                    debug!("Registering index {}", p);
                    IndexEntry {
                        path: p.clone(),
                        count: 0,
                        disabled: p != ROOT,
                    }
                });
                include_disabled || !entry.disabled
            })
            .collect()
    }

    /// Count a newly created set under all of its paths.
    pub fn apply_set(&mut self, team_set: &TeamSet) -> Result<(), IndexError> {
        self.check_game_type(&team_set.game_type_id)?;

        for p in self.get_index_paths(team_set, true) {
            if let Some(entry) = self.indexes.get_mut(&p) {
                entry.count += 1;
            }
        }
        Ok(())
    }

    /// Recompute which indexes are worth scanning.
    ///
    /// An index is disabled when it holds more than 2/3 of its nearest
    /// enabled ancestor. Shallow paths are settled first so each decision
    /// sees final ancestor states. Returns the number of enabled indexes.
    pub fn optimize(&mut self) -> usize {
        let mut order: Vec<String> = self.indexes.keys().cloned().collect();
        order.sort_by(|a, b| path::depth(a).cmp(&path::depth(b)).then_with(|| a.cmp(b)));

        for p in order.iter().filter(|p| p.as_str() != ROOT) {
            let parent_count = path::ancestors(p)
                .iter()
                .find_map(|a| self.indexes.get(a).filter(|e| !e.disabled).map(|e| e.count))
                .unwrap_or_else(|| self.root_count());

            if let Some(entry) = self.indexes.get_mut(p) {
                entry.disabled = entry.count * 3 > parent_count * 2;
            }
        }

        let enabled = self.indexes.values().filter(|e| !e.disabled).count();
        info!(
            "Optimized index for {}: {} of {} paths enabled",
            self.game_type_id,
            enabled,
            self.indexes.len()
        );
        enabled
    }

    /// Choose the cheapest index to scan for `filters`.
    ///
    /// An in-memory local index wins over any stored one (smallest first).
    /// Otherwise the enabled index with the lowest count among the filters
    /// and their ancestors is picked; the root is always a candidate.
    pub fn select_index(
        &self,
        game_type: &GameType,
        filters: &[String],
    ) -> Result<IndexSelection, IndexError> {
        self.check_game_type(game_type.id())?;

        let local = filters
            .iter()
            .filter_map(|f| game_type.local_tag_by_path(f).map(|c| (f, c)))
            .min_by_key(|(f, c)| (c.len(), f.as_str()));
        if let Some((p, candidates)) = local {
            return Ok(IndexSelection::Local {
                path: p.clone(),
                candidates: candidates.to_vec(),
            });
        }

        let mut candidates: BTreeSet<&str> = BTreeSet::new();
        candidates.insert(ROOT);
        let chains: Vec<Vec<String>> = filters.iter().map(|f| path::ancestors(f)).collect();
        for (filter, chain) in filters.iter().zip(&chains) {
            candidates.insert(filter);
            candidates.extend(chain.iter().map(String::as_str));
        }

        let best = candidates
            .into_iter()
            .filter_map(|p| self.indexes.get(p))
            .filter(|e| !e.disabled)
            .min_by_key(|e| (e.count, Reverse(path::depth(&e.path)), e.path.as_str()));

        Ok(match best {
            Some(entry) => IndexSelection::Stored {
                path: entry.path.clone(),
                count: entry.count,
            },
            None => IndexSelection::Stored {
                path: ROOT.to_string(),
                count: self.root_count(),
            },
        })
    }
}

/// Longest keyword at the head of `words`, with the number of words used.
fn longest_match<'a>(
    game_type: &'a GameType,
    words: &[String],
    max_window: usize,
) -> Option<(&'a KeywordTag, usize)> {
    (1..=words.len().min(max_window))
        .rev()
        .find_map(|n| game_type.tag_by_keyword(&words[..n].join(" ")).map(|t| (t, n)))
}
