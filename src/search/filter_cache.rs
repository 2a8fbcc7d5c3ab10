//! Memoized team set → index path resolution.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::index::path;
use crate::models::{TeamSet, TeamSetId};

/// Bounded per-game-type cache of each team set's full path set.
///
/// Shared by every search of a game type, so a set filtered once is not
/// resolved again by later pages or other OR-branches.
pub struct FilterCache {
    game_type_id: String,
    entries: Mutex<LruCache<TeamSetId, Arc<BTreeSet<String>>>>,
}

impl FilterCache {
    pub fn new(game_type_id: impl Into<String>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            game_type_id: game_type_id.into(),
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn game_type_id(&self) -> &str {
        &self.game_type_id
    }

    /// All index paths of a set, computed at most once while cached.
    pub fn paths_for(&self, team_set: &TeamSet) -> Arc<BTreeSet<String>> {
        let mut entries = self.entries.lock();
        if let Some(paths) = entries.get(&team_set.id) {
            return Arc::clone(paths);
        }

        let paths = Arc::new(path::tag_paths(&team_set.tags));
        entries.put(team_set.id.clone(), Arc::clone(&paths));
        paths
    }

    /// Whether a set satisfies every filter path.
    pub fn matches(&self, team_set: &TeamSet, filters: &[String]) -> bool {
        if filters.is_empty() {
            return true;
        }
        let paths = self.paths_for(team_set);
        filters.iter().all(|f| paths.contains(f))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl std::fmt::Debug for FilterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterCache")
            .field("game_type_id", &self.game_type_id)
            .field("len", &self.len())
            .finish()
    }
}
