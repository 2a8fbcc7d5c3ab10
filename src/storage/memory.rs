//! In-memory paged index provider over loaded team sets.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::{jsonl, StorageConfig, StorageError};
use crate::index::path;
use crate::models::{Metric, TeamSet};
use crate::search::{Page, PageProvider, PageRequest, ProviderError};

/// Serves every index path of one game type from memory.
///
/// Lists are sorted per metric on first use. Scans stop with a truncated
/// page once `max_scan_pages` pages of one index have been served.
pub struct MemoryPageProvider {
    game_type_id: String,
    page_size: usize,
    max_scan_pages: usize,
    by_path: HashMap<String, Vec<Arc<TeamSet>>>,
    sorted: Mutex<HashMap<(String, Metric), Arc<Vec<Arc<TeamSet>>>>>,
}

impl MemoryPageProvider {
    pub fn new(
        game_type_id: impl Into<String>,
        sets: Vec<TeamSet>,
        page_size: usize,
        max_scan_pages: usize,
    ) -> Self {
        let game_type_id = game_type_id.into();
        let mut by_path: HashMap<String, Vec<Arc<TeamSet>>> = HashMap::new();

        for set in sets.into_iter().filter(|s| s.game_type_id == game_type_id) {
            let set = Arc::new(set);
            for p in path::tag_paths(&set.tags) {
                by_path.entry(p).or_default().push(Arc::clone(&set));
            }
        }

        Self {
            game_type_id,
            page_size: page_size.max(1),
            max_scan_pages,
            by_path,
            sorted: Mutex::new(HashMap::new()),
        }
    }

    /// Load the stored team sets of a game type.
    pub fn from_storage(
        config: &StorageConfig,
        game_type_id: &str,
        page_size: usize,
        max_scan_pages: usize,
    ) -> Result<Self, StorageError> {
        let sets = jsonl::read_team_sets(config, game_type_id)?;
        Ok(Self::new(game_type_id, sets, page_size, max_scan_pages))
    }

    pub fn game_type_id(&self) -> &str {
        &self.game_type_id
    }

    /// Every set, root index order unspecified.
    pub fn team_sets(&self) -> &[Arc<TeamSet>] {
        self.by_path.get(path::ROOT).map(Vec::as_slice).unwrap_or(&[])
    }

    fn sorted(&self, index_path: &str, metric: Metric) -> Arc<Vec<Arc<TeamSet>>> {
        let key = (index_path.to_string(), metric);
        let mut sorted = self.sorted.lock();
        if let Some(list) = sorted.get(&key) {
            return Arc::clone(list);
        }

        let mut list = self.by_path.get(index_path).cloned().unwrap_or_default();
        list.sort_by(|a, b| metric.compare(a, b));
        let list = Arc::new(list);
        sorted.insert(key, Arc::clone(&list));
        list
    }
}

#[async_trait]
impl PageProvider for MemoryPageProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<Page, ProviderError> {
        if request.game_type_id != self.game_type_id {
            return Err(StorageError::UnknownGameType(request.game_type_id).into());
        }

        let list = self.sorted(&request.index_path, request.metric);
        let start = request.page.saturating_mul(self.page_size).min(list.len());
        let end = start.saturating_add(self.page_size).min(list.len());

        if request.page >= self.max_scan_pages && start < list.len() {
            debug!(
                "Refusing page {} of {}: scan cap of {} pages",
                request.page, request.index_path, self.max_scan_pages
            );
            return Ok(Page {
                completed: false,
                truncated: true,
                team_sets: Vec::new(),
            });
        }

        Ok(Page {
            completed: end >= list.len(),
            truncated: false,
            team_sets: list[start..end].to_vec(),
        })
    }
}
