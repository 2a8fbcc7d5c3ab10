//! Single AND-group search over one selected index.

use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{FilterCache, Page, PageProvider, PageRequest, SearchError, SearchTotal};
use crate::index::{CardinalityIndex, IndexSelection};
use crate::models::{Metric, TeamSet, TeamSetId};
use crate::vocab::GameType;

/// Lazily paged, client-side filtered scan of one index.
///
/// Results are in metric order. Pages are only fetched when a caller asks
/// past what has already been materialized.
///
/// Designer sets that match the filters are ranked in at default stats
/// unless the stored stream carries them. Until the stream ends, a stored
/// set ranking behind an unresolved designer set is held back, so a
/// materialized prefix is never reordered.
pub struct FacetedSearch {
    game_type: Arc<GameType>,
    metric: Metric,
    terms: Vec<String>,
    filters: Vec<String>,
    residual: Vec<String>,
    selection: IndexSelection,
    provider: Arc<dyn PageProvider>,
    cache: Arc<FilterCache>,
    results: Vec<Arc<TeamSet>>,
    /// Matching stored sets ranked behind `pending[0]`, in stream order
    held: VecDeque<Arc<TeamSet>>,
    /// Designer sets not yet seen in the stream, in metric order
    pending: Vec<Arc<TeamSet>>,
    observed: HashSet<TeamSetId>,
    unfiltered_seen: usize,
    next_page: usize,
    completed: bool,
    truncated: bool,
}

impl FacetedSearch {
    /// Resolve `terms` to filters and pick the index to scan.
    pub fn new(
        index: &CardinalityIndex,
        game_type: Arc<GameType>,
        metric: Metric,
        terms: Vec<String>,
        provider: Arc<dyn PageProvider>,
        cache: Arc<FilterCache>,
    ) -> Result<Self, SearchError> {
        if cache.game_type_id() != game_type.id() {
            return Err(SearchError::Misconfigured(format!(
                "filter cache for {} used with game type {}",
                cache.game_type_id(),
                game_type.id()
            )));
        }

        let filters = index.filters_for_group(&game_type, &terms)?;
        let selection = index.select_index(&game_type, &filters)?;
        let residual: Vec<String> = filters
            .iter()
            .filter(|f| f.as_str() != selection.path())
            .cloned()
            .collect();

        let mut pending: Vec<Arc<TeamSet>> = game_type
            .sets()
            .iter()
            .filter(|s| s.game_type_id == game_type.id() && cache.matches(s, &filters))
            .map(|s| Arc::new(s.with_default_stats()))
            .collect();
        pending.sort_by(|a, b| metric.compare(a, b));
        pending.dedup_by(|a, b| a.id == b.id);

        debug!(
            "Search {:?} scans {} (~{}) with {} residual filters and {} designer sets",
            terms,
            selection.path(),
            selection.approximate_count(),
            residual.len(),
            pending.len()
        );

        Ok(Self {
            game_type,
            metric,
            terms,
            filters,
            residual,
            selection,
            provider,
            cache,
            results: Vec::new(),
            held: VecDeque::new(),
            pending,
            observed: HashSet::new(),
            unfiltered_seen: 0,
            next_page: 0,
            completed: false,
            truncated: false,
        })
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// All filters the query resolved to.
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Filters still checked client-side.
    pub fn residual_filters(&self) -> &[String] {
        &self.residual
    }

    pub fn selected_path(&self) -> &str {
        self.selection.path()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Results materialized so far.
    pub fn materialized(&self) -> &[Arc<TeamSet>] {
        &self.results
    }

    /// Results `[offset, offset + limit)`, fetching pages as needed.
    pub async fn get_results(
        &mut self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Arc<TeamSet>>, SearchError> {
        self.fill(offset.saturating_add(limit)).await?;
        Ok(self.results.iter().skip(offset).take(limit).cloned().collect())
    }

    /// The result at `position`, or `None` once the stream has ended.
    pub async fn team_set_at(&mut self, position: usize) -> Result<Option<Arc<TeamSet>>, SearchError> {
        self.fill(position + 1).await?;
        Ok(self.results.get(position).cloned())
    }

    /// Exact once complete, otherwise an estimate from the index count.
    pub fn count(&self) -> SearchTotal {
        let filtered = (self.results.len() + self.held.len()) as u64;
        if self.completed {
            return SearchTotal {
                count: filtered,
                fuzzy: false,
                truncated: false,
            };
        }

        let estimate = (self.selection.approximate_count() + filtered)
            .saturating_sub(self.unfiltered_seen as u64)
            .max(filtered);
        SearchTotal {
            count: estimate,
            fuzzy: !self.residual.is_empty(),
            truncated: self.truncated,
        }
    }

    async fn fill(&mut self, needed: usize) -> Result<(), SearchError> {
        while self.results.len() < needed && !self.completed && !self.truncated {
            let page = match &self.selection {
                IndexSelection::Local { candidates, .. } => {
                    let mut team_sets = candidates.clone();
                    team_sets.sort_by(|a, b| self.metric.compare(a, b));
                    Page {
                        completed: true,
                        truncated: false,
                        team_sets,
                    }
                }
                IndexSelection::Stored { path, .. } => {
                    let request = PageRequest {
                        game_type_id: self.game_type.id().to_string(),
                        index_path: path.clone(),
                        metric: self.metric,
                        page: self.next_page,
                    };
                    self.provider.fetch_page(request).await?
                }
            };
            self.next_page += 1;
            self.absorb(page);
        }
        Ok(())
    }

    fn absorb(&mut self, page: Page) {
        debug!(
            "Page {} of {} from {}: {} sets",
            self.next_page,
            self.selection.path(),
            self.provider.name(),
            page.team_sets.len()
        );
        self.unfiltered_seen += page.team_sets.len();

        for team_set in page.team_sets {
            if !self.observed.insert(team_set.id.clone()) {
                continue;
            }
            self.pending.retain(|p| p.id != team_set.id);
            if self.cache.matches(&team_set, &self.residual) {
                self.held.push_back(team_set);
            }
        }

        if page.completed {
            self.completed = true;
            self.rank_in_pending();
        } else if page.truncated {
            warn!(
                "Scan of {} truncated after {} sets, {} designer sets unresolved",
                self.selection.path(),
                self.unfiltered_seen,
                self.pending.len()
            );
            self.truncated = true;
            self.pending.clear();
            self.results.extend(self.held.drain(..));
        } else {
            self.release_held();
        }
    }

    /// Move held sets that rank before every unresolved designer set.
    fn release_held(&mut self) {
        while let Some(head) = self.held.front() {
            let ranks_first = self
                .pending
                .first()
                .map_or(true, |p| self.metric.compare(head, p) == Ordering::Less);
            if !ranks_first {
                break;
            }
            if let Some(head) = self.held.pop_front() {
                self.results.push(head);
            }
        }
    }

    /// The stream has ended: what is still pending was never stored.
    fn rank_in_pending(&mut self) {
        let mut tail: Vec<Arc<TeamSet>> = self.held.drain(..).collect();
        tail.append(&mut self.pending);
        tail.sort_by(|a, b| self.metric.compare(a, b));
        self.results.extend(tail);
    }
}

impl std::fmt::Debug for FacetedSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacetedSearch")
            .field("terms", &self.terms)
            .field("selected", &self.selection.path())
            .field("residual", &self.residual)
            .field("results", &self.results.len())
            .field("held", &self.held.len())
            .field("pending", &self.pending.len())
            .field("completed", &self.completed)
            .field("truncated", &self.truncated)
            .finish()
    }
}
