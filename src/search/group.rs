//! OR-branch merge.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{info, warn};

use super::{FacetedSearch, FilterCache, PageProvider, SearchError, SearchTotal};
use crate::index::CardinalityIndex;
use crate::models::{Metric, TeamSet, TeamSetId};
use crate::vocab::GameType;

/// Rank-ordered, deduplicated union of several faceted searches.
pub struct SearchGroup {
    metric: Metric,
    branches: Vec<FacetedSearch>,
    /// Next unconsumed position per branch
    offsets: Vec<usize>,
    results: Vec<Arc<TeamSet>>,
    merged: HashSet<TeamSetId>,
    completed: bool,
    truncated: bool,
}

impl SearchGroup {
    pub fn new(metric: Metric, branches: Vec<FacetedSearch>) -> Result<Self, SearchError> {
        if branches.is_empty() {
            return Err(SearchError::Misconfigured(
                "search group needs at least one branch".to_string(),
            ));
        }

        Ok(Self {
            metric,
            offsets: vec![0; branches.len()],
            branches,
            results: Vec::new(),
            merged: HashSet::new(),
            completed: false,
            truncated: false,
        })
    }

    /// Parse `text` and build one branch per OR-alternative.
    pub fn from_query(
        index: &CardinalityIndex,
        game_type: Arc<GameType>,
        metric: Metric,
        text: &str,
        provider: Arc<dyn PageProvider>,
        cache: Arc<FilterCache>,
    ) -> Result<Self, SearchError> {
        let groups = game_type.grammar().parse(text)?;
        let branches = groups
            .into_iter()
            .map(|terms| {
                FacetedSearch::new(
                    index,
                    Arc::clone(&game_type),
                    metric,
                    terms,
                    Arc::clone(&provider),
                    Arc::clone(&cache),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(metric, branches)
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn branches(&self) -> &[FacetedSearch] {
        &self.branches
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Merge until `target` results exist or the stream ends.
    ///
    /// Each round asks every branch for its head concurrently and takes the
    /// best one. Ties go to the earlier branch.
    pub async fn get_team_sets(&mut self, target: usize) -> Result<(), SearchError> {
        while self.results.len() < target && !self.completed && !self.truncated {
            let heads = try_join_all(
                self.branches
                    .iter_mut()
                    .zip(&self.offsets)
                    .map(|(branch, &offset)| branch.team_set_at(offset)),
            )
            .await?;

            let mut best: Option<(usize, Arc<TeamSet>)> = None;
            let mut stalled = false;
            for (i, head) in heads.into_iter().enumerate() {
                let Some(team_set) = head else {
                    stalled |= self.branches[i].is_truncated();
                    continue;
                };
                let better = match &best {
                    Some((_, current)) => self.metric.compare(&team_set, current) == Ordering::Less,
                    None => true,
                };
                if better {
                    best = Some((i, team_set));
                }
            }

            if stalled {
                warn!(
                    "Search group truncated after {} merged results",
                    self.results.len()
                );
                self.truncated = true;
                break;
            }

            match best {
                Some((i, team_set)) => {
                    self.offsets[i] += 1;
                    if self.merged.insert(team_set.id.clone()) {
                        self.results.push(team_set);
                    }
                }
                None => self.finish(),
            }
        }
        Ok(())
    }

    /// Results `[offset, offset + limit)`.
    pub async fn get_results(
        &mut self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Arc<TeamSet>>, SearchError> {
        self.get_team_sets(offset.saturating_add(limit)).await?;
        Ok(self.results.iter().skip(offset).take(limit).cloned().collect())
    }

    pub fn get_total(&self) -> SearchTotal {
        if self.completed {
            return SearchTotal {
                count: self.results.len() as u64,
                fuzzy: false,
                truncated: false,
            };
        }

        let estimate: u64 = self.branches.iter().map(|b| b.count().count).sum();
        SearchTotal {
            count: estimate.max(self.results.len() as u64),
            fuzzy: true,
            truncated: self.truncated,
        }
    }

    fn finish(&mut self) {
        let mut union: Vec<Arc<TeamSet>> = self
            .branches
            .iter()
            .flat_map(|b| b.materialized().iter().cloned())
            .collect();
        union.sort_by(|a, b| self.metric.compare(a, b));

        let mut seen = HashSet::new();
        union.retain(|s| seen.insert(s.id.clone()));

        info!(
            "Search group of {} branches completed with {} results",
            self.branches.len(),
            union.len()
        );
        self.merged = seen;
        self.results = union;
        self.completed = true;
    }
}

impl std::fmt::Debug for SearchGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchGroup")
            .field("metric", &self.metric)
            .field("branches", &self.branches)
            .field("offsets", &self.offsets)
            .field("results", &self.results.len())
            .field("completed", &self.completed)
            .field("truncated", &self.truncated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Tag, UnitPlacement};
    use crate::query::AliasTable;
    use crate::search::mock::MockProvider;
    use crate::vocab::KeywordTag;
    use pretty_assertions::assert_eq;

    fn game_type() -> GameType {
        GameType::new("classic")
            .with_keyword("knight", KeywordTag::new("unit", "Knight", true))
            .with_keyword("scout", KeywordTag::new("unit", "Scout", true))
            .with_keyword("randomhitchance false", KeywordTag::new("randomHitChance", "false", false))
            .with_aliases(AliasTable::from_pairs([(
                "no luck",
                vec![vec!["randomhitchance false"]],
            )]))
    }

    fn set(x: i32, rating: f64, tags: Vec<Tag>) -> TeamSet {
        let mut s = TeamSet::new("classic", vec![UnitPlacement::new("Knight", x, 0)], tags);
        s.stats.rating = rating;
        s
    }

    /// Knights: 0, 2, 3, 4. Scouts: 3, 4, 5. Ordered by rating.
    fn stored_sets() -> Vec<TeamSet> {
        (0..6)
            .map(|i| {
                let mut tags = Vec::new();
                if i % 2 == 0 || i == 3 {
                    tags.push(Tag::counted("unit", "Knight", 1));
                }
                if i >= 3 {
                    tags.push(Tag::counted("unit", "Scout", 1));
                }
                set(i, 1000.0 - i as f64 * 10.0, tags)
            })
            .collect()
    }

    /// No optimize pass, so every facet stays disabled and branches scan the root.
    fn index_for(sets: &[TeamSet]) -> CardinalityIndex {
        let mut index = CardinalityIndex::new("classic");
        for s in sets {
            index.apply_set(s).unwrap();
        }
        index
    }

    fn group(text: &str, sets: &[TeamSet], provider: Arc<MockProvider>) -> Result<SearchGroup, SearchError> {
        SearchGroup::from_query(
            &index_for(sets),
            Arc::new(game_type()),
            Metric::Rating,
            text,
            provider,
            Arc::new(FilterCache::new("classic", 64)),
        )
    }

    #[tokio::test]
    async fn test_merge_is_sorted_without_duplicates() {
        let sets = stored_sets();
        let expected: Vec<TeamSetId> = [0, 2, 3, 4, 5].iter().map(|&i| sets[i].id.clone()).collect();
        let provider = Arc::new(MockProvider::new(2).with_index("/", sets.clone()));

        let mut g = group("knight or scout", &sets, provider).unwrap();
        assert_eq!(g.branches().len(), 2);

        let results = g.get_results(0, 20).await.unwrap();
        let ids: Vec<TeamSetId> = results.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, expected);
        assert!(g.is_completed());
        assert_eq!(g.get_total(), SearchTotal { count: 5, fuzzy: false, truncated: false });
    }

    #[tokio::test]
    async fn test_partial_pages_before_completion() {
        let sets = stored_sets();
        let provider = Arc::new(MockProvider::new(2).with_index("/", sets.clone()));

        let mut g = group("knight or scout", &sets, provider).unwrap();
        let first = g.get_results(0, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id, sets[0].id);
        assert_eq!(first[1].id, sets[2].id);
        assert!(!g.is_completed());

        let total = g.get_total();
        assert!(total.fuzzy);
        assert!(total.count >= 2);

        let second = g.get_results(2, 2).await.unwrap();
        assert_eq!(second[0].id, sets[3].id);
        assert_eq!(second[1].id, sets[4].id);
    }

    #[tokio::test]
    async fn test_returned_pages_stay_stable_with_designer_sets() {
        let knight = |x: i32, rating: f64| set(x, rating, vec![Tag::counted("unit", "Knight", 1)]);
        let sets = vec![
            knight(0, 800.0),
            knight(1, 700.0),
            set(2, 650.0, vec![Tag::counted("unit", "Scout", 1)]),
        ];
        let designer = knight(3, 100.0);
        let provider = Arc::new(MockProvider::new(1).with_index("/", sets.clone()));

        let mut g = SearchGroup::from_query(
            &index_for(&sets),
            Arc::new(game_type().with_sets(vec![designer.clone()])),
            Metric::Rating,
            "knight or scout",
            provider,
            Arc::new(FilterCache::new("classic", 64)),
        )
        .unwrap();

        let first = g.get_results(0, 2).await.unwrap();
        let first_ids: Vec<TeamSetId> = first.iter().map(|s| s.id.clone()).collect();
        assert_eq!(first_ids, vec![sets[0].id.clone(), designer.id.clone()]);

        let all = g.get_results(0, 10).await.unwrap();
        assert!(g.is_completed());
        let ratings: Vec<f64> = all.iter().map(|s| s.stats.rating).collect();
        assert_eq!(ratings, vec![800.0, 750.0, 700.0, 650.0]);
        let prefix: Vec<TeamSetId> = all.iter().take(2).map(|s| s.id.clone()).collect();
        assert_eq!(prefix, first_ids);
    }

    #[tokio::test]
    async fn test_equal_metric_breaks_on_id() {
        let a = set(10, 900.0, vec![Tag::counted("unit", "Knight", 1)]);
        let b = set(11, 900.0, vec![Tag::counted("unit", "Scout", 1)]);
        let mut sets = vec![a.clone(), b.clone()];
        sets.sort_by(|x, y| Metric::Rating.compare(x, y));
        let provider = Arc::new(MockProvider::new(5).with_index("/", sets.clone()));

        let mut g = group("scout or knight", &sets, provider).unwrap();
        let results = g.get_results(0, 5).await.unwrap();

        let mut expected = vec![a.id, b.id];
        expected.sort();
        let ids: Vec<TeamSetId> = results.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_truncation_propagates_to_total() {
        let sets = stored_sets();
        let provider = Arc::new(
            MockProvider::new(2)
                .with_index("/", sets.clone())
                .truncate_at("/", 1),
        );

        let mut g = group("knight or scout", &sets, provider).unwrap();
        g.get_results(0, 10).await.unwrap();

        // the scout branch runs dry on its first page and then hits the cap
        assert!(g.is_truncated());
        assert!(!g.is_completed());
        assert!(g.get_total().truncated);
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_merge() {
        let sets = stored_sets();
        let provider = Arc::new(MockProvider::new(2).fail_on("/"));

        let mut g = group("knight or scout", &sets, provider).unwrap();
        let err = g.get_results(0, 1).await.unwrap_err();
        assert!(matches!(err, SearchError::Provider(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_count_or_alias_scenario() {
        let mut sets = stored_sets();
        sets.push(set(20, 500.0, vec![Tag::counted("unit", "Knight", 2)]));
        sets.push(set(21, 400.0, vec![Tag::new("randomHitChance", "false")]));
        let provider = Arc::new(MockProvider::new(3).with_index("/", sets.clone()));

        let mut g = group("double knight or no luck", &sets, provider).unwrap();
        assert_eq!(g.branches().len(), 2);

        let results = g.get_results(0, 10).await.unwrap();
        let ids: Vec<TeamSetId> = results.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![sets[6].id.clone(), sets[7].id.clone()]);
    }

    #[test]
    fn test_malformed_query_is_client_error() {
        let sets = stored_sets();
        let err = group("knight or (scout", &sets, Arc::new(MockProvider::new(1))).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.status_code(), 412);

        let err = group("dragon", &sets, Arc::new(MockProvider::new(1))).unwrap_err();
        assert_eq!(err.status_code(), 412);
    }

    #[test]
    fn test_empty_branch_list_is_misconfiguration() {
        let err = SearchGroup::new(Metric::Rating, Vec::new()).unwrap_err();
        assert!(matches!(err, SearchError::Misconfigured(_)));
    }
}
