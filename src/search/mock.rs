//! In-test page provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Page, PageProvider, PageRequest, ProviderError};
use crate::models::TeamSet;

/// Serves fixed, pre-ordered set lists per index path.
pub(crate) struct MockProvider {
    page_size: usize,
    indexes: HashMap<String, Vec<Arc<TeamSet>>>,
    truncate_at: HashMap<String, usize>,
    fail_on: Option<String>,
    requests: Mutex<Vec<PageRequest>>,
}

impl MockProvider {
    pub(crate) fn new(page_size: usize) -> Self {
        Self {
            page_size,
            indexes: HashMap::new(),
            truncate_at: HashMap::new(),
            fail_on: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_index(mut self, path: &str, sets: Vec<TeamSet>) -> Self {
        self.indexes
            .insert(path.to_string(), sets.into_iter().map(Arc::new).collect());
        self
    }

    /// Pages at or past `page` come back empty and truncated.
    pub(crate) fn truncate_at(mut self, path: &str, page: usize) -> Self {
        self.truncate_at.insert(path.to_string(), page);
        self
    }

    pub(crate) fn fail_on(mut self, path: &str) -> Self {
        self.fail_on = Some(path.to_string());
        self
    }

    pub(crate) fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PageProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<Page, ProviderError> {
        self.requests.lock().push(request.clone());

        if self.fail_on.as_deref() == Some(request.index_path.as_str()) {
            return Err(ProviderError::Failed {
                path: request.index_path,
                reason: "mock failure".to_string(),
            });
        }

        if let Some(&limit) = self.truncate_at.get(&request.index_path) {
            if request.page >= limit {
                return Ok(Page {
                    completed: false,
                    truncated: true,
                    team_sets: Vec::new(),
                });
            }
        }

        let sets = self
            .indexes
            .get(&request.index_path)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let start = (request.page * self.page_size).min(sets.len());
        let end = (start + self.page_size).min(sets.len());

        Ok(Page {
            completed: end >= sets.len(),
            truncated: false,
            team_sets: sets[start..end].to_vec(),
        })
    }
}
