//! Paged index provider seam.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Metric, TeamSet};
use crate::storage::StorageError;

/// Request for one page of a stored index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub game_type_id: String,
    pub index_path: String,
    pub metric: Metric,
    /// Zero-based page number
    pub page: usize,
}

/// One page of team sets, ordered by the requested metric.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// No more pages exist
    pub completed: bool,
    /// The provider refuses to scan further
    pub truncated: bool,
    pub team_sets: Vec<Arc<TeamSet>>,
}

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Page request for {path} failed: {reason}")]
    Failed { path: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Source of stored index pages.
#[async_trait]
pub trait PageProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Fetch one page of an index.
    async fn fetch_page(&self, request: PageRequest) -> Result<Page, ProviderError>;
}
