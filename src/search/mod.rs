//! Faceted team set search and live game rankings.
//!
//! - **faceted**: one AND-group scanned over one selected index
//! - **group**: k-way merge of OR-branches
//! - **live**: incrementally sorted game results
//! - **filter_cache**: shared path memoization
//! - **provider**: the paged index seam

mod faceted;
mod filter_cache;
mod group;
mod live;
#[cfg(test)]
pub(crate) mod mock;
mod provider;

pub use faceted::FacetedSearch;
pub use filter_cache::FilterCache;
pub use group::SearchGroup;
pub use live::LiveRankedGameSearch;
pub use provider::{Page, PageProvider, PageRequest, ProviderError};

use serde::Serialize;
use thiserror::Error;

use crate::index::IndexError;
use crate::query::{QueryError, PRECONDITION_FAILED};

/// Errors that can occur while searching.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Search misconfigured: {0}")]
    Misconfigured(String),
}

impl SearchError {
    /// Malformed queries are the caller's to fix; everything else is ours.
    pub fn is_client_error(&self) -> bool {
        match self {
            SearchError::Query(_) => true,
            SearchError::Index(e) => e.is_client_error(),
            _ => false,
        }
    }

    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            PRECONDITION_FAILED
        } else {
            500
        }
    }
}

/// Result count of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchTotal {
    pub count: u64,
    /// Estimated before the result stream completed
    pub fuzzy: bool,
    /// The provider stopped scanning before the end
    pub truncated: bool,
}
