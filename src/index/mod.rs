//! Adaptive cardinality index.
//!
//! Tracks approximate per-facet set counts for one game type and picks the
//! cheapest stored index to scan for a set of filters.

mod cardinality;
pub mod path;

pub use cardinality::{CardinalityIndex, IndexEntry, IndexSelection};

use thiserror::Error;

use crate::query::QueryError;

/// Errors raised by the cardinality index.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Index is bound to game type {expected}, got {found}")]
    GameTypeMismatch { expected: String, found: String },
}

impl IndexError {
    /// Whether the caller can recover by rephrasing the query.
    pub fn is_client_error(&self) -> bool {
        matches!(self, IndexError::Query(_))
    }
}
