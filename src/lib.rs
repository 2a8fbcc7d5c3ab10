//! # Team Set Search
//!
//! Faceted search over user-authored tactics-game team sets.
//!
//! ## Architecture
//!
//! - **models**: Team sets, tags, stats, ranking metrics and game summaries
//! - **vocab**: Per-game-type keyword and alias vocabulary
//! - **query**: Free-text query grammar
//! - **index**: Cardinality index of facet paths and index selection
//! - **search**: Faceted search, OR-branch merge and live game rankings
//! - **storage**: JSONL data store and in-memory page provider
//! - **config**: Configuration loading and validation

pub mod config;
pub mod index;
pub mod models;
pub mod query;
pub mod search;
pub mod storage;
pub mod vocab;

pub use models::*;
