//! Core data models for team set search.

mod game;
mod ids;
mod stats;
mod team_set;

pub use game::*;
pub use ids::*;
pub use stats::*;
pub use team_set::*;
