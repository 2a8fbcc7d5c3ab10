//! Free-text query grammar.
//!
//! Turns text such as `double knight or (scout and "iron fist")` into
//! OR-alternatives of AND-ed terms:
//!
//! ```text
//! [["2 knight"], ["iron fist", "scout"]]
//! ```
//!
//! Terms stay as text; mapping them to index paths is the cardinality
//! index's job (see `crate::index`).

mod lexer;
mod parser;

pub use lexer::{tokenize, Token};
pub use parser::{AliasTable, QueryGrammar, TermGroups, MAX_ALTERNATIVES, MAX_NESTING};

use thiserror::Error;

use crate::models::UnknownMetric;

/// HTTP status returned to clients for malformed queries.
pub const PRECONDITION_FAILED: u16 = 412;

/// Malformed query errors. Always recoverable by rephrasing.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("Unrecognized term: {0}")]
    UnrecognizedTerm(String),

    #[error("A count cannot be combined with 'less': {0}")]
    IllegalCount(String),

    #[error("Term does not take a count: {0}")]
    CountNotAllowed(String),

    #[error("Invalid query syntax: {0}")]
    Syntax(String),

    #[error(transparent)]
    UnknownMetric(#[from] UnknownMetric),
}

impl QueryError {
    /// Status code for the client-facing response.
    pub fn status_code(&self) -> u16 {
        PRECONDITION_FAILED
    }
}

/// Parse a count word: `no`, `single`, `double`, `triple` or an integer.
pub fn parse_count(word: &str) -> Option<u32> {
    match word {
        "no" => Some(0),
        "single" => Some(1),
        "double" => Some(2),
        "triple" => Some(3),
        _ if !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit()) => word.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_words() {
        assert_eq!(parse_count("no"), Some(0));
        assert_eq!(parse_count("single"), Some(1));
        assert_eq!(parse_count("double"), Some(2));
        assert_eq!(parse_count("triple"), Some(3));
        assert_eq!(parse_count("12"), Some(12));
    }

    #[test]
    fn test_parse_count_rejects_words() {
        assert_eq!(parse_count("knight"), None);
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn test_query_error_status() {
        let err = QueryError::UnrecognizedTerm("dragon".to_string());
        assert_eq!(err.status_code(), 412);
        assert_eq!(err.to_string(), "Unrecognized term: dragon");
    }
}
