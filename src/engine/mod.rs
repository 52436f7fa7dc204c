//! The abbreviation syntax engine collaborator.
//!
//! Parsing and expanding abbreviations is delegated to an implementation of
//! [`AbbreviationEngine`]; this crate never interprets abbreviation syntax
//! itself.

mod options;

use thiserror::Error;

pub use options::{
    AttributeQuotes, DocumentContext, Options, OutputOptions, SelfClosingStyle, SyntaxKind,
};

/// Outcome of validating an abbreviation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The abbreviation parses.
    Valid {
        /// Looks like a plain word rather than a structured abbreviation.
        simple: bool,
        /// A simple abbreviation naming a known tag or snippet.
        matched: bool,
    },
    /// The abbreviation does not parse.
    Invalid(SyntaxError),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid { .. })
    }
}

/// An abbreviation that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    /// Human-readable description.
    pub message: String,
    /// Code snippet pointing at the problem.
    pub snippet: String,
    /// Character offset of the problem inside the abbreviation.
    pub pos: Option<usize>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, snippet: impl Into<String>, pos: Option<usize>) -> Self {
        Self {
            message: message.into(),
            snippet: snippet.into(),
            pos,
        }
    }

    /// Error at `pos` with a caret snippet such as `---^`.
    pub fn at(message: impl Into<String>, pos: usize) -> Self {
        Self::new(message, format!("{}^", "-".repeat(pos)), Some(pos))
    }
}

/// A syntactically valid abbreviation that could not be expanded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExpansionError {
    message: String,
}

impl ExpansionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Validates and expands abbreviations.
#[cfg_attr(test, mockall::automock)]
pub trait AbbreviationEngine: Send + Sync {
    /// Check whether `abbreviation` parses under `options`.
    fn validate(&self, abbreviation: &str, options: &Options) -> Validation;

    /// Expand `abbreviation` into a snippet.
    fn expand(&self, abbreviation: &str, options: &Options) -> Result<String, ExpansionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caret_snippet_points_at_position() {
        let err = SyntaxError::at("Unexpected token", 3);
        assert_eq!(err.snippet, "---^");
        assert_eq!(err.pos, Some(3));
        assert_eq!(err.to_string(), "Unexpected token");
    }

    #[test]
    fn only_valid_results_are_valid() {
        let valid = Validation::Valid {
            simple: true,
            matched: false,
        };
        assert!(valid.is_valid());
        assert!(!Validation::Invalid(SyntaxError::at("Unexpected token", 0)).is_valid());
    }

    #[test]
    fn expansion_error_displays_message() {
        let err = ExpansionError::new("Unable to expand");
        assert_eq!(err.to_string(), "Unable to expand");
        assert_eq!(err.message(), "Unable to expand");
    }
}
