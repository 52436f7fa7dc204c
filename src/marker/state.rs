//! Validation state recorded by a marker.

use crate::engine::{SyntaxError, Validation};

/// Where a marker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingStatus {
    /// Tracking a span whose text parses.
    Valid,
    /// Tracking a span whose text has a syntax error.
    Invalid,
    /// No span.
    Reset,
}

/// Flags and error details from the last validation.
///
/// `valid` implies every error field is unset. An invalid marker tracking a
/// non-empty span always carries an `error`. A reset marker, or a forced one
/// still waiting on an empty span, carries none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerState {
    pub valid: bool,
    pub simple: bool,
    pub matched: bool,
    pub error: Option<String>,
    pub error_snippet: Option<String>,
    pub error_pos: Option<usize>,
}

impl MarkerState {
    /// State after a validation by the engine.
    pub fn from_validation(validation: &Validation) -> Self {
        match validation {
            Validation::Valid { simple, matched } => Self {
                valid: true,
                simple: *simple,
                matched: *matched,
                ..Self::default()
            },
            Validation::Invalid(SyntaxError {
                message,
                snippet,
                pos,
            }) => Self {
                error: Some(message.clone()),
                error_snippet: Some(snippet.clone()),
                error_pos: *pos,
                ..Self::default()
            },
        }
    }

    /// Stored error text for previews: the snippet line, then the message.
    pub fn error_text(&self) -> String {
        let lines: Vec<&str> = [self.error_snippet.as_deref(), self.error.as_deref()]
            .into_iter()
            .flatten()
            .filter(|line| !line.is_empty())
            .collect();
        lines.join("\n")
    }
}
