//! Diagnostics for tracked abbreviations with syntax errors.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};

use crate::document::{LineIndex, Span, TextView};
use crate::marker::{AbbreviationMarker, TrackingStatus};

/// Convert an invalid marker's error to LSP diagnostics.
///
/// The range starts at the error position inside the abbreviation and runs to
/// the end of the span; without a usable position it covers the whole span.
pub fn marker_diagnostics<V: TextView>(
    marker: &AbbreviationMarker<V>,
    line_index: &LineIndex,
) -> Vec<Diagnostic> {
    if marker.status() != TrackingStatus::Invalid {
        return Vec::new();
    }
    let (Some(span), Some(message)) = (marker.span(), marker.error()) else {
        return Vec::new();
    };

    let abbreviation = marker.abbreviation().unwrap_or_default();
    let range = match marker.state().error_pos {
        Some(pos) => error_span(span, &abbreviation, pos),
        None => span,
    };

    vec![Diagnostic {
        range: line_index.span_to_range(range),
        severity: Some(DiagnosticSeverity::ERROR),
        code: Some(NumberOrString::String("syntax-error".to_string())),
        code_description: None,
        source: Some("abbreviation".to_string()),
        message: message.to_string(),
        related_information: None,
        tags: None,
        data: None,
    }]
}

/// Byte span from character `pos` of `abbreviation` to the end of `span`.
fn error_span(span: Span, abbreviation: &str, pos: usize) -> Span {
    let byte = abbreviation
        .char_indices()
        .nth(pos)
        .map(|(i, _)| i)
        .unwrap_or(abbreviation.len());
    let start = span.start + byte;
    if start >= span.end {
        span
    } else {
        Span::new(start, span.end)
    }
}
