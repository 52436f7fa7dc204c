//! Snippet completion that commits the tracked abbreviation.
//!
//! The completion item replaces the whole abbreviation span with the engine's
//! expansion. Expansions are snippets, so tab stops such as `${1}` survive.

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionResponse, CompletionTextEdit,
    InsertTextFormat, TextEdit,
};

use crate::document::{LineIndex, TextView};
use crate::engine::ExpansionError;
use crate::marker::AbbreviationMarker;

/// Completion for a valid marker, or `None` when there is nothing to expand.
pub fn completion_for_marker<V: TextView>(
    marker: &AbbreviationMarker<V>,
    line_index: &LineIndex,
) -> Result<Option<CompletionResponse>, ExpansionError> {
    let Some(span) = marker.span().filter(|_| marker.is_valid()) else {
        return Ok(None);
    };

    let snippet = marker.snippet()?;
    if snippet.is_empty() {
        return Ok(None);
    }

    let abbreviation = marker.abbreviation().unwrap_or_default();
    let item = CompletionItem {
        label: abbreviation.clone(),
        kind: Some(CompletionItemKind::SNIPPET),
        detail: Some("Expand abbreviation".to_string()),
        filter_text: Some(abbreviation),
        preselect: Some(true),
        insert_text_format: Some(InsertTextFormat::SNIPPET),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: line_index.span_to_range(span),
            new_text: snippet,
        })),
        ..Default::default()
    };

    Ok(Some(CompletionResponse::Array(vec![item])))
}
