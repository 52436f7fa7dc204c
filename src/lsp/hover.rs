//! Hover previews for the tracked abbreviation.

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position};

use crate::document::{LineIndex, TextView};
use crate::engine::SyntaxKind;
use crate::marker::AbbreviationMarker;

/// Whether the marker's abbreviation is worth previewing.
///
/// Plain words such as `div` look like ordinary text while typing, so they
/// are only previewed in stylesheets, when they fail to parse or when the
/// user started the marker explicitly.
pub fn shows_preview<V: TextView>(marker: &AbbreviationMarker<V>) -> bool {
    marker.is_forced()
        || !marker.is_simple()
        || marker.options().kind == SyntaxKind::Stylesheet
        || !marker.is_valid()
}

/// Preview popup for `position`, if it lies inside the marker's span.
///
/// The content is the preview fragment; clients render it into their own
/// hover frame.
pub fn hover_for_marker<V: TextView>(
    marker: &AbbreviationMarker<V>,
    line_index: &LineIndex,
    position: Position,
) -> Option<Hover> {
    let offset = line_index.position_to_offset(position)?;
    if !marker.contains(offset) || !shows_preview(marker) {
        return None;
    }
    let span = marker.span()?;

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: marker.preview().to_fragment(),
        }),
        range: Some(line_index.span_to_range(span)),
    })
}
