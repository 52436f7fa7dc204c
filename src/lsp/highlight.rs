//! Document highlights for the view's highlight slot.

use tower_lsp::lsp_types::{DocumentHighlight, DocumentHighlightKind};

use crate::document::DocumentView;

/// The highlighted abbreviation span, if the slot is occupied.
pub fn document_highlights(view: &DocumentView) -> Option<Vec<DocumentHighlight>> {
    let highlight = view.highlight()?;
    Some(vec![DocumentHighlight {
        range: view.line_index().span_to_range(highlight.span),
        kind: Some(DocumentHighlightKind::TEXT),
    }])
}
