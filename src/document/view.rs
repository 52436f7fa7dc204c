//! The text-view collaborator consumed by abbreviation markers.
//!
//! A host view exposes the text of a span and a single highlight slot. The
//! slot is shared: any marker attached to the view may read or overwrite it,
//! and the host itself moves the highlighted span when the text is edited.

use super::span::Span;

/// Style tag used when highlighting an abbreviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightStyle {
    /// The abbreviation parses.
    Valid,
    /// The abbreviation has a syntax error.
    Error,
}

impl HighlightStyle {
    pub fn tag(self) -> &'static str {
        match self {
            HighlightStyle::Valid => "valid",
            HighlightStyle::Error => "error",
        }
    }
}

/// Drawing flags for a highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decoration {
    pub underline: bool,
    pub fill: bool,
    pub outline: bool,
}

impl Decoration {
    /// Solid underline, no fill, no outline.
    pub const UNDERLINE_ONLY: Decoration = Decoration {
        underline: true,
        fill: false,
        outline: false,
    };
}

/// Contents of a view's highlight slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub span: Span,
    pub style: HighlightStyle,
    pub decoration: Decoration,
}

/// Host view operations a marker depends on.
pub trait TextView {
    /// Text covered by `span`. Out-of-range or non-boundary spans read as empty.
    fn read_span_text(&self, span: Span) -> String;

    /// The span currently in the highlight slot, if any.
    fn highlighted_span(&self) -> Option<Span>;

    /// Replace the highlight slot.
    fn set_highlight(&mut self, span: Span, style: HighlightStyle, decoration: Decoration);

    /// Empty the highlight slot.
    fn clear_highlight(&mut self);
}
