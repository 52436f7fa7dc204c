//! Host-side document views and their highlight slots.

use std::sync::Arc;

use dashmap::DashMap;
use tower_lsp::lsp_types::{Range, Url};
use tracing::warn;

use super::span::Span;
use super::text::{Edit, LineIndex};
use super::view::{Decoration, Highlight, HighlightStyle, TextView};

/// An open document as the host sees it: text, language and one highlight slot.
#[derive(Debug, Clone)]
pub struct DocumentView {
    line_index: LineIndex,
    version: i32,
    language_id: String,
    highlight: Option<Highlight>,
    /// Generation of the most recent [`ViewHandle`] claim.
    owner: u64,
}

impl DocumentView {
    /// Create a view over `source` with the given language identifier.
    pub fn new(source: impl Into<String>, language_id: impl Into<String>) -> Self {
        Self::open(source.into(), 0, language_id.into())
    }

    /// Create a view for a document the client just opened.
    pub fn open(source: String, version: i32, language_id: String) -> Self {
        Self {
            line_index: LineIndex::new(source),
            version,
            language_id,
            highlight: None,
            owner: 0,
        }
    }

    pub fn source(&self) -> &str {
        self.line_index.source()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn highlight(&self) -> Option<&Highlight> {
        self.highlight.as_ref()
    }

    /// Apply a content change. `range` is `None` for a full-text replacement.
    ///
    /// The highlight slot drifts with the edit; a full replacement drops it.
    /// Returns `None` if the range does not map into the current text.
    pub fn apply_change(&mut self, range: Option<Range>, text: &str, version: i32) -> Option<Edit> {
        let edit = match range {
            Some(range) => {
                let span = self.line_index.range_to_span(range)?;
                Edit {
                    offset: span.start,
                    removed: span.len(),
                    inserted: text.len(),
                }
            }
            None => Edit {
                offset: 0,
                removed: self.source().len(),
                inserted: text.len(),
            },
        };

        let mut source = std::mem::replace(&mut self.line_index, LineIndex::new(String::new()))
            .into_source();
        source.replace_range(edit.offset..edit.offset + edit.removed, text);
        self.line_index = LineIndex::new(source);
        self.version = version;

        self.highlight = match (range, self.highlight.take()) {
            (Some(_), Some(highlight)) => Some(Highlight {
                span: edit.drift(highlight.span),
                ..highlight
            }),
            _ => None,
        };

        Some(edit)
    }
}

impl TextView for DocumentView {
    fn read_span_text(&self, span: Span) -> String {
        self.source()
            .get(span.as_range())
            .unwrap_or_default()
            .to_string()
    }

    fn highlighted_span(&self) -> Option<Span> {
        self.highlight.map(|h| h.span)
    }

    fn set_highlight(&mut self, span: Span, style: HighlightStyle, decoration: Decoration) {
        self.highlight = Some(Highlight {
            span,
            style,
            decoration,
        });
    }

    fn clear_highlight(&mut self) {
        self.highlight = None;
    }
}

/// Thread-safe storage for open views, keyed by document URI.
#[derive(Debug, Default)]
pub struct ViewStore {
    views: DashMap<Url, DocumentView>,
}

impl ViewStore {
    /// Create a new empty view store.
    pub fn new() -> Self {
        Self {
            views: DashMap::new(),
        }
    }

    /// Open or replace a view. Ownership generations survive a re-open so
    /// handles claimed earlier stay stale.
    pub fn open(&self, uri: Url, source: String, version: i32, language_id: String) {
        let owner = self.views.get(&uri).map(|v| v.owner).unwrap_or(0);
        let mut view = DocumentView::open(source, version, language_id);
        view.owner = owner;
        self.views.insert(uri, view);
    }

    /// Close a view.
    pub fn close(&self, uri: &Url) -> Option<DocumentView> {
        self.views.remove(uri).map(|(_, view)| view)
    }

    /// Apply a content change to an open view.
    pub fn apply_change(
        &self,
        uri: &Url,
        range: Option<Range>,
        text: &str,
        version: i32,
    ) -> Option<Edit> {
        let mut view = self.views.get_mut(uri)?;
        view.value_mut().apply_change(range, text, version)
    }

    /// Run `f` against a view. Do not call back into markers from `f`.
    pub fn with_view<R>(&self, uri: &Url, f: impl FnOnce(&DocumentView) -> R) -> Option<R> {
        self.views.get(uri).map(|view| f(view.value()))
    }

    /// Claim the view's highlight slot for a new marker.
    ///
    /// Any handle claimed before this one becomes read-only.
    pub fn claim(self: &Arc<Self>, uri: &Url) -> Option<ViewHandle> {
        let mut view = self.views.get_mut(uri)?;
        view.owner += 1;
        Some(ViewHandle {
            store: Arc::clone(self),
            uri: uri.clone(),
            token: view.owner,
        })
    }
}

/// A marker's access to one view in a [`ViewStore`].
///
/// The handle doubles as the ownership token for the view's highlight slot:
/// only the most recently claimed handle may write to it.
#[derive(Debug)]
pub struct ViewHandle {
    store: Arc<ViewStore>,
    uri: Url,
    token: u64,
}

impl ViewHandle {
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// True while no newer handle has claimed the view.
    pub fn is_current(&self) -> bool {
        self.store
            .with_view(&self.uri, |view| view.owner == self.token)
            .unwrap_or(false)
    }

    fn write(&self, f: impl FnOnce(&mut DocumentView)) {
        let Some(mut view) = self.store.views.get_mut(&self.uri) else {
            return;
        };
        if view.owner != self.token {
            warn!(uri = %self.uri, "ignoring highlight write from a stale marker");
            return;
        }
        f(view.value_mut());
    }
}

impl TextView for ViewHandle {
    fn read_span_text(&self, span: Span) -> String {
        self.store
            .with_view(&self.uri, |view| view.read_span_text(span))
            .unwrap_or_default()
    }

    fn highlighted_span(&self) -> Option<Span> {
        self.store
            .with_view(&self.uri, |view| view.highlighted_span())
            .flatten()
    }

    fn set_highlight(&mut self, span: Span, style: HighlightStyle, decoration: Decoration) {
        self.write(|view| view.set_highlight(span, style, decoration));
    }

    fn clear_highlight(&mut self) {
        self.write(|view| view.clear_highlight());
    }
}
