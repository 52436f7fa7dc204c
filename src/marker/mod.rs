//! The abbreviation marker: one tracked span, its validation state and its previews.
//!
//! A marker is a small state machine with three states (see
//! [`TrackingStatus`]). Every `update` re-highlights the span and validates it
//! again. Validation always re-reads the span from the view's highlight slot,
//! so offset adjustments the host made after edits take precedence over the
//! span cached in the marker.

mod state;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::document::{Decoration, HighlightStyle, Span, TextView};
use crate::engine::{AbbreviationEngine, ExpansionError, Options};
use crate::preview::Preview;

pub use state::{MarkerState, TrackingStatus};

/// Tracks one abbreviation span in a host view.
///
/// Markers are never cleaned up implicitly: call [`AbbreviationMarker::dispose`]
/// when tracking stops.
pub struct AbbreviationMarker<V: TextView> {
    view: V,
    engine: Arc<dyn AbbreviationEngine>,
    options: Options,
    span: Option<Span>,
    state: MarkerState,
    forced: bool,
}

impl<V: TextView> AbbreviationMarker<V> {
    /// Start tracking `span`. The span is highlighted and validated immediately.
    pub fn new(view: V, engine: Arc<dyn AbbreviationEngine>, options: Options, span: Span) -> Self {
        let mut marker = Self {
            view,
            engine,
            options,
            span: None,
            state: MarkerState::default(),
            forced: false,
        };
        marker.update(span);
        marker
    }

    /// Start tracking `span` on the user's request.
    ///
    /// A forced marker may track an empty span and waits there for input
    /// without being validated.
    pub fn forced(
        view: V,
        engine: Arc<dyn AbbreviationEngine>,
        options: Options,
        span: Span,
    ) -> Self {
        let mut marker = Self {
            view,
            engine,
            options,
            span: None,
            state: MarkerState::default(),
            forced: true,
        };
        marker.update(span);
        marker
    }

    /// Replace the tracked span, highlight it and validate it.
    pub fn update(&mut self, span: Span) {
        debug!(%span, "update abbreviation span");
        self.span = Some(span);
        self.mark();
        self.validate();
    }

    /// Validate the span currently in the view's highlight slot.
    ///
    /// Resets the marker if the slot is empty or holds an empty span. Only a
    /// forced marker keeps an empty span; it is not validated until text
    /// is typed into it. Returns whether the abbreviation is valid.
    pub fn validate(&mut self) -> bool {
        let highlighted = self
            .view
            .highlighted_span()
            .filter(|span| self.forced || !span.is_empty());
        let Some(span) = highlighted else {
            self.reset();
            return false;
        };

        self.span = Some(span);
        if span.is_empty() {
            self.state = MarkerState::default();
        } else {
            let abbreviation = self.view.read_span_text(span);
            let validation = self.engine.validate(&abbreviation, &self.options);
            debug!(%span, %abbreviation, valid = validation.is_valid(), "validated abbreviation");
            self.state = MarkerState::from_validation(&validation);
        }

        self.mark();
        self.state.valid
    }

    /// Redraw the highlight for the current span and state.
    pub fn mark(&mut self) {
        self.view.clear_highlight();
        if let Some(span) = self.span {
            let style = if self.state.valid {
                HighlightStyle::Valid
            } else {
                HighlightStyle::Error
            };
            debug!(%span, style = style.tag(), "highlight abbreviation");
            self.view.set_highlight(span, style, Decoration::UNDERLINE_ONLY);
        }
    }

    /// Forget the span and all validation results.
    pub fn reset(&mut self) {
        debug!("reset abbreviation marker");
        self.span = None;
        self.state = MarkerState::default();
        self.mark();
    }

    /// True iff a span is tracked and `start <= offset < end`.
    pub fn contains(&self, offset: usize) -> bool {
        self.span.is_some_and(|span| span.contains(offset))
    }

    /// Expanded snippet for committing a valid abbreviation, or an empty
    /// string when there is nothing valid to expand.
    pub fn snippet(&self) -> Result<String, ExpansionError> {
        match self.valid_span() {
            Some(span) => {
                let abbreviation = self.view.read_span_text(span);
                self.engine.expand(&abbreviation, &self.options)
            }
            None => Ok(String::new()),
        }
    }

    /// Preview of the current abbreviation.
    ///
    /// Valid abbreviations are expanded with the preview flag set; a failure
    /// of that expansion becomes an error preview. Otherwise the stored syntax
    /// error is shown and the engine is not consulted.
    pub fn preview(&self) -> Preview {
        let Some(span) = self.valid_span() else {
            return Preview::Error(self.state.error_text());
        };

        let abbreviation = self.view.read_span_text(span);
        match self.engine.expand(&abbreviation, &self.options.with_preview()) {
            Ok(snippet) => Preview::Snippet(snippet),
            Err(err) => {
                debug!(%abbreviation, error = %err, "preview expansion failed");
                Preview::Error(err.to_string())
            }
        }
    }

    /// Stop tracking.
    ///
    /// Clears the view's highlight only if it still covers this marker's last
    /// known span; another marker may own the slot by now. Returns the view.
    pub fn dispose(mut self) -> V {
        if let Some(span) = self.span {
            if self.view.highlighted_span() == Some(span) {
                self.view.clear_highlight();
            }
        }
        debug!(span = ?self.span, "disposed abbreviation marker");
        self.view
    }

    pub fn status(&self) -> TrackingStatus {
        match (self.span, self.state.valid) {
            (None, _) => TrackingStatus::Reset,
            (Some(_), true) => TrackingStatus::Valid,
            (Some(_), false) => TrackingStatus::Invalid,
        }
    }

    fn valid_span(&self) -> Option<Span> {
        self.span.filter(|_| self.state.valid)
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    pub fn state(&self) -> &MarkerState {
        &self.state
    }

    /// True for markers started with [`AbbreviationMarker::forced`].
    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn is_valid(&self) -> bool {
        self.state.valid
    }

    pub fn is_simple(&self) -> bool {
        self.state.simple
    }

    pub fn is_matched(&self) -> bool {
        self.state.matched
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    /// Text of the tracked span.
    pub fn abbreviation(&self) -> Option<String> {
        self.span.map(|span| self.view.read_span_text(span))
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }
}

impl<V: TextView + fmt::Debug> fmt::Debug for AbbreviationMarker<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbbreviationMarker")
            .field("view", &self.view)
            .field("options", &self.options)
            .field("span", &self.span)
            .field("state", &self.state)
            .field("forced", &self.forced)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentView, Highlight};
    use crate::engine::{MockAbbreviationEngine, SyntaxError, Validation};

    const SOURCE: &str = "<p>ul>li*3 ul>>li</p>";
    const VALID: Span = Span { start: 3, end: 10 };
    const INVALID: Span = Span { start: 11, end: 17 };

    fn view() -> DocumentView {
        DocumentView::new(SOURCE, "html")
    }

    fn validate_by_text(abbreviation: &str) -> Validation {
        match abbreviation {
            "ul>>li" => Validation::Invalid(SyntaxError::new("Unexpected token", "ul>>li", Some(3))),
            "p" | "ul" => Validation::Valid {
                simple: true,
                matched: true,
            },
            _ => Validation::Valid {
                simple: false,
                matched: false,
            },
        }
    }

    fn engine(setup: impl FnOnce(&mut MockAbbreviationEngine)) -> Arc<dyn AbbreviationEngine> {
        let mut engine = MockAbbreviationEngine::new();
        engine
            .expect_validate()
            .returning(|abbreviation, _| validate_by_text(abbreviation));
        setup(&mut engine);
        Arc::new(engine)
    }

    fn marker(span: Span, engine: Arc<dyn AbbreviationEngine>) -> AbbreviationMarker<DocumentView> {
        AbbreviationMarker::new(view(), engine, Options::default(), span)
    }

    #[test]
    fn valid_flag_matches_engine() {
        let valid = marker(VALID, engine(|_| {}));
        assert!(valid.is_valid());
        assert_eq!(valid.status(), TrackingStatus::Valid);
        assert_eq!(valid.error(), None);

        let invalid = marker(INVALID, engine(|_| {}));
        assert!(!invalid.is_valid());
        assert_eq!(invalid.status(), TrackingStatus::Invalid);
        assert_eq!(invalid.error(), Some("Unexpected token"));
        assert_eq!(invalid.state().error_snippet.as_deref(), Some("ul>>li"));
        assert_eq!(invalid.state().error_pos, Some(3));
    }

    #[test]
    fn simple_and_matched_flags_are_recorded() {
        let mut m = marker(Span::new(11, 13), engine(|_| {}));
        assert!(m.is_simple());
        assert!(m.is_matched());

        m.update(VALID);
        assert!(!m.is_simple());
        assert!(!m.is_matched());
    }

    #[test]
    fn update_is_idempotent() {
        let mut m = marker(INVALID, engine(|_| {}));
        m.update(VALID);
        let first = (m.span(), m.state().clone(), m.view().highlight().copied());
        m.update(VALID);
        let second = (m.span(), m.state().clone(), m.view().highlight().copied());
        assert_eq!(first, second);
    }

    #[test]
    fn mark_uses_style_for_state() {
        let valid = marker(VALID, engine(|_| {}));
        assert_eq!(
            valid.view().highlight().copied(),
            Some(Highlight {
                span: VALID,
                style: HighlightStyle::Valid,
                decoration: Decoration::UNDERLINE_ONLY,
            })
        );

        let invalid = marker(INVALID, engine(|_| {}));
        assert_eq!(
            invalid.view().highlight().map(|h| h.style.tag()),
            Some("error")
        );
        assert_eq!(valid.view().highlight().map(|h| h.style.tag()), Some("valid"));
    }

    #[test]
    fn reset_clears_span_state_and_highlight() {
        let mut m = marker(INVALID, engine(|_| {}));
        m.reset();
        assert_eq!(m.span(), None);
        assert_eq!(m.state(), &MarkerState::default());
        assert!(!m.is_valid());
        assert!(!m.is_simple());
        assert!(!m.is_matched());
        assert_eq!(m.error(), None);
        assert_eq!(m.status(), TrackingStatus::Reset);
        assert_eq!(m.view().highlight(), None);
    }

    #[test]
    fn validate_adopts_the_highlighted_span() {
        let mut m = marker(VALID, engine(|_| {}));
        m.view_mut()
            .set_highlight(INVALID, HighlightStyle::Valid, Decoration::UNDERLINE_ONLY);

        assert!(!m.validate());
        assert_eq!(m.span(), Some(INVALID));
        assert_eq!(m.abbreviation().as_deref(), Some("ul>>li"));
    }

    #[test]
    fn validate_without_highlight_resets() {
        let mut m = marker(VALID, engine(|_| {}));
        m.view_mut().clear_highlight();
        assert!(!m.validate());
        assert_eq!(m.status(), TrackingStatus::Reset);
        assert_eq!(m.error(), None);
    }

    #[test]
    fn validate_with_empty_highlight_resets() {
        let mut m = marker(VALID, engine(|_| {}));
        m.view_mut()
            .set_highlight(Span::empty(3), HighlightStyle::Valid, Decoration::UNDERLINE_ONLY);

        assert!(!m.validate());
        assert_eq!(m.span(), None);
        assert_eq!(m.status(), TrackingStatus::Reset);
        assert_eq!(m.view().highlight(), None);
    }

    #[test]
    fn forced_marker_keeps_empty_span_without_validating() {
        let mut engine = MockAbbreviationEngine::new();
        engine.expect_validate().never();
        let mut m = AbbreviationMarker::forced(
            view(),
            Arc::new(engine),
            Options::default(),
            Span::empty(10),
        );

        assert!(m.is_forced());
        assert!(!m.validate());
        assert_eq!(m.span(), Some(Span::empty(10)));
        assert_eq!(m.error(), None);
        assert_eq!(m.view().highlighted_span(), Some(Span::empty(10)));
    }

    #[test]
    fn forced_marker_validates_typed_text() {
        let mut m = AbbreviationMarker::forced(view(), engine(|_| {}), Options::default(), INVALID);
        assert!(m.is_forced());
        assert!(!m.is_valid());
        assert_eq!(m.error(), Some("Unexpected token"));

        m.update(VALID);
        assert!(m.is_valid());
        assert!(!marker(VALID, engine(|_| {})).is_forced());
    }

    #[test]
    fn contains_is_half_open() {
        let mut m = marker(VALID, engine(|_| {}));
        assert!(!m.contains(2));
        assert!(m.contains(3));
        assert!(m.contains(9));
        assert!(!m.contains(10));

        m.reset();
        assert!(!m.contains(3));
    }

    #[test]
    fn snippet_returns_expansion_unmodified() {
        let m = marker(
            VALID,
            engine(|e| {
                e.expect_expand()
                    .times(1)
                    .returning(|abbreviation, options| {
                        assert_eq!(abbreviation, "ul>li*3");
                        assert!(!options.preview);
                        Ok("<ul>\n\t<li>${1}</li>\n</ul>".to_string())
                    });
            }),
        );
        assert_eq!(m.snippet().unwrap(), "<ul>\n\t<li>${1}</li>\n</ul>");
    }

    #[test]
    fn snippet_of_invalid_marker_is_empty() {
        let m = marker(INVALID, engine(|e| {
            e.expect_expand().never();
        }));
        assert_eq!(m.snippet().unwrap(), "");
    }

    #[test]
    fn snippet_propagates_expansion_errors() {
        let m = marker(VALID, engine(|e| {
            e.expect_expand()
                .returning(|_, _| Err(ExpansionError::new("Unable to expand")));
        }));
        assert_eq!(m.snippet().unwrap_err(), ExpansionError::new("Unable to expand"));
    }

    #[test]
    fn preview_expands_in_preview_mode() {
        let m = marker(VALID, engine(|e| {
            e.expect_expand().times(1).returning(|_, options| {
                assert!(options.preview);
                Ok("<ul>\n\t<li></li>\n</ul>".to_string())
            });
        }));
        assert_eq!(m.preview(), Preview::Snippet("<ul>\n\t<li></li>\n</ul>".to_string()));
        assert!(!m.options().preview);
    }

    #[test]
    fn preview_folds_expansion_failure_into_error() {
        let m = marker(VALID, engine(|e| {
            e.expect_expand()
                .returning(|_, _| Err(ExpansionError::new("Too many\nrepeated elements")));
        }));
        let preview = m.preview();
        assert!(preview.is_error());
        assert_eq!(preview.text(), "Too many\nrepeated elements");
    }

    #[test]
    fn invalid_preview_shows_stored_error_without_expanding() {
        let m = marker(INVALID, engine(|e| {
            e.expect_expand().never();
        }));
        let html = m.preview().to_html();
        assert!(html.contains("<div class=\"error\">"));
        assert!(html.contains("Unexpected token"));
        assert!(html.contains("ul&gt;&gt;li"));
        assert_eq!(m.preview().text(), "ul>>li\nUnexpected token");
    }

    #[test]
    fn dispose_clears_own_highlight() {
        let m = marker(VALID, engine(|_| {}));
        let view = m.dispose();
        assert_eq!(view.highlight(), None);
    }

    #[test]
    fn dispose_leaves_foreign_highlight() {
        let mut m = marker(VALID, engine(|_| {}));
        m.view_mut()
            .set_highlight(INVALID, HighlightStyle::Error, Decoration::UNDERLINE_ONLY);
        let view = m.dispose();
        assert_eq!(view.highlighted_span(), Some(INVALID));
    }

    #[test]
    fn dispose_after_reset_leaves_slot_alone() {
        let mut m = marker(VALID, engine(|_| {}));
        m.reset();
        m.view_mut()
            .set_highlight(VALID, HighlightStyle::Valid, Decoration::UNDERLINE_ONLY);
        let view = m.dispose();
        assert_eq!(view.highlighted_span(), Some(VALID));
    }
}
