//! Byte offsets, LSP positions and the edits that move between document versions.

use tower_lsp::lsp_types::{Position, Range};

use super::span::Span;

/// Source text with its line starts, for converting byte offsets to LSP
/// positions (UTF-16 columns) and back.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    source: String,
}

impl LineIndex {
    pub fn new(source: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            line_starts,
            source,
        }
    }

    /// Get the source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Consume the index, returning the source text.
    pub fn into_source(self) -> String {
        self.source
    }

    /// Byte bounds of `line`, excluding its line break.
    fn line_bounds(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map_or(self.source.len(), |next| next - 1);
        Some((start, end))
    }

    /// Convert a byte offset to an LSP position.
    ///
    /// Offsets inside a multi-byte character map to the column after it.
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let (line_start, line_end) = self.line_bounds(line).unwrap_or((0, 0));

        let character: usize = self.source[line_start..line_end]
            .char_indices()
            .take_while(|(i, _)| line_start + i < offset)
            .map(|(_, c)| c.len_utf16())
            .sum();

        Position::new(line as u32, character as u32)
    }

    /// Convert an LSP position to a byte offset.
    ///
    /// Columns past the end of a line clamp to the line end; lines past the
    /// end of the document yield `None`.
    pub fn position_to_offset(&self, position: Position) -> Option<usize> {
        let (line_start, line_end) = self.line_bounds(position.line as usize)?;

        let mut column = 0u32;
        for (i, c) in self.source[line_start..line_end].char_indices() {
            if column >= position.character {
                return Some(line_start + i);
            }
            column += c.len_utf16() as u32;
        }
        Some(line_end)
    }

    /// Convert a byte span to an LSP range.
    pub fn span_to_range(&self, span: Span) -> Range {
        let start = self.offset_to_position(span.start);
        let end = self.offset_to_position(span.end);
        Range::new(start, end)
    }

    /// Convert an LSP range to a byte span.
    pub fn range_to_span(&self, range: Range) -> Option<Span> {
        let start = self.position_to_offset(range.start)?;
        let end = self.position_to_offset(range.end)?;
        Some(Span::new(start, end))
    }
}

/// A single applied content change, in bytes of the text before the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    /// Where the change starts.
    pub offset: usize,
    /// Bytes removed at `offset`.
    pub removed: usize,
    /// Bytes inserted at `offset`.
    pub inserted: usize,
}

impl Edit {
    /// Byte offset right after the inserted text, where the caret ends up.
    pub fn caret(&self) -> usize {
        self.offset + self.inserted
    }

    /// True when this edit inserted exactly `text` and it is a single character.
    pub fn is_single_insert(&self, text: &str) -> bool {
        self.removed == 0 && self.inserted == text.len() && text.chars().count() == 1
    }

    /// Move `span` the way the host moves a highlighted region.
    ///
    /// Edits entirely before the span shift it, edits touching it resize it
    /// (an insertion at the end extends it) and edits after it leave it alone.
    pub fn drift(&self, span: Span) -> Span {
        let removed_end = self.offset + self.removed;

        if self.offset > span.end {
            return span;
        }

        // Typing into an empty span grows it instead of pushing it forward.
        let grows_empty = span.is_empty() && self.offset == span.start;
        if removed_end <= span.start && !grows_empty {
            return Span::new(
                span.start - self.removed + self.inserted,
                span.end - self.removed + self.inserted,
            );
        }

        let start = span.start.min(self.offset);
        let end = if removed_end >= span.end {
            self.offset + self.inserted
        } else {
            span.end - self.removed + self.inserted
        };
        Span::new(start, end.max(start))
    }
}
