//! Host documents, spans and the highlight slot.
//!
//! This module provides:
//! - `Span` for half-open byte intervals
//! - `TextView`, the view operations a marker consumes
//! - `LineIndex` for efficient byte offset <-> LSP position conversion
//! - `DocumentView`, `ViewStore` and `ViewHandle` for host-side views
//! - tracking rules deciding when typing starts or ends an abbreviation

mod span;
mod store;
mod text;
pub(crate) mod tracking;
mod view;

pub use span::Span;
pub use store::{DocumentView, ViewHandle, ViewStore};
pub use text::{Edit, LineIndex};
pub use view::{Decoration, Highlight, HighlightStyle, TextView};
