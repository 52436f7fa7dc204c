//! LSP protocol feature implementations.
//!
//! This module converts marker state into LSP responses:
//! - Hover previews of the tracked abbreviation
//! - Snippet completion that commits the abbreviation
//! - Diagnostics for abbreviations with syntax errors
//! - Document highlights for the view's highlight slot

mod completion;
mod diagnostics;
mod highlight;
mod hover;

pub use completion::completion_for_marker;
pub use diagnostics::marker_diagnostics;
pub use highlight::document_highlights;
pub use hover::hover_for_marker;
