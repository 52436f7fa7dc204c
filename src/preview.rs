//! HTML previews of expanded abbreviations and their errors.
//!
//! Previews are small HTML documents meant for an inline popup: every line of
//! the expansion becomes its own block, indented by its leading tab depth.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

/// Pixels of padding per leading tab.
pub const INDENT_UNIT: usize = 20;

/// A renderable preview. Expansion failures are folded into [`Preview::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// Expanded abbreviation text.
    Snippet(String),
    /// Error text to show instead of an expansion.
    Error(String),
}

impl Preview {
    pub fn is_error(&self) -> bool {
        matches!(self, Preview::Error(_))
    }

    /// The unrendered preview text.
    pub fn text(&self) -> &str {
        match self {
            Preview::Snippet(text) | Preview::Error(text) => text,
        }
    }

    /// The preview body without the surrounding document.
    pub fn to_fragment(&self) -> String {
        match self {
            Preview::Snippet(text) => format!("<div class=\"preview\">{}</div>", format_lines(text)),
            Preview::Error(text) => format!("<div class=\"error\">{}</div>", format_lines(text)),
        }
    }

    /// The complete popup document.
    pub fn to_html(&self) -> String {
        popup_html(&self.to_fragment())
    }
}

/// Wrap preview content in the popup skeleton.
fn popup_html(content: &str) -> String {
    format!(
        r#"<body id="abbreviation-preview">
    <style>
        body {{ font-size: 0.9rem; line-height: 1.5rem; }}
        pre, code {{ display: block; }}
        .error {{ color: red; }}
    </style>
    {content}
</body>"#
    )
}

/// Render each line of `text` as an escaped, indented block.
pub fn format_lines(text: &str) -> String {
    text.lines()
        .map(|line| {
            format!(
                "<div style=\"padding-left: {}px\"><code>{}</code></div>",
                indent_depth(line) * INDENT_UNIT,
                escape_html(line)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn leading_tabs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\t+").expect("valid regex"))
}

/// Number of leading tab characters in `line`.
pub fn indent_depth(line: &str) -> usize {
    leading_tabs().find(line).map(|m| m.len()).unwrap_or(0)
}

/// Escape `<`, `>` and `&`; every other character is kept as is.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['<', '>', '&']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
