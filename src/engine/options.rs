//! Engine options, resolved once per marker from document context and settings.

use serde::Deserialize;

use crate::settings::Settings;

/// Syntax used when the document language is not recognized.
const FALLBACK_SYNTAX: &str = "html";

/// Syntax of abbreviations inside an HTML `style` attribute.
const INLINE_STYLE_SYNTAX: &str = "css";

const MARKUP_SYNTAXES: &[&str] = &["html", "xml", "xsl", "jsx", "haml", "jade", "pug", "slim"];
const STYLESHEET_SYNTAXES: &[&str] = &["css", "scss", "sass", "less", "sss", "stylus", "postcss"];

/// Broad family of an abbreviation syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Markup,
    Stylesheet,
}

impl SyntaxKind {
    pub fn for_syntax(syntax: &str) -> Self {
        if STYLESHEET_SYNTAXES.contains(&syntax) {
            SyntaxKind::Stylesheet
        } else {
            SyntaxKind::Markup
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeQuotes {
    #[default]
    Double,
    Single,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfClosingStyle {
    #[default]
    Html,
    Xhtml,
    Xml,
}

/// Output formatting passed through to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    pub attribute_quotes: AttributeQuotes,
    /// Only set for HTML documents.
    pub self_closing_style: Option<SelfClosingStyle>,
    pub compact_boolean: bool,
    pub comment: bool,
    pub comment_template: Option<String>,
    pub bem: bool,
    pub short_hex: bool,
    pub jsx: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            attribute_quotes: AttributeQuotes::Double,
            self_closing_style: Some(SelfClosingStyle::Html),
            compact_boolean: true,
            comment: false,
            comment_template: None,
            bem: false,
            short_hex: true,
            jsx: false,
        }
    }
}

/// Where in a document a marker is being created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContext {
    /// LSP language identifier of the document.
    pub language_id: String,
    /// Inside an HTML `style` attribute: the abbreviation expands to inline
    /// CSS on a single line.
    pub inline: bool,
    /// Document size in bytes.
    pub document_size: usize,
}

impl DocumentContext {
    pub fn new(language_id: impl Into<String>, document_size: usize) -> Self {
        Self {
            language_id: language_id.into(),
            inline: false,
            document_size,
        }
    }

    pub fn with_inline(self, inline: bool) -> Self {
        Self { inline, ..self }
    }
}

/// Engine configuration for one marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Engine syntax name, e.g. `html` or `css`.
    pub syntax: String,
    pub kind: SyntaxKind,
    pub inline: bool,
    /// Stricter expansion used for previews only.
    pub preview: bool,
    /// Whether the engine may capture surrounding document context.
    pub with_context: bool,
    pub output: OutputOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            syntax: FALLBACK_SYNTAX.to_string(),
            kind: SyntaxKind::Markup,
            inline: false,
            preview: false,
            with_context: false,
            output: OutputOptions::default(),
        }
    }
}

impl Options {
    /// Resolve options for a marker created in `context`.
    pub fn resolve(settings: &Settings, context: &DocumentContext) -> Self {
        let mut syntax = syntax_for_language(settings, &context.language_id);
        if context.inline && syntax == "html" {
            syntax = INLINE_STYLE_SYNTAX.to_string();
        }
        let kind = SyntaxKind::for_syntax(&syntax);
        let output_settings = settings.output.clone().unwrap_or_default();

        let markup_style = output_settings.markup_style.unwrap_or_default();
        let is_html = syntax == "html";

        let output = OutputOptions {
            attribute_quotes: output_settings.attribute_quotes.unwrap_or_default(),
            self_closing_style: is_html.then_some(markup_style),
            compact_boolean: is_html && markup_style == SelfClosingStyle::Html,
            comment: output_settings.comment.unwrap_or(false),
            comment_template: output_settings.comment_template,
            bem: output_settings.bem.unwrap_or(false),
            short_hex: output_settings.short_hex.unwrap_or(true),
            jsx: syntax == "jsx",
        };

        let limit = settings.context_size_limit();

        Self {
            syntax,
            kind,
            inline: context.inline,
            preview: false,
            with_context: limit > 0 && context.document_size < limit,
            output,
        }
    }

    /// A copy of these options with the preview flag set.
    pub fn with_preview(&self) -> Self {
        Self {
            preview: true,
            ..self.clone()
        }
    }
}

/// Map an LSP language identifier to an engine syntax name.
fn syntax_for_language(settings: &Settings, language_id: &str) -> String {
    if let Some(syntax) = settings
        .syntaxes
        .as_ref()
        .and_then(|overrides| overrides.get(language_id))
    {
        return syntax.clone();
    }

    let syntax = match language_id {
        "javascriptreact" | "typescriptreact" => "jsx",
        other if MARKUP_SYNTAXES.contains(&other) || STYLESHEET_SYNTAXES.contains(&other) => other,
        _ => FALLBACK_SYNTAX,
    };
    syntax.to_string()
}
