//! Common test utilities and helpers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use abbrmark::{
    create_service, AbbreviationEngine, Backend, ExpansionError, Options, SyntaxError, SyntaxKind,
    Validation,
};
use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams, DidOpenTextDocumentParams, Position, Range,
    TextDocumentContentChangeEvent, TextDocumentItem, Url, VersionedTextDocumentIdentifier,
};
use tower_lsp::{LanguageServer, LspService};

/// Tags the fake engine treats as known snippets.
const KNOWN_TAGS: &[&str] = &["div", "p", "ul", "li", "span", "a"];

/// Largest repeat count the fake engine expands.
const MAX_REPEAT: usize = 100;

/// A tiny abbreviation engine understanding `tag.class*N>child` chains.
///
/// A trailing `>` is accepted while the child is still being typed.
#[derive(Debug, Default)]
pub struct FakeEngine {
    expansions: AtomicUsize,
}

impl FakeEngine {
    /// Number of `expand` calls so far.
    pub fn expansions(&self) -> usize {
        self.expansions.load(Ordering::SeqCst)
    }
}

fn strip_jsx_prefix<'a>(abbreviation: &'a str, options: &Options) -> &'a str {
    if options.output.jsx {
        abbreviation.strip_prefix('<').unwrap_or(abbreviation)
    } else {
        abbreviation
    }
}

impl AbbreviationEngine for FakeEngine {
    fn validate(&self, abbreviation: &str, options: &Options) -> Validation {
        let abbreviation = strip_jsx_prefix(abbreviation, options);
        if abbreviation.is_empty() {
            return Validation::Invalid(SyntaxError::at("Unexpected end of abbreviation", 0));
        }
        if let Some(index) = abbreviation.find(char::is_whitespace) {
            return Validation::Invalid(SyntaxError::at("Unexpected space", index));
        }
        if let Some(index) = abbreviation.find(">>") {
            return Validation::Invalid(SyntaxError::at("Unexpected token", index + 1));
        }

        let simple = abbreviation.chars().all(|c| c.is_ascii_alphanumeric());
        Validation::Valid {
            simple,
            matched: simple && KNOWN_TAGS.contains(&abbreviation),
        }
    }

    fn expand(&self, abbreviation: &str, options: &Options) -> Result<String, ExpansionError> {
        self.expansions.fetch_add(1, Ordering::SeqCst);
        let abbreviation = strip_jsx_prefix(abbreviation, options);

        if options.kind == SyntaxKind::Stylesheet {
            let stop = if options.preview { "" } else { "${1}" };
            return Ok(format!("{abbreviation}: {stop};"));
        }

        let levels: Vec<&str> = abbreviation.split('>').collect();
        let mut stop = 0;
        let lines = render(&levels, 0, &mut stop, options.preview)?;
        Ok(lines.join("\n"))
    }
}

fn render(
    levels: &[&str],
    depth: usize,
    stop: &mut usize,
    preview: bool,
) -> Result<Vec<String>, ExpansionError> {
    let Some((level, children)) = levels.split_first() else {
        return Ok(Vec::new());
    };

    let (element, count) = match level.split_once('*') {
        Some((element, count)) => {
            let count: usize = count
                .parse()
                .map_err(|_| ExpansionError::new(format!("Invalid repeater: {count}")))?;
            if count > MAX_REPEAT {
                return Err(ExpansionError::new("Too many repeated elements"));
            }
            (element, count)
        }
        None => (*level, 1),
    };
    let (tag, class) = match element.split_once('.') {
        Some(("", class)) => ("div", Some(class)),
        Some((tag, class)) => (tag, Some(class)),
        None => (element, None),
    };
    let open = match class {
        Some(class) => format!("<{tag} class=\"{class}\">"),
        None => format!("<{tag}>"),
    };

    let indent = "\t".repeat(depth);
    let mut lines = Vec::new();
    for _ in 0..count {
        if children.is_empty() {
            *stop += 1;
            let body = if preview {
                String::new()
            } else {
                format!("${{{stop}}}")
            };
            lines.push(format!("{indent}{open}{body}</{tag}>"));
        } else {
            lines.push(format!("{indent}{open}"));
            lines.extend(render(children, depth + 1, stop, preview)?);
            lines.push(format!("{indent}</{tag}>"));
        }
    }
    Ok(lines)
}

/// A service backed by a fresh [`FakeEngine`].
pub fn create_test_service() -> (LspService<Backend>, Arc<FakeEngine>) {
    let engine = Arc::new(FakeEngine::default());
    let (service, _socket) = create_service(engine.clone());
    (service, engine)
}

pub fn test_uri(name: &str) -> Url {
    Url::parse(&format!("file:///workspace/{name}")).expect("valid uri")
}

/// An open document with a client-side version counter.
pub struct TestDocument {
    pub uri: Url,
    version: i32,
}

impl TestDocument {
    pub async fn open(backend: &Backend, name: &str, language_id: &str, text: &str) -> Self {
        let uri = test_uri(name);
        backend
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: uri.clone(),
                    language_id: language_id.to_string(),
                    version: 1,
                    text: text.to_string(),
                },
            })
            .await;
        Self { uri, version: 1 }
    }

    /// Replace `range` with `text` in one change.
    pub async fn edit(&mut self, backend: &Backend, range: Range, text: &str) {
        self.version += 1;
        backend
            .did_change(DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: self.uri.clone(),
                    version: self.version,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: Some(range),
                    range_length: None,
                    text: text.to_string(),
                }],
            })
            .await;
    }

    /// Type `text` one character at a time, starting at `line:character`.
    pub async fn type_text(&mut self, backend: &Backend, line: u32, character: u32, text: &str) {
        let mut position = Position::new(line, character);
        for c in text.chars() {
            self.edit(backend, Range::new(position, position), &c.to_string())
                .await;
            position.character += c.len_utf16() as u32;
        }
    }
}
