//! Abbreviation marker and expansion preview, served over LSP.
//!
//! The core is [`AbbreviationMarker`]: it tracks one abbreviation span in a
//! host [`TextView`], validates it with an [`AbbreviationEngine`] and renders
//! [`Preview`]s. [`Backend`] is a language server hosting one marker per open
//! document.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use serde_json::Value;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService};
use tracing::{debug, warn};

mod document;
mod engine;
mod lsp;
mod marker;
mod preview;
pub(crate) mod settings;

pub use document::{
    Decoration, DocumentView, Edit, Highlight, HighlightStyle, LineIndex, Span, TextView,
    ViewHandle, ViewStore,
};
pub use engine::{
    AbbreviationEngine, AttributeQuotes, DocumentContext, ExpansionError, Options, OutputOptions,
    SelfClosingStyle, SyntaxError, SyntaxKind, Validation,
};
pub use lsp::{completion_for_marker, document_highlights, hover_for_marker, marker_diagnostics};
pub use marker::{AbbreviationMarker, MarkerState, TrackingStatus};
pub use preview::{escape_html, format_lines, Preview, INDENT_UNIT};
pub use settings::{discover_settings, load_settings, parse_settings, Settings, SettingsError};

use document::tracking::{self, TrackingDecision};

/// Command that stops tracking the abbreviation in the document given as the
/// first argument.
pub const CLEAR_MARKER_COMMAND: &str = "abbrmark.clearMarker";

/// Command that toggles an explicitly started abbreviation. Arguments are
/// the document URI and the LSP position to start at.
pub const ENTER_ABBREVIATION_MODE_COMMAND: &str = "abbrmark.enterAbbreviationMode";

pub struct Backend {
    client: Client,
    engine: Arc<dyn AbbreviationEngine>,
    views: Arc<ViewStore>,
    markers: DashMap<Url, AbbreviationMarker<ViewHandle>>,
    workspace_root: OnceLock<PathBuf>,
    settings: OnceLock<Settings>,
}

impl Backend {
    pub(crate) fn new(client: Client, engine: Arc<dyn AbbreviationEngine>) -> Self {
        Self {
            client,
            engine,
            views: Arc::new(ViewStore::new()),
            markers: DashMap::new(),
            workspace_root: OnceLock::new(),
            settings: OnceLock::new(),
        }
    }

    /// Workspace root reported by the client at initialization.
    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.get().map(PathBuf::as_path)
    }

    fn settings(&self) -> &Settings {
        self.settings.get_or_init(Settings::default)
    }

    /// Span of the abbreviation tracked in a document.
    pub fn tracked_span(&self, uri: &Url) -> Option<Span> {
        self.markers.get(uri).and_then(|marker| marker.span())
    }

    /// Text of the abbreviation tracked in a document.
    pub fn tracked_abbreviation(&self, uri: &Url) -> Option<String> {
        self.markers.get(uri).and_then(|marker| marker.abbreviation())
    }

    /// Status of the document's marker, if one is tracking.
    pub fn tracking_status(&self, uri: &Url) -> Option<TrackingStatus> {
        self.markers.get(uri).map(|marker| marker.status())
    }

    /// Whether the document's marker was started with
    /// [`ENTER_ABBREVIATION_MODE_COMMAND`].
    pub fn is_forced(&self, uri: &Url) -> bool {
        self.markers.get(uri).is_some_and(|marker| marker.is_forced())
    }

    fn options_at(&self, view: &DocumentView, offset: usize) -> Options {
        let context = DocumentContext::new(view.language_id(), view.source().len())
            .with_inline(tracking::is_inline_context(view.source(), offset));
        Options::resolve(self.settings(), &context)
    }

    fn dispose_marker(&self, uri: &Url) {
        if let Some((_, marker)) = self.markers.remove(uri) {
            debug!(%uri, "stop tracking abbreviation");
            marker.dispose();
        }
    }

    /// Run the tracking policy for one applied content change.
    fn track_edit(&self, uri: &Url, edit: &Edit, text: &str) {
        if let Some((_, mut marker)) = self.markers.remove(uri) {
            let before = marker.span();
            marker.validate();
            let tracked = tracking::TrackedSpan {
                before,
                after: marker.span(),
                valid: marker.is_valid(),
                forced: marker.is_forced(),
            };
            let abbreviation = marker.abbreviation().unwrap_or_default();

            match tracking::decide(&tracked, edit, &abbreviation) {
                TrackingDecision::Keep => {
                    self.markers.insert(uri.clone(), marker);
                    return;
                }
                TrackingDecision::Extend(span) => {
                    marker.update(span);
                    let broken = marker
                        .abbreviation()
                        .is_some_and(|text| tracking::has_line_break(&text));
                    if !broken {
                        debug!(%uri, %span, "extended abbreviation");
                        self.markers.insert(uri.clone(), marker);
                        return;
                    }
                }
                TrackingDecision::Stop => {}
            }
            debug!(%uri, "edit ended abbreviation tracking");
            marker.dispose();
        }

        if !self.settings().tracking_enabled() || !edit.is_single_insert(text) {
            return;
        }

        let started = self
            .views
            .with_view(uri, |view| {
                let options = self.options_at(view, edit.offset);
                tracking::abbreviation_start(view.source(), edit, options.output.jsx)
                    .map(|span| (span, options))
            })
            .flatten();
        let Some((span, options)) = started else {
            return;
        };
        let Some(handle) = self.views.claim(uri) else {
            return;
        };

        let marker = AbbreviationMarker::new(handle, Arc::clone(&self.engine), options, span);
        if marker.is_valid() {
            debug!(%uri, %span, "start tracking abbreviation");
            self.markers.insert(uri.clone(), marker);
        } else {
            marker.dispose();
        }
    }

    /// Publish diagnostics for the document's marker.
    async fn publish_marker_diagnostics(&self, uri: &Url) {
        let Some((line_index, version)) = self
            .views
            .with_view(uri, |view| (view.line_index().clone(), view.version()))
        else {
            return;
        };
        let diagnostics = self
            .markers
            .get(uri)
            .map(|marker| lsp::marker_diagnostics(marker.value(), &line_index))
            .unwrap_or_default();

        self.client
            .publish_diagnostics(uri.clone(), diagnostics, Some(version))
            .await;
    }

    /// Start a forced marker at `position`, or stop the forced marker that
    /// is already running. Returns whether a marker is now tracking.
    fn toggle_abbreviation_mode(&self, uri: &Url, position: Position) -> bool {
        if self.is_forced(uri) {
            self.dispose_marker(uri);
            return false;
        }

        let started = self
            .views
            .with_view(uri, |view| {
                let offset = view.line_index().position_to_offset(position)?;
                Some((offset, self.options_at(view, offset)))
            })
            .flatten();
        let Some((offset, options)) = started else {
            return false;
        };

        self.dispose_marker(uri);
        let Some(handle) = self.views.claim(uri) else {
            return false;
        };
        let span = Span::empty(offset);
        let marker = AbbreviationMarker::forced(handle, Arc::clone(&self.engine), options, span);
        debug!(%uri, offset, "entered abbreviation mode");
        self.markers.insert(uri.clone(), marker);
        true
    }

    fn line_index(&self, uri: &Url) -> Option<LineIndex> {
        self.views.with_view(uri, |view| view.line_index().clone())
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let workspace_root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|f| f.uri.to_file_path().ok())
            .or_else(|| {
                #[allow(deprecated)]
                params.root_uri.as_ref()?.to_file_path().ok()
            });

        if let Some(root) = workspace_root {
            let _ = self.workspace_root.set(root.clone());

            let (settings, settings_dir) = settings::discover_settings(&root);
            debug!(dir = %settings_dir.display(), "loaded settings");
            let _ = self.settings.set(settings);
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    ..Default::default()
                }),
                document_highlight_provider: Some(OneOf::Left(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![
                        CLEAR_MARKER_COMMAND.to_string(),
                        ENTER_ABBREVIATION_MODE_COMMAND.to_string(),
                    ],
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "abbreviation marker server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        self.dispose_marker(&uri);
        self.views.open(
            uri.clone(),
            params.text_document.text,
            params.text_document.version,
            params.text_document.language_id,
        );
        self.publish_marker_diagnostics(&uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        for change in params.content_changes {
            let Some(edit) = self
                .views
                .apply_change(&uri, change.range, &change.text, version)
            else {
                warn!(%uri, range = ?change.range, "ignoring change outside the document");
                continue;
            };
            self.track_edit(&uri, &edit, &change.text);
        }

        self.publish_marker_diagnostics(&uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.dispose_marker(&uri);
        self.views.close(&uri);
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(line_index) = self.line_index(uri) else {
            return Ok(None);
        };
        let Some(marker) = self.markers.get(uri) else {
            return Ok(None);
        };

        Ok(lsp::hover_for_marker(marker.value(), &line_index, position))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(line_index) = self.line_index(uri) else {
            return Ok(None);
        };
        let Some(offset) = line_index.position_to_offset(position) else {
            return Ok(None);
        };

        let touches = match self.markers.get(uri) {
            Some(marker) => marker.span().is_some_and(|span| span.touches(offset)),
            None => return Ok(None),
        };
        if !touches && !self.is_forced(uri) {
            self.dispose_marker(uri);
            self.publish_marker_diagnostics(uri).await;
            return Ok(None);
        }

        let Some(marker) = self.markers.get(uri) else {
            return Ok(None);
        };
        lsp::completion_for_marker(marker.value(), &line_index).map_err(|err| {
            warn!(%uri, error = %err, "abbreviation expansion failed");
            let mut error = Error::internal_error();
            error.message = err.to_string().into();
            error
        })
    }

    async fn document_highlight(
        &self,
        params: DocumentHighlightParams,
    ) -> Result<Option<Vec<DocumentHighlight>>> {
        let uri = &params.text_document_position_params.text_document.uri;
        Ok(self.views.with_view(uri, lsp::document_highlights).flatten())
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        let known = [CLEAR_MARKER_COMMAND, ENTER_ABBREVIATION_MODE_COMMAND];
        if !known.contains(&params.command.as_str()) {
            return Err(Error::invalid_params(format!(
                "unknown command: {}",
                params.command
            )));
        }

        let uri = params
            .arguments
            .first()
            .and_then(Value::as_str)
            .and_then(|arg| Url::parse(arg).ok())
            .ok_or_else(|| Error::invalid_params("expected a document URI argument"))?;

        let result = match params.command.as_str() {
            CLEAR_MARKER_COMMAND => {
                self.dispose_marker(&uri);
                None
            }
            ENTER_ABBREVIATION_MODE_COMMAND => {
                let position = params
                    .arguments
                    .get(1)
                    .cloned()
                    .and_then(|arg| serde_json::from_value::<Position>(arg).ok())
                    .ok_or_else(|| Error::invalid_params("expected a position argument"))?;
                Some(Value::Bool(self.toggle_abbreviation_mode(&uri, position)))
            }
            _ => None,
        };

        self.publish_marker_diagnostics(&uri).await;
        Ok(result)
    }
}

pub fn create_service(
    engine: Arc<dyn AbbreviationEngine>,
) -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::new(move |client| Backend::new(client, engine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockAbbreviationEngine;

    #[test]
    fn service_can_be_created() {
        let (_service, _socket) = create_service(Arc::new(MockAbbreviationEngine::new()));
    }
}
