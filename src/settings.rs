//! Settings infrastructure for abbrmark.
//!
//! This module provides support for loading and parsing `abbrmark.toml` files
//! to configure abbreviation tracking and the output options handed to the
//! syntax engine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::{AttributeQuotes, SelfClosingStyle};

/// Name of the settings file searched for in the workspace.
pub const SETTINGS_FILE: &str = "abbrmark.toml";

/// Root settings structure loaded from `abbrmark.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Abbreviation tracking behaviour.
    pub tracking: Option<TrackingSettings>,

    /// Output options passed through to the syntax engine.
    pub output: Option<OutputSettings>,

    /// Language identifier -> engine syntax name overrides.
    pub syntaxes: Option<HashMap<String, String>>,
}

/// Abbreviation tracking settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingSettings {
    /// Start tracking abbreviations while typing (default: true).
    pub enabled: Option<bool>,

    /// Capture document context only for documents smaller than this many
    /// bytes. Zero disables context capture.
    pub context_size_limit: Option<usize>,
}

/// Output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSettings {
    pub attribute_quotes: Option<AttributeQuotes>,

    /// Self-closing tag style for HTML documents.
    pub markup_style: Option<SelfClosingStyle>,

    /// Add comments after expanded elements.
    pub comment: Option<bool>,

    /// Template for those comments.
    pub comment_template: Option<String>,

    pub bem: Option<bool>,

    pub short_hex: Option<bool>,
}

impl Settings {
    pub fn tracking_enabled(&self) -> bool {
        self.tracking
            .as_ref()
            .and_then(|t| t.enabled)
            .unwrap_or(true)
    }

    pub fn context_size_limit(&self) -> usize {
        self.tracking
            .as_ref()
            .and_then(|t| t.context_size_limit)
            .unwrap_or(0)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parse settings from TOML text.
pub fn parse_settings(content: &str) -> Result<Settings, SettingsError> {
    Ok(toml::from_str(content)?)
}

/// Read and parse a settings file.
pub fn read_settings(path: &Path) -> Result<Settings, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&content)
}

/// Load settings from a settings file.
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(path: &Path) -> Settings {
    match read_settings(path) {
        Ok(settings) => settings,
        Err(SettingsError::Io { .. }) => Settings::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring invalid settings file");
            Settings::default()
        }
    }
}

/// Discover `abbrmark.toml` by searching up the directory tree, then direct children.
///
/// Search order:
/// 1. Walk up from `start_dir` to filesystem root
/// 2. If not found, check immediate child directories of `start_dir`
///
/// Returns `(settings, settings_dir)` where `settings_dir` is the directory
/// containing the found file. If not found, returns
/// `(Settings::default(), start_dir)`.
pub fn discover_settings(start_dir: &Path) -> (Settings, PathBuf) {
    let mut current = Some(start_dir);
    while let Some(dir) = current {
        let candidate = dir.join(SETTINGS_FILE);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "found settings");
            return (load_settings(&candidate), dir.to_path_buf());
        }
        current = dir.parent();
    }

    if let Ok(entries) = std::fs::read_dir(start_dir) {
        for entry in entries.flatten() {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                let candidate = entry.path().join(SETTINGS_FILE);
                if candidate.is_file() {
                    debug!(path = %candidate.display(), "found settings");
                    return (load_settings(&candidate), entry.path());
                }
            }
        }
    }

    (Settings::default(), start_dir.to_path_buf())
}
