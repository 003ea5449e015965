//! Document loading.
//!
//! Reads a configuration document from disk or memory and parses it into a
//! [`ConfigTree`]. YAML and JSON are supported.

use super::tree::ConfigTree;
use crate::error::{ConfigError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name used for in-memory documents in messages.
pub const INLINE_ORIGIN: &str = "<inline>";

/// Serialization format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Yaml,
    Json,
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Yaml => write!(f, "yaml"),
            DocumentFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            "json" => Ok(DocumentFormat::Json),
            other => Err(format!("unsupported document type: {other}")),
        }
    }
}

impl DocumentFormat {
    /// Pick a format from a file extension; anything but `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Where the primary document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A file on disk; top-level keys may be overridden by `<PREFIX>_<KEY>` variables.
    File { path: PathBuf, prefix: String },
    /// Document bytes handed over by the caller.
    Inline { bytes: Vec<u8>, format: DocumentFormat },
}

impl ConfigSource {
    /// Name of the source for messages.
    pub fn origin(&self) -> String {
        match self {
            ConfigSource::File { path, .. } => path.display().to_string(),
            ConfigSource::Inline { .. } => INLINE_ORIGIN.to_string(),
        }
    }

    /// Directory that `include` file names are relative to.
    pub fn base_dir(&self) -> PathBuf {
        match self {
            ConfigSource::File { path, .. } => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            ConfigSource::Inline { .. } => PathBuf::new(),
        }
    }

    /// Prefix for the automatic environment overlay, if any.
    pub fn env_prefix(&self) -> Option<&str> {
        match self {
            ConfigSource::File { prefix, .. } => Some(prefix),
            ConfigSource::Inline { .. } => None,
        }
    }

    /// Load and parse the document.
    pub fn load(&self) -> Result<ConfigTree> {
        match self {
            ConfigSource::File { path, .. } => load_file(path),
            ConfigSource::Inline { bytes, format } => {
                let content = std::str::from_utf8(bytes)
                    .map_err(|err| ConfigError::parse(INLINE_ORIGIN, err))?;
                parse_document(content, *format, INLINE_ORIGIN)
            }
        }
    }
}

/// Read a document from disk.
pub fn read_document(path: &Path) -> Result<String> {
    debug!(path = %path.display(), "Reading configuration document");
    std::fs::read_to_string(path).map_err(|source| ConfigError::DocumentRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse document text into a tree. The root must be a mapping.
pub fn parse_document(content: &str, format: DocumentFormat, origin: &str) -> Result<ConfigTree> {
    if content.trim().is_empty() {
        return Ok(ConfigTree::new());
    }

    let value: Value = match format {
        DocumentFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|err| ConfigError::parse(origin, err))?
        }
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|err| ConfigError::parse(origin, err))?
        }
    };

    ConfigTree::from_value(value)
        .ok_or_else(|| ConfigError::parse(origin, "top level should be a mapping"))
}

/// Load a document from a path, picking the format from its extension.
pub fn load_file(path: &Path) -> Result<ConfigTree> {
    let content = read_document(path)?;
    parse_document(&content, DocumentFormat::from_path(path), &path.display().to_string())
}
