//! Schema version checks.
//!
//! Every document declares a top-level `version` string. Included documents
//! must declare the same version as the primary one; the previous major
//! version still loads but is reported as deprecated.

use super::tree::{ConfigTree, kind_name};
use crate::error::{ConfigError, Result};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

/// Top-level key holding the document's schema version.
pub const VERSION_KEY: &str = "version";

/// Current schema version.
pub const DEFAULT_CONFIG_VERSION: &str = "3";

/// Previous major schema version, accepted with a deprecation notice.
pub const PREV_CONFIG_VERSION: &str = "2.7";

/// Host version token used by local builds and tests.
const LOCAL_HOST_VERSION: &str = "local";

/// Read the declared schema version of a document.
///
/// `origin` names the document in error messages.
pub fn require_version(tree: &ConfigTree, origin: &str) -> Result<String> {
    match tree.top_level(VERSION_KEY) {
        None | Some(Value::Null) => Err(ConfigError::MissingVersion {
            origin: origin.to_string(),
        }),
        Some(Value::String(version)) => Ok(version.clone()),
        Some(other) => Err(ConfigError::InvalidVersionType {
            origin: origin.to_string(),
            actual: kind_name(other),
        }),
    }
}

/// Check that an included document declares the primary document's version.
pub fn check_include_version(primary: &str, include: &str, include_path: &Path) -> Result<()> {
    if primary == include {
        return Ok(());
    }
    Err(ConfigError::IncludeVersionMismatch {
        include: include_path.to_path_buf(),
        expected: primary.to_string(),
        found: include.to_string(),
    })
}

/// Normalize the version reported by the host process.
///
/// An empty or `local` version means the host did not pass one, so the
/// current schema version is reported instead.
pub fn normalize_host_version(host_version: &str) -> String {
    if host_version.is_empty() || host_version == LOCAL_HOST_VERSION {
        DEFAULT_CONFIG_VERSION.to_string()
    } else {
        host_version.to_string()
    }
}

/// Non-fatal notice about a deprecated document version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationNotice {
    pub found: String,
    pub recommended: String,
    pub message: String,
}

/// Emit a deprecation warning if the document uses the previous major version.
pub fn warn_if_legacy(document_version: &str) -> Option<DeprecationNotice> {
    if document_version != PREV_CONFIG_VERSION {
        return None;
    }

    let message = format!(
        "please, update your configuration version from version: '{PREV_CONFIG_VERSION}' \
         to version: '{DEFAULT_CONFIG_VERSION}'"
    );
    warn!(found = %document_version, recommended = %DEFAULT_CONFIG_VERSION, "{}", message);

    Some(DeprecationNotice {
        found: document_version.to_string(),
        recommended: DEFAULT_CONFIG_VERSION.to_string(),
        message,
    })
}
