//! Included documents.
//!
//! The primary document may list sibling files under `include`. Each one is
//! loaded on its own, must declare the primary document's version, and then
//! replaces the top-level keys it defines. Nested `include` lists inside an
//! included file are not followed.

use super::loader::load_file;
use super::merge::overwrite_all;
use super::tree::ConfigTree;
use super::version::{check_include_version, require_version};
use crate::error::{ConfigError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Top-level key listing included file names.
pub const INCLUDE_KEY: &str = "include";

/// File names listed under `include`, in order.
///
/// A missing or null `include` key means no includes.
pub fn include_names(tree: &ConfigTree) -> Result<Vec<String>> {
    match tree.top_level(INCLUDE_KEY) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => Ok(name.clone()),
                other => Err(ConfigError::InvalidInclude {
                    reason: format!("found element {other}"),
                }),
            })
            .collect(),
        Some(other) => Err(ConfigError::InvalidInclude {
            reason: format!("found {other}"),
        }),
    }
}

/// Resolve an include name against the primary document's directory.
pub fn include_path(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join(name)
}

/// Load one included document and check its version.
fn load_include(path: &Path, primary_version: &str) -> Result<ConfigTree> {
    let tree = load_file(path).map_err(|err| ConfigError::IncludeRead {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    let version = require_version(&tree, &path.display().to_string())?;
    check_include_version(primary_version, &version, path)?;
    Ok(tree)
}

/// Merge every included document into the primary tree.
///
/// Includes are applied in listed order, later ones winning. Every include
/// is loaded and checked before anything is merged; a failure discards the
/// whole pass.
pub fn resolve_includes(
    base_dir: &Path,
    primary: ConfigTree,
    primary_version: &str,
) -> Result<ConfigTree> {
    let names = include_names(&primary)?;
    if names.is_empty() {
        return Ok(primary);
    }

    let mut trees = Vec::with_capacity(names.len() + 1);
    trees.push(primary);
    for name in &names {
        let path = include_path(base_dir, name);
        debug!(path = %path.display(), "Loading included configuration");
        trees.push(load_include(&path, primary_version)?);
    }

    let merged = overwrite_all(trees);
    info!(count = names.len(), "Merged included configuration files");
    Ok(merged)
}
