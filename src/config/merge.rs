//! Merge functionality for included configuration documents.
//!
//! Included documents replace values at top-level keys; nested mappings are
//! not merged field-by-field.

use super::tree::ConfigTree;
use serde_json::Value;

/// Overlay every top-level key of `overlay` onto `base`.
///
/// - Keys only in `base` are kept
/// - Keys in `overlay` replace the base value in full, nested mappings included
/// - Null overlay values replace too (the included document set them explicitly)
///
/// # Example
/// ```
/// use serde_json::json;
/// use config_resolver::config::{ConfigTree, overwrite_top_level};
///
/// let mut base = ConfigTree::from_value(json!({
///     "server": { "port": 8080, "host": "localhost" },
///     "debug": true
/// })).unwrap();
/// let overlay = ConfigTree::from_value(json!({
///     "server": { "port": 9000 }
/// })).unwrap();
/// overwrite_top_level(&mut base, &overlay);
/// assert_eq!(base.to_value(), json!({ "server": { "port": 9000 }, "debug": true }));
/// ```
pub fn overwrite_top_level(base: &mut ConfigTree, overlay: &ConfigTree) {
    for (key, value) in overlay.entries() {
        base.insert_top_level(key.clone(), value.clone());
    }
}

/// Merge multiple trees in order, with later trees taking precedence.
///
/// Equivalent to folding `overwrite_top_level` over the list.
pub fn overwrite_all(trees: impl IntoIterator<Item = ConfigTree>) -> ConfigTree {
    trees.into_iter().fold(ConfigTree::new(), |mut acc, tree| {
        overwrite_top_level(&mut acc, &tree);
        acc
    })
}

/// Replace values at dotted keys, one key at a time.
pub fn overwrite_keys(tree: &mut ConfigTree, values: impl IntoIterator<Item = (String, Value)>) {
    for (key, value) in values {
        tree.set(&key, value);
    }
}
