//! The configuration tree: a mapping addressed by dotted key paths.

use serde_json::{Map, Value};

/// Separator between segments of a key path (`rpc.listen`).
pub const KEY_SEPARATOR: char = '.';

/// Configuration tree built from one or more documents.
///
/// The root is always a mapping. Keys are case-sensitive; nested mappings
/// are reached with dotted paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    root: Map<String, Value>,
}

impl ConfigTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a parsed document root.
    ///
    /// Returns `None` when the root is not a mapping. A null root (empty
    /// document) becomes an empty tree.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(root) => Some(Self { root }),
            Value::Null => Some(Self::new()),
            _ => None,
        }
    }

    /// Look up a value by dotted path.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split(KEY_SEPARATOR);
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Check whether a dotted path is present.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a value at a dotted path, replacing whatever was there.
    ///
    /// Missing intermediate mappings are created; intermediate values that
    /// are not mappings are replaced by mappings.
    pub fn set(&mut self, key: &str, value: Value) {
        let mut segments: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        let Some(last) = segments.pop() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in segments {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                return;
            };
            current = map;
        }
        current.insert(last.to_string(), value);
    }

    /// Value of a top-level key.
    pub fn top_level(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Replace the value of a top-level key in full.
    pub fn insert_top_level(&mut self, key: String, value: Value) {
        self.root.insert(key, value);
    }

    /// Names of all top-level keys.
    pub fn top_level_keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    /// Iterate top-level entries.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.root.iter()
    }

    /// Visit every leaf value mutably, regardless of nesting depth.
    pub fn for_each_leaf_mut(&mut self, mut f: impl FnMut(&mut Value)) {
        visit_leaves_mut(&mut self.root, &mut f);
    }

    /// Convert the tree into a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }
}

fn visit_leaves_mut(map: &mut Map<String, Value>, f: &mut impl FnMut(&mut Value)) {
    for value in map.values_mut() {
        match value {
            Value::Object(child) => visit_leaves_mut(child, f),
            leaf => f(leaf),
        }
    }
}

/// Human-readable name of a value's kind, used in error messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
