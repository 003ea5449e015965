//! Environment variable access and automatic overlay.
//!
//! Environment lookups go through [`EnvSource`] so the engine can run against
//! the live process environment or a fixed set of variables.

use super::tree::ConfigTree;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Source of environment variable values.
pub trait EnvSource: Send + Sync {
    /// Value of the variable, or `None` when unset.
    fn lookup(&self, name: &str) -> Option<String>;

    /// Value of the variable when set to something non-empty.
    fn lookup_non_empty(&self, name: &str) -> Option<String> {
        self.lookup(name).filter(|value| !value.is_empty())
    }
}

/// The live process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Environment variable name that overrides a top-level key.
///
/// `rr` + `rpc` becomes `RR_RPC`. The key is upper-cased as written, so
/// `numWorkers` maps to `RR_NUMWORKERS`; dots become underscores.
pub fn overlay_var_name(prefix: &str, key: &str) -> String {
    format!("{prefix}_{key}").to_uppercase().replace('.', "_")
}

/// Replace top-level values with matching environment variables.
///
/// Only top-level keys are considered; nested values are reachable through
/// `${NAME}` placeholders instead. Returns the keys that were replaced.
pub fn apply_env_overlay(tree: &mut ConfigTree, prefix: &str, env: &dyn EnvSource) -> Vec<String> {
    let keys: Vec<String> = tree.top_level_keys().map(str::to_string).collect();
    let mut replaced = Vec::new();

    for key in keys {
        let var = overlay_var_name(prefix, &key);
        if let Some(value) = env.lookup_non_empty(&var) {
            debug!(key = %key, var = %var, "Overriding configuration key from environment");
            tree.insert_top_level(key.clone(), Value::String(value));
            replaced.push(key);
        }
    }

    replaced
}
