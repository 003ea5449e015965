//! Configuration resolution.
//!
//! Builds one configuration tree from four sources, lowest to highest precedence:
//! 1. **Primary document** - YAML or JSON, must declare `version`
//! 2. **Included documents** - listed under `include`, same `version` required
//! 3. **Environment** - `<PREFIX>_<KEY>` for top-level keys, `${NAME:-default}` anywhere
//! 4. **Command-line overrides** - `key=value` strings
//!
//! ## Merge Strategy
//! - Included documents replace whole values at top-level keys (no deep merge)
//! - Overrides replace the value at a dotted key path
//!
//! ## Placeholders
//! - `${NAME:-default}` - value of `NAME` if set and non-empty, else `default`
//! - `${NAME}` - value of `NAME`, else empty

pub mod engine;
pub mod env;
pub mod expand;
pub mod flags;
pub mod include;
pub mod loader;
mod merge;
pub mod tree;
pub mod version;

pub use engine::{ConfigEngine, EngineOptions, EngineState, InlineDocument, PLUGIN_NAME};
pub use env::{EnvSource, ProcessEnv};
pub use expand::{EnvPattern, expand_str, expand_value};
pub use flags::{FlagOverride, QuoteState, parse_flag};
pub use loader::{ConfigSource, DocumentFormat};
pub use merge::{overwrite_all, overwrite_keys, overwrite_top_level};
pub use tree::ConfigTree;
pub use version::{
    DEFAULT_CONFIG_VERSION, DeprecationNotice, PREV_CONFIG_VERSION, normalize_host_version,
};
