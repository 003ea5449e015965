//! Configuration engine.
//!
//! Runs the resolution pipeline once and then serves reads:
//!
//! 1. **Loading** - read the primary document and check its `version`
//! 2. **Including** - merge the files listed under `include`
//! 3. **Expanding** - apply `<PREFIX>_<KEY>` variables, then expand `${NAME:-default}`
//! 4. **Overlaying** - apply `key=value` overrides from the command line
//! 5. **Ready** - the tree is available through [`ConfigEngine::get`] and friends
//!
//! A failure at any step moves the engine to [`EngineState::Failed`]; the
//! partially built tree is dropped and never readable.

use super::env::{EnvSource, ProcessEnv, apply_env_overlay};
use super::expand::expand_tree;
use super::flags::apply_flags;
use super::include::resolve_includes;
use super::loader::{ConfigSource, DocumentFormat};
use super::merge::overwrite_keys;
use super::tree::ConfigTree;
use super::version::{DeprecationNotice, normalize_host_version, require_version, warn_if_legacy};
use crate::error::{ConfigError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name the engine registers under with its host.
pub const PLUGIN_NAME: &str = "config";

/// Lifecycle of a [`ConfigEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unconfigured,
    Loading,
    Including,
    Expanding,
    Overlaying,
    Ready,
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Unconfigured => write!(f, "unconfigured"),
            EngineState::Loading => write!(f, "loading"),
            EngineState::Including => write!(f, "including"),
            EngineState::Expanding => write!(f, "expanding"),
            EngineState::Overlaying => write!(f, "overlaying"),
            EngineState::Ready => write!(f, "ready"),
            EngineState::Failed => write!(f, "failed"),
        }
    }
}

/// A document handed over in memory instead of a file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDocument {
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
}

/// Inputs for a [`ConfigEngine`].
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Primary document path.
    pub path: Option<PathBuf>,
    /// Prefix for `<PREFIX>_<KEY>` environment overrides.
    pub prefix: String,
    /// In-memory document; takes precedence over `path` and `prefix`.
    pub inline: Option<InlineDocument>,
    /// `key=value` overrides, applied in order.
    pub flags: Vec<String>,
    /// Whether experimental features are enabled.
    pub experimental: bool,
    /// Graceful shutdown timeout, stored for the host.
    pub graceful_timeout: Duration,
    /// Version reported by the host process.
    pub host_version: String,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_inline(mut self, bytes: impl Into<Vec<u8>>, format: DocumentFormat) -> Self {
        self.inline = Some(InlineDocument {
            bytes: bytes.into(),
            format,
        });
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn with_experimental(mut self, experimental: bool) -> Self {
        self.experimental = experimental;
        self
    }

    pub fn with_graceful_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_timeout = timeout;
        self
    }

    pub fn with_host_version(mut self, version: impl Into<String>) -> Self {
        self.host_version = version.into();
        self
    }

    /// Pick the document source, checking that required inputs are present.
    pub fn source(&self) -> Result<ConfigSource> {
        if let Some(inline) = &self.inline {
            return Ok(ConfigSource::Inline {
                bytes: inline.bytes.clone(),
                format: inline.format,
            });
        }

        if self.prefix.is_empty() {
            return Err(ConfigError::MissingPrefix);
        }

        match &self.path {
            Some(path) if !path.as_os_str().is_empty() => Ok(ConfigSource::File {
                path: path.clone(),
                prefix: self.prefix.clone(),
            }),
            _ => Err(ConfigError::MissingPath),
        }
    }
}

/// Output of a successful resolution pass.
struct Resolved {
    tree: ConfigTree,
    document_version: String,
    effective_version: String,
    notice: Option<DeprecationNotice>,
}

/// Owns the resolved configuration tree.
///
/// Reads take `&self` and may run from many threads once the engine is
/// ready. [`ConfigEngine::overwrite`] takes `&mut self`, so callers sharing
/// the engine must serialize it themselves.
pub struct ConfigEngine {
    options: EngineOptions,
    env: Arc<dyn EnvSource>,
    state: EngineState,
    tree: Option<ConfigTree>,
    document_version: Option<String>,
    effective_version: String,
    notices: Vec<DeprecationNotice>,
}

impl std::fmt::Debug for ConfigEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigEngine")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("document_version", &self.document_version)
            .field("effective_version", &self.effective_version)
            .finish_non_exhaustive()
    }
}

impl ConfigEngine {
    /// Create an engine reading the process environment.
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            env: Arc::new(ProcessEnv),
            state: EngineState::Unconfigured,
            tree: None,
            document_version: None,
            effective_version: String::new(),
            notices: Vec::new(),
        }
    }

    /// Create and initialize an engine in one step.
    pub fn load(options: EngineOptions) -> Result<Self> {
        let mut engine = Self::new(options);
        engine.init()?;
        Ok(engine)
    }

    /// Use a different environment source.
    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Run the resolution pipeline.
    ///
    /// May only be called once, from [`EngineState::Unconfigured`].
    pub fn init(&mut self) -> Result<()> {
        if self.state != EngineState::Unconfigured {
            return Err(ConfigError::InvalidState {
                state: self.state.to_string(),
            });
        }

        match self.resolve() {
            Ok(resolved) => {
                self.tree = Some(resolved.tree);
                self.document_version = Some(resolved.document_version);
                self.effective_version = resolved.effective_version;
                self.notices.extend(resolved.notice);
                self.transition(EngineState::Ready);
                info!(
                    version = self.document_version.as_deref().unwrap_or_default(),
                    "Configuration loaded"
                );
                Ok(())
            }
            Err(err) => {
                warn!(stage = %self.state, error = %err, "Configuration failed to load");
                self.transition(EngineState::Failed);
                Err(err)
            }
        }
    }

    fn transition(&mut self, next: EngineState) {
        debug!(from = %self.state, to = %next, "Configuration state transition");
        self.state = next;
    }

    fn resolve(&mut self) -> Result<Resolved> {
        let source = self.options.source()?;
        let env = Arc::clone(&self.env);

        self.transition(EngineState::Loading);
        let primary = source.load()?;
        let document_version = require_version(&primary, &source.origin())?;

        self.transition(EngineState::Including);
        let mut tree = resolve_includes(&source.base_dir(), primary, &document_version)?;

        self.transition(EngineState::Expanding);
        if let Some(prefix) = source.env_prefix() {
            apply_env_overlay(&mut tree, prefix, env.as_ref());
        }
        expand_tree(&mut tree, env.as_ref());

        self.transition(EngineState::Overlaying);
        apply_flags(&mut tree, &self.options.flags, env.as_ref())?;

        Ok(Resolved {
            tree,
            effective_version: normalize_host_version(&self.options.host_version),
            notice: warn_if_legacy(&document_version),
            document_version,
        })
    }

    fn ready_tree(&self) -> Option<&ConfigTree> {
        match self.state {
            EngineState::Ready => self.tree.as_ref(),
            _ => None,
        }
    }

    /// Value at a dotted key, or `None` if absent or not ready.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.ready_tree()?.get(key)
    }

    /// Whether a dotted key is present.
    pub fn has(&self, key: &str) -> bool {
        self.ready_tree().is_some_and(|tree| tree.has(key))
    }

    /// Deserialize the section at `key`.
    pub fn unmarshal_key<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let tree = self.ready_tree().ok_or(ConfigError::NotReady)?;
        let value = tree
            .get(key)
            .ok_or_else(|| ConfigError::unmarshal(key, "section not found"))?;
        T::deserialize(value).map_err(|err| ConfigError::unmarshal(key, err))
    }

    /// Deserialize the whole tree.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T> {
        let tree = self.ready_tree().ok_or(ConfigError::NotReady)?;
        serde_json::from_value(tree.to_value()).map_err(|err| ConfigError::unmarshal("root", err))
    }

    /// Replace values at dotted keys. Never fails once the engine is ready.
    pub fn overwrite(&mut self, values: impl IntoIterator<Item = (String, Value)>) -> Result<()> {
        if self.state != EngineState::Ready {
            return Err(ConfigError::NotReady);
        }
        let tree = self.tree.as_mut().ok_or(ConfigError::NotReady)?;
        overwrite_keys(tree, values);
        Ok(())
    }

    /// Resolved tree, if ready.
    pub fn tree(&self) -> Option<&ConfigTree> {
        self.ready_tree()
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Host version with `""` and `local` replaced by the current schema version.
    ///
    /// Empty until the engine is ready.
    pub fn effective_version(&self) -> &str {
        &self.effective_version
    }

    /// Version declared by the primary document.
    pub fn document_version(&self) -> Option<&str> {
        self.document_version.as_deref()
    }

    /// Deprecation notices raised while loading.
    pub fn notices(&self) -> &[DeprecationNotice] {
        &self.notices
    }

    pub fn experimental(&self) -> bool {
        self.options.experimental
    }

    pub fn graceful_timeout(&self) -> Duration {
        self.options.graceful_timeout
    }

    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;

    fn inline(doc: &str) -> EngineOptions {
        EngineOptions::new().with_inline(doc, DocumentFormat::Yaml)
    }

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_missing_prefix() {
        let mut engine = ConfigEngine::new(EngineOptions::new().with_path(".rr.yaml"));
        let err = engine.init().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingPrefix);
        assert_eq!(engine.state(), EngineState::Failed);
    }

    #[test]
    fn test_missing_path() {
        let mut engine = ConfigEngine::new(EngineOptions::new().with_prefix("rr"));
        let err = engine.init().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingPath);
    }

    #[test]
    fn test_inline_document_ready() {
        let mut engine = ConfigEngine::new(inline("version: '3'\nrpc:\n  listen: tcp://127.0.0.1:6001\n"))
            .with_env(no_env());
        assert_eq!(engine.state(), EngineState::Unconfigured);
        engine.init().unwrap();

        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(engine.get("rpc.listen"), Some(&json!("tcp://127.0.0.1:6001")));
        assert!(engine.has("rpc"));
        assert!(!engine.has("http"));
        assert_eq!(engine.document_version(), Some("3"));
        assert_eq!(engine.effective_version(), "3");
        assert_eq!(engine.name(), "config");
    }

    #[test]
    fn test_reads_before_ready_see_nothing() {
        let engine = ConfigEngine::new(inline("version: '3'\na: 1\n"));
        assert!(engine.get("a").is_none());
        assert!(!engine.has("a"));
        let err = engine.unmarshal::<serde_json::Value>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotReady);
    }

    #[test]
    fn test_failed_engine_exposes_nothing() {
        let mut engine = ConfigEngine::new(inline("version: '3'\na: 1\n").with_flag("broken"))
            .with_env(no_env());
        let err = engine.init().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedFlag);
        assert_eq!(engine.state(), EngineState::Failed);
        assert!(engine.get("a").is_none());
        assert!(engine.tree().is_none());
    }

    #[test]
    fn test_init_only_once() {
        let mut engine = ConfigEngine::new(inline("version: '3'\n")).with_env(no_env());
        engine.init().unwrap();
        let err = engine.init().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
        assert_eq!(engine.state(), EngineState::Ready);
    }

    #[test]
    fn test_missing_version() {
        let mut engine = ConfigEngine::new(inline("rpc:\n  listen: x\n"));
        let err = engine.init().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingVersion);
    }

    #[test]
    fn test_numeric_version_rejected() {
        let mut engine = ConfigEngine::new(inline("version: 3\n"));
        let err = engine.init().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidVersionType);
    }

    #[test]
    fn test_legacy_version_warns_but_loads() {
        let mut engine = ConfigEngine::new(inline("version: '2.7'\n")).with_env(no_env());
        engine.init().unwrap();
        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(engine.notices().len(), 1);
        assert_eq!(engine.notices()[0].found, "2.7");
    }

    #[test]
    fn test_host_version_normalized() {
        let mut engine = ConfigEngine::new(inline("version: '3'\n").with_host_version("local"))
            .with_env(no_env());
        engine.init().unwrap();
        assert_eq!(engine.effective_version(), "3");

        let mut engine = ConfigEngine::new(inline("version: '3'\n").with_host_version("2.10"))
            .with_env(no_env());
        engine.init().unwrap();
        assert_eq!(engine.effective_version(), "2.10");
    }

    #[test]
    fn test_flags_expand_placeholders() {
        let options = inline("version: '3'\nrpc:\n  listen: tcp://127.0.0.1:1\n")
            .with_flag("rpc.listen=tcp://${RPC_VAL:-127.0.0.1:6001}");
        let mut engine = ConfigEngine::new(options).with_env(no_env());
        engine.init().unwrap();
        assert_eq!(engine.get("rpc.listen"), Some(&json!("tcp://127.0.0.1:6001")));
    }

    #[test]
    fn test_inline_skips_env_overlay() {
        let env: HashMap<String, String> =
            [("RR_ENDPOINT".to_string(), "from-env".to_string())].into();
        let options = inline("version: '3'\nendpoint: doc\n").with_prefix("rr");
        let mut engine = ConfigEngine::new(options).with_env(env);
        engine.init().unwrap();
        assert_eq!(engine.get("endpoint"), Some(&json!("doc")));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct RpcConfig {
        listen: String,
    }

    #[test]
    fn test_unmarshal_key() {
        let mut engine = ConfigEngine::new(inline("version: '3'\nrpc:\n  listen: tcp://x\n"))
            .with_env(no_env());
        engine.init().unwrap();

        let rpc: RpcConfig = engine.unmarshal_key("rpc").unwrap();
        assert_eq!(rpc.listen, "tcp://x");

        let err = engine.unmarshal_key::<RpcConfig>("http").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnmarshalError);

        let err = engine.unmarshal_key::<u32>("rpc.listen").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnmarshalError);
    }

    #[test]
    fn test_overwrite_after_ready() {
        let mut engine = ConfigEngine::new(inline("version: '3'\nrpc:\n  listen: a\n"))
            .with_env(no_env());

        let err = engine
            .overwrite(vec![("rpc.listen".to_string(), json!("b"))])
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotReady);

        engine.init().unwrap();
        engine
            .overwrite(vec![
                ("rpc.listen".to_string(), json!("b")),
                ("status.address".to_string(), json!("127.0.0.1:2114")),
            ])
            .unwrap();
        assert_eq!(engine.get("rpc.listen"), Some(&json!("b")));
        assert_eq!(engine.get("status.address"), Some(&json!("127.0.0.1:2114")));
    }

    #[test]
    fn test_host_accessors() {
        let options = inline("version: '3'\n")
            .with_experimental(true)
            .with_graceful_timeout(Duration::from_secs(10));
        let engine = ConfigEngine::new(options);
        assert!(engine.experimental());
        assert_eq!(engine.graceful_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConfigEngine>();
    }
}
