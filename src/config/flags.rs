//! Command-line `key=value` overrides.
//!
//! A flag is split at its first `=`. Values starting with `"`, `'` or a
//! backtick are read as quoted: the delimiter is dropped from both ends and
//! `\<delimiter>` inside stands for a literal delimiter. No other escapes exist.

use super::env::EnvSource;
use super::expand::expand_str;
use super::tree::ConfigTree;
use crate::error::{ConfigError, FlagErrorKind, Result};
use serde_json::Value;
use tracing::debug;

const ESCAPE: char = '\\';

/// Characters stripped from the start of a flag before splitting.
const LEADING_TRIM: &[char] = &[' ', '\t', '\n', '"', '\'', '`'];

/// A parsed `key=value` override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagOverride {
    /// Dotted key path.
    pub key: String,
    /// Unquoted value, placeholders not yet expanded.
    pub value: String,
}

/// Lexer state for a flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteState {
    Unquoted,
    SingleQuoted,
    DoubleQuoted,
    BacktickQuoted,
}

impl QuoteState {
    /// State selected by the first character of a value.
    pub fn from_opening(c: char) -> Self {
        match c {
            '\'' => QuoteState::SingleQuoted,
            '"' => QuoteState::DoubleQuoted,
            '`' => QuoteState::BacktickQuoted,
            _ => QuoteState::Unquoted,
        }
    }

    /// Delimiter character, if quoted.
    pub fn delimiter(self) -> Option<char> {
        match self {
            QuoteState::Unquoted => None,
            QuoteState::SingleQuoted => Some('\''),
            QuoteState::DoubleQuoted => Some('"'),
            QuoteState::BacktickQuoted => Some('`'),
        }
    }
}

/// Parse a single `key=value` flag.
pub fn parse_flag(flag: &str) -> Result<FlagOverride> {
    let trimmed = flag.trim_start_matches(LEADING_TRIM);
    let Some((key, value)) = trimmed.split_once('=') else {
        return Err(ConfigError::malformed_flag(flag, FlagErrorKind::NoSeparator));
    };

    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::malformed_flag(flag, FlagErrorKind::EmptyKey));
    }

    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::malformed_flag(flag, FlagErrorKind::EmptyValue));
    }

    Ok(FlagOverride {
        key: key.to_string(),
        value: unquote(value),
    })
}

/// Strip enclosing quotes from a value and unescape the delimiter.
pub fn unquote(value: &str) -> String {
    let mut chars = value.chars();
    let state = chars.next().map_or(QuoteState::Unquoted, QuoteState::from_opening);
    let Some(delimiter) = state.delimiter() else {
        return value.to_string();
    };

    let body: Vec<char> = chars.collect();
    let mut out = String::with_capacity(value.len());
    let mut i = 0;
    while i < body.len() {
        let c = body[i];
        if c == ESCAPE && body.get(i + 1) == Some(&delimiter) {
            out.push(delimiter);
            i += 2;
            continue;
        }
        if c == delimiter && i + 1 == body.len() {
            // closing delimiter
            break;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Parse and apply overrides in order, expanding placeholders in each value.
///
/// All flags are parsed before any is applied, so a malformed flag leaves
/// the tree untouched.
pub fn apply_flags(tree: &mut ConfigTree, flags: &[String], env: &dyn EnvSource) -> Result<()> {
    let overrides = flags
        .iter()
        .map(|flag| parse_flag(flag))
        .collect::<Result<Vec<_>>>()?;

    for FlagOverride { key, value } in overrides {
        let expanded = expand_str(&value, env);
        debug!(key = %key, "Applying command-line override");
        tree.set(&key, Value::String(expanded));
    }

    Ok(())
}
