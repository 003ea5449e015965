//! Structured error types for configuration resolution.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Missing required inputs
    MissingPrefix,
    MissingPath,

    // Document loading
    DocumentReadError,
    DocumentParseError,

    // Schema version
    MissingVersion,
    InvalidVersionType,
    IncludeVersionMismatch,

    // Includes
    IncludeReadError,
    InvalidInclude,

    // Overrides
    MalformedFlag,

    // Read access
    UnmarshalError,
    NotReady,
    InvalidState,
}

/// Why a `key=value` override string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagErrorKind {
    /// No `=` anywhere in the flag.
    NoSeparator,
    /// Nothing left of the key after trimming quotes and whitespace.
    EmptyKey,
    /// Nothing left of the value after trimming whitespace.
    EmptyValue,
}

impl fmt::Display for FlagErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagErrorKind::NoSeparator => write!(f, "missing '=' separator, usage: -o key=value"),
            FlagErrorKind::EmptyKey => write!(f, "key should not be empty"),
            FlagErrorKind::EmptyValue => write!(f, "value should not be empty"),
        }
    }
}

/// Errors produced while building or reading the configuration tree.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("prefix should be set")]
    MissingPrefix,

    #[error("path should be set")]
    MissingPath,

    #[error("failed to read configuration file {}: {source}", .path.display())]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration document {origin}: {reason}")]
    DocumentParse { origin: String, reason: String },

    #[error("configuration {origin} should contain a version e.g: version: 3")]
    MissingVersion { origin: String },

    #[error("version in {origin} should be a string, actual type is: {actual}")]
    InvalidVersionType { origin: String, actual: &'static str },

    #[error(
        "version in included file {} ({found}) must be the same like in root ({expected})",
        .include.display()
    )]
    IncludeVersionMismatch {
        include: PathBuf,
        expected: String,
        found: String,
    },

    #[error("failed to load included file {}: {reason}", .path.display())]
    IncludeRead { path: PathBuf, reason: String },

    #[error("include should be a list of file names, {reason}")]
    InvalidInclude { reason: String },

    #[error("invalid flag `{flag}`: {kind}")]
    MalformedFlag { flag: String, kind: FlagErrorKind },

    #[error("failed to unmarshal {section}: {reason}")]
    Unmarshal { section: String, reason: String },

    #[error("configuration is not initialized")]
    NotReady,

    #[error("cannot initialize configuration in state {state}")]
    InvalidState { state: String },
}

impl ConfigError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::MissingPrefix => ErrorCode::MissingPrefix,
            ConfigError::MissingPath => ErrorCode::MissingPath,
            ConfigError::DocumentRead { .. } => ErrorCode::DocumentReadError,
            ConfigError::DocumentParse { .. } => ErrorCode::DocumentParseError,
            ConfigError::MissingVersion { .. } => ErrorCode::MissingVersion,
            ConfigError::InvalidVersionType { .. } => ErrorCode::InvalidVersionType,
            ConfigError::IncludeVersionMismatch { .. } => ErrorCode::IncludeVersionMismatch,
            ConfigError::IncludeRead { .. } => ErrorCode::IncludeReadError,
            ConfigError::InvalidInclude { .. } => ErrorCode::InvalidInclude,
            ConfigError::MalformedFlag { .. } => ErrorCode::MalformedFlag,
            ConfigError::Unmarshal { .. } => ErrorCode::UnmarshalError,
            ConfigError::NotReady => ErrorCode::NotReady,
            ConfigError::InvalidState { .. } => ErrorCode::InvalidState,
        }
    }

    // Convenience constructors

    pub fn malformed_flag(flag: &str, kind: FlagErrorKind) -> Self {
        ConfigError::MalformedFlag {
            flag: flag.to_string(),
            kind,
        }
    }

    pub fn unmarshal(section: &str, err: impl fmt::Display) -> Self {
        ConfigError::Unmarshal {
            section: section.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn parse(origin: impl fmt::Display, err: impl fmt::Display) -> Self {
        ConfigError::DocumentParse {
            origin: origin.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
