//! CLI definitions for config-resolver
//!
//! This module defines the CLI structure using clap's derive macros.

use crate::config::{DocumentFormat, EngineOptions};
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Default configuration file.
pub const DEFAULT_CONFIG_PATH: &str = ".rr.yaml";

/// Default prefix for `<PREFIX>_<KEY>` environment overrides.
pub const DEFAULT_PREFIX: &str = "rr";

/// Output format for the resolved configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Resolve a configuration file and print the result
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Prefix for environment variable overrides of top-level keys
    #[arg(short, long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Override a configuration key: -o key=value (repeatable)
    #[arg(short = 'o', long = "override", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Read the document from stdin with this type instead of a file
    #[arg(long, value_name = "TYPE")]
    pub stdin: Option<DocumentFormat>,

    /// Version reported by the host (empty or "local" means current schema)
    #[arg(long, default_value = "")]
    pub host_version: String,

    /// Enable experimental features
    #[arg(long)]
    pub experimental: bool,

    /// Graceful shutdown timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Print only this dotted key
    #[arg(short, long)]
    pub get: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}

impl Cli {
    /// Engine options for a file-backed document.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions::new()
            .with_path(&self.config)
            .with_prefix(&self.prefix)
            .with_flags(self.overrides.iter().cloned())
            .with_host_version(&self.host_version)
            .with_experimental(self.experimental)
            .with_graceful_timeout(Duration::from_secs(self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["config-resolver"]);
        assert_eq!(cli.config, ".rr.yaml");
        assert_eq!(cli.prefix, "rr");
        assert!(cli.overrides.is_empty());
        assert_eq!(cli.format, OutputFormat::Yaml);
        assert_eq!(cli.log, "2");
    }

    #[test]
    fn test_repeated_overrides_keep_order() {
        let cli = Cli::parse_from([
            "config-resolver",
            "-c",
            "configs/.rr.yaml",
            "-o",
            "rpc.listen=tcp://127.0.0.1:6001",
            "-o",
            "http.address=0.0.0.0:8080",
            "--format",
            "json",
            "--stdin",
            "json",
        ]);
        assert_eq!(
            cli.overrides,
            vec!["rpc.listen=tcp://127.0.0.1:6001", "http.address=0.0.0.0:8080"]
        );
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.stdin, Some(DocumentFormat::Json));

        let options = cli.engine_options();
        assert_eq!(options.flags.len(), 2);
        assert_eq!(options.prefix, "rr");
        assert_eq!(options.graceful_timeout, Duration::from_secs(30));
    }
}
