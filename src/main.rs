//! config-resolver
//!
//! Resolves a configuration document with its includes, environment
//! placeholders and `-o key=value` overrides, then prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use config_resolver::cli::{Cli, OutputFormat};
use config_resolver::config::ConfigEngine;
use config_resolver::logging::{self, LogTarget};
use serde_json::Value;
use std::io::Read;
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut options = cli.engine_options();
    if let Some(format) = cli.stdin {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("failed to read configuration from stdin")?;
        options = options.with_inline(bytes, format);
    }

    let engine = ConfigEngine::load(options)?;
    debug!(
        effective_version = engine.effective_version(),
        experimental = engine.experimental(),
        "Configuration resolved"
    );

    let value = match &cli.get {
        Some(key) => engine
            .get(key)
            .cloned()
            .with_context(|| format!("key not found: {key}"))?,
        None => engine
            .tree()
            .map(|tree| tree.to_value())
            .unwrap_or(Value::Null),
    };

    print!("{}", render(&value, cli.format)?);
    Ok(())
}

fn render(value: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(value)?)),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
    }
}
