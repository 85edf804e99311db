//! Shared helper functions for CLI commands

use anyhow::Context;
use focuspath_core::{error::Result, Companion, FocuspathConfig};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// Flags every subcommand honours
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub offline: bool,
}

/// Layered configuration with the `--data-dir` override applied last
pub fn load_config(global: &GlobalArgs) -> Result<FocuspathConfig> {
    let mut config = FocuspathConfig::load(global.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(dir) = &global.data_dir {
        config.paths.data_dir = dir.clone();
    }
    debug!("Using data directory {}", config.paths.data_dir.display());
    Ok(config)
}

pub fn open_companion(global: &GlobalArgs) -> Result<Companion> {
    let config = load_config(global)?;
    let data_dir = config.paths.data_dir.clone();
    let companion = Companion::open(config)
        .with_context(|| format!("Failed to open study data in {}", data_dir.display()))?;
    Ok(companion)
}

/// Whether `format` asks for JSON output
pub fn wants_json(format: &str) -> bool {
    format.eq_ignore_ascii_case("json")
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Comma-separated display of anything printable, "-" when empty
pub fn join_or_dash<I, T>(items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    let joined: Vec<String> = items.into_iter().map(|i| i.to_string()).collect();
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined.join(", ")
    }
}
