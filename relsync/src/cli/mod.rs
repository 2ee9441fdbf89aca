//! Command-line interface over JSON datasets

pub mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use relsync::{BehaviorConfig, Dataset};

use commands::{ApplyArgs, ShowArgs, SyncArgs};

#[derive(Parser, Debug)]
#[command(name = "relsync", version, about = "Reconcile many-to-many relations of a record")]
pub struct Cli {
    /// Relation behavior config (TOML). Defaults to <config dir>/relsync/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the ids currently linked from a record
    Show(ShowArgs),
    /// Converge one relation to an explicit id list
    Sync(SyncArgs),
    /// Assign relation properties, then fire the after-save hook
    Apply(ApplyArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Show(args) => commands::show::handle_show_command(cli.config.as_deref(), args),
        Commands::Sync(args) => commands::sync::handle_sync_command(cli.config.as_deref(), args),
        Commands::Apply(args) => commands::apply::handle_apply_command(cli.config.as_deref(), args),
    }
}

/// Resolve the behavior config.
///
/// An explicit `--config` must load. Otherwise the default file is used if it
/// exists, and failing that every relation described in the dataset is managed.
pub fn resolve_config(explicit: Option<&Path>, dataset: &Dataset) -> Result<BehaviorConfig> {
    if let Some(path) = explicit {
        return BehaviorConfig::load(path);
    }

    let default_path = BehaviorConfig::default_path();
    if default_path.exists() {
        log::debug!("Using config file {}", default_path.display());
        return BehaviorConfig::load(&default_path);
    }

    log::info!("No config file found, managing all dataset relations");
    Ok(BehaviorConfig::new(
        dataset.relations.iter().map(|r| r.name.clone()),
    ))
}

/// Parse a comma separated id list (`1,2,3`). An empty string is the empty list.
pub fn parse_id_list(raw: &str) -> serde_json::Value {
    serde_json::Value::Array(
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| serde_json::Value::String(part.to_string()))
            .collect(),
    )
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        anyhow::bail!("Dataset file does not exist: {}", path.display());
    }
    Dataset::load(path).context("Failed to load dataset")
}
