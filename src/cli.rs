// mongo-sync/src/cli.rs
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{self, SyncConfig};
use crate::prompt;
use crate::sync::{self, Direction};
use crate::utils::command::SystemRunner;
use crate::utils::scratch;

/// Copy a MongoDB database between this machine and a remote host.
#[derive(Parser, Debug)]
#[command(
    name = "mongo-sync",
    version,
    about = "Push a local MongoDB database to a remote host, or pull it back",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the YAML config file [default: config.yml next to the executable]
    #[arg(long, global = true, value_name = "PATH", value_parser = existing_file)]
    pub config: Option<PathBuf>,

    /// Print the dump and restore commands without prompting or running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase logging verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Overwrite the remote database with the local one
    Push,
    /// Overwrite the local database with the remote one
    Pull,
}

impl From<Commands> for Direction {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Push => Direction::Push,
            Commands::Pull => Direction::Pull,
        }
    }
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed(Direction),
    Declined(Direction),
    DryRun,
}

fn existing_file(value: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("config file not found: {}", value))
    }
}

/// Drives one invocation: load config, confirm, transfer.
///
/// The transfer is raced against Ctrl-C; on interrupt the transfer future is
/// dropped, which kills the running tool and removes the scratch directory.
pub async fn run(cli: Cli) -> Result<Outcome> {
    let direction = Direction::from(cli.command);

    let config_path = config::resolve_config_path(cli.config.as_deref())?;
    let config = SyncConfig::load_from_yaml(&config_path).with_context(|| {
        format!("Failed to load configuration from {}", config_path.display())
    })?;
    info!(%direction, config_path = %config_path.display(), "Configuration loaded");

    if cli.dry_run {
        print_plan(direction, &config, &std::env::temp_dir());
        return Ok(Outcome::DryRun);
    }

    let stdin = io::stdin();
    if !prompt::confirm(direction, &config, &mut stdin.lock(), &mut io::stdout())? {
        return Ok(Outcome::Declined(direction));
    }

    let runner = SystemRunner;
    sync::run_sync_flow(
        direction,
        &config,
        &runner,
        &std::env::temp_dir(),
        tokio::signal::ctrl_c(),
    )
    .await
    .with_context(|| format!("{} failed", direction))?;

    Ok(Outcome::Completed(direction))
}

fn print_plan(direction: Direction, config: &SyncConfig, temp_root: &Path) {
    let scratch = scratch::scratch_path(temp_root, &config.local.db);
    let plan = sync::plan_transfer(direction, config, &scratch);
    println!("Dry run: {} would run", direction);
    println!("  1. {}", plan.dump);
    println!("  2. {}", plan.restore);
}
