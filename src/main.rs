//! MongoDB push/pull tool
//!
//! Copies a database between localhost and a remote host by staging a
//! mongodump in a scratch directory and restoring it over the destination.

// mongo-sync/src/main.rs
mod backup;
mod cli;
mod config;
mod errors;
mod prompt;
mod restore;
mod sync;
mod utils;

use clap::Parser;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;

use cli::{Cli, Outcome};
use errors::SyncError;

/// Exit status used when the run is stopped with Ctrl-C.
const INTERRUPTED_EXIT_CODE: u8 = 130;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    // Usage errors exit here, before anything is acquired.
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli::run(cli).await {
        Ok(Outcome::Completed(direction)) => {
            println!("✅ {} completed successfully.", direction);
            ExitCode::SUCCESS
        }
        Ok(Outcome::Declined(direction)) => {
            println!("Aborted: {} was not confirmed, nothing was changed.", direction);
            ExitCode::SUCCESS
        }
        Ok(Outcome::DryRun) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            exit_code_for(&e)
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// A failed tool's own exit code is passed through; everything else is 1.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.chain().find_map(|e| e.downcast_ref::<SyncError>()) {
        Some(SyncError::ToolFailed { code, .. }) => ExitCode::from(tool_exit_status(*code)),
        Some(SyncError::Interrupted) => ExitCode::from(INTERRUPTED_EXIT_CODE),
        _ => ExitCode::FAILURE,
    }
}

fn tool_exit_status(code: Option<i32>) -> u8 {
    code.and_then(|c| u8::try_from(c).ok())
        .filter(|c| *c != 0)
        .unwrap_or(1)
}
