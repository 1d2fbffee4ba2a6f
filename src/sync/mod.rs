// mongo-sync/src/sync/mod.rs
pub(crate) mod logic;

use anyhow::{Context, Result};
use std::fmt;
use std::io;
use std::path::Path;
use tracing::warn;

use crate::config::SyncConfig;
use crate::errors::SyncError;
use crate::utils::command::CommandRunner;
use crate::utils::scratch::ScratchDir;

pub use logic::{TransferJob, plan_transfer};

/// Which end of the transfer is overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local database is the source, remote is overwritten.
    Push,
    /// Remote database is the source, local is overwritten.
    Pull,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Push => write!(f, "push"),
            Direction::Pull => write!(f, "pull"),
        }
    }
}

/// Public entry point for a push or pull.
///
/// Creates the scratch directory under `scratch_root` and hands it to a
/// [`TransferJob`], which removes it on every exit path. The job is raced
/// against `interrupt`; if that resolves first, the job is dropped (killing
/// any running tool and removing the scratch directory) and
/// [`SyncError::Interrupted`] is returned.
pub async fn run_sync_flow<F>(
    direction: Direction,
    config: &SyncConfig,
    runner: &dyn CommandRunner,
    scratch_root: &Path,
    interrupt: F,
) -> Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    let scratch = ScratchDir::create_in(scratch_root, &config.local.db)?;
    let job = TransferJob::new(direction, config, scratch);

    tokio::select! {
        result = job.run(runner) => result,
        signal = interrupt => {
            signal.context("Failed to listen for the interrupt signal")?;
            warn!(%direction, "Interrupt received, aborting transfer");
            Err(SyncError::Interrupted.into())
        }
    }
}
