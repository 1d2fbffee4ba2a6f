// mongo-sync/src/sync/logic.rs
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use super::Direction;
use crate::backup::db_dump;
use crate::config::SyncConfig;
use crate::errors::SyncError;
use crate::restore::db_restore;
use crate::utils::command::{CommandRunner, ToolInvocation};
use crate::utils::scratch::ScratchDir;

/// The two external calls a transfer is made of, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub dump: ToolInvocation,
    pub restore: ToolInvocation,
}

/// Builds the dump and restore invocations for `direction`, staging through `scratch`.
///
/// mongodump writes each database under `<out>/<db name>`, so the restore
/// reads from the subdirectory named after the source database.
pub fn plan_transfer(direction: Direction, config: &SyncConfig, scratch: &Path) -> TransferPlan {
    match direction {
        Direction::Push => TransferPlan {
            dump: db_dump::local_dump(&config.local, scratch),
            restore: db_restore::remote_restore(&config.remote, &scratch.join(&config.local.db)),
        },
        Direction::Pull => TransferPlan {
            dump: db_dump::remote_dump(&config.remote, scratch),
            restore: db_restore::local_restore(&config.local, &scratch.join(&config.remote.db)),
        },
    }
}

/// A single push or pull in flight.
///
/// Owns the scratch directory: it is closed after a successful restore and
/// dropped (and so removed) on any error or when the job future is cancelled.
pub struct TransferJob<'a> {
    direction: Direction,
    config: &'a SyncConfig,
    scratch: ScratchDir,
}

impl<'a> TransferJob<'a> {
    pub fn new(direction: Direction, config: &'a SyncConfig, scratch: ScratchDir) -> Self {
        TransferJob {
            direction,
            config,
            scratch,
        }
    }

    /// Dumps the source into the scratch directory, then restores it over the destination.
    ///
    /// A failed dump stops the run before any restore is attempted.
    pub async fn run(self, runner: &dyn CommandRunner) -> Result<()> {
        let TransferJob {
            direction,
            config,
            scratch,
        } = self;

        let plan = plan_transfer(direction, config, scratch.path());
        let (source, destination) = match direction {
            Direction::Push => (config.local.to_string(), config.remote.to_string()),
            Direction::Pull => (config.remote.to_string(), config.local.to_string()),
        };
        info!(%direction, scratch = %scratch.path().display(), "Starting transfer");

        println!("📤 Dumping {} into {}...", source, scratch.path().display());
        execute_step(runner, &plan.dump)
            .await
            .with_context(|| format!("Failed to dump {}", source))?;
        println!("✓ Dump of {} completed successfully.", source);

        println!("📥 Restoring into {} (existing collections are dropped)...", destination);
        execute_step(runner, &plan.restore)
            .await
            .with_context(|| format!("Failed to restore into {}", destination))?;
        println!("✓ Restore into {} completed successfully.", destination);

        scratch
            .close()
            .context("Failed to remove scratch directory")?;
        Ok(())
    }
}

/// Runs one external tool to completion; a non-zero exit is an error.
async fn execute_step(runner: &dyn CommandRunner, invocation: &ToolInvocation) -> Result<()> {
    info!(command = %invocation, "Running external tool");
    let output = runner.run(invocation).await?;

    if !output.stdout.trim().is_empty() {
        debug!(tool = invocation.tool.binary_name(), stdout = %output.stdout.trim(), "Tool output");
    }

    if !output.success() {
        return Err(SyncError::ToolFailed {
            tool: invocation.tool.binary_name(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LocalDatabase, RemoteDatabase};
    use crate::utils::command::{MockCommandRunner, Tool, ToolOutput};
    use mockall::Sequence;
    use std::path::PathBuf;

    fn test_config() -> SyncConfig {
        SyncConfig {
            local: LocalDatabase {
                db: "a".to_string(),
                port: 27017,
                username: None,
                password: None,
            },
            remote: RemoteDatabase {
                db: "b".to_string(),
                host: "h".to_string(),
                port: 27017,
                username: "u".to_string(),
                password: "p".to_string(),
            },
        }
    }

    fn exited(code: i32) -> ToolOutput {
        ToolOutput {
            code: Some(code),
            stdout: String::new(),
            stderr: if code == 0 {
                String::new()
            } else {
                "Failed: connection refused".to_string()
            },
        }
    }

    fn tool_failure(err: &anyhow::Error) -> Option<(&'static str, Option<i32>)> {
        err.chain()
            .find_map(|e| e.downcast_ref::<SyncError>())
            .and_then(|e| match e {
                SyncError::ToolFailed { tool, code, .. } => Some((*tool, *code)),
                _ => None,
            })
    }

    #[test]
    fn push_plan_restores_local_dump_into_remote() {
        let config = test_config();
        let plan = plan_transfer(Direction::Push, &config, Path::new("/tmp/mongo-sync-a"));

        assert_eq!(plan.dump.tool, Tool::Dump);
        assert_eq!(plan.dump.value_of("--db"), Some("a"));
        assert_eq!(plan.restore.tool, Tool::Restore);
        assert_eq!(plan.restore.value_of("--db"), Some("b"));
        assert_eq!(plan.restore.args.last().map(String::as_str), Some("/tmp/mongo-sync-a/a"));
    }

    #[test]
    fn pull_plan_restores_remote_dump_into_local() {
        let config = test_config();
        let plan = plan_transfer(Direction::Pull, &config, Path::new("/tmp/mongo-sync-a"));

        assert_eq!(plan.dump.value_of("--host"), Some("h"));
        assert_eq!(plan.dump.value_of("--excludeCollectionsWithPrefix"), Some("system"));
        assert_eq!(plan.restore.value_of("--host"), Some("localhost"));
        assert_eq!(plan.restore.value_of("--db"), Some("a"));
        assert_eq!(plan.restore.args.last().map(String::as_str), Some("/tmp/mongo-sync-a/b"));
    }

    #[tokio::test]
    async fn push_dumps_local_before_restoring_remote() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let config = test_config();
        let scratch = ScratchDir::create_in(root.path(), &config.local.db)?;
        let scratch_path = scratch.path().to_path_buf();

        let mut runner = MockCommandRunner::new();
        let mut seq = Sequence::new();
        let out_dir = scratch_path.display().to_string();
        let staged: PathBuf = scratch_path.clone();
        runner
            .expect_run()
            .withf(move |inv| {
                inv.tool == Tool::Dump
                    && inv.value_of("--host") == Some("localhost")
                    && inv.value_of("--port") == Some("27017")
                    && inv.value_of("--db") == Some("a")
                    && inv.value_of("--out") == Some(out_dir.as_str())
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| {
                assert!(staged.exists(), "scratch directory must exist while dumping");
                Ok(exited(0))
            });
        runner
            .expect_run()
            .withf(|inv| {
                inv.tool == Tool::Restore
                    && inv.value_of("--host") == Some("h")
                    && inv.value_of("--db") == Some("b")
                    && inv.value_of("--authenticationDatabase") == Some("admin")
                    && inv.has_arg("--drop")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(exited(0)));

        TransferJob::new(Direction::Push, &config, scratch)
            .run(&runner)
            .await?;

        assert!(!scratch_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn pull_dumps_remote_with_exclusion_before_restoring_local() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let config = test_config();
        let scratch = ScratchDir::create_in(root.path(), &config.local.db)?;
        let scratch_path = scratch.path().to_path_buf();

        let mut runner = MockCommandRunner::new();
        let mut seq = Sequence::new();
        runner
            .expect_run()
            .withf(|inv| {
                inv.tool == Tool::Dump
                    && inv.value_of("--host") == Some("h")
                    && inv.value_of("--username") == Some("u")
                    && inv.value_of("--excludeCollectionsWithPrefix") == Some("system")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(exited(0)));
        runner
            .expect_run()
            .withf(|inv| {
                inv.tool == Tool::Restore
                    && inv.value_of("--host") == Some("localhost")
                    && inv.value_of("--db") == Some("a")
                    && inv.has_arg("--drop")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(exited(0)));

        TransferJob::new(Direction::Pull, &config, scratch)
            .run(&runner)
            .await?;

        assert!(!scratch_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn failed_dump_never_restores_and_cleans_up() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let config = test_config();
        let scratch = ScratchDir::create_in(root.path(), &config.local.db)?;
        let scratch_path = scratch.path().to_path_buf();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv| inv.tool == Tool::Dump)
            .times(1)
            .returning(|_| Ok(exited(3)));
        runner
            .expect_run()
            .withf(|inv| inv.tool == Tool::Restore)
            .times(0);

        let err = TransferJob::new(Direction::Push, &config, scratch)
            .run(&runner)
            .await
            .unwrap_err();

        assert_eq!(tool_failure(&err), Some(("mongodump", Some(3))));
        assert!(format!("{:?}", err).contains("connection refused"));
        assert!(!scratch_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn failed_restore_reports_code_and_cleans_up() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let config = test_config();
        let scratch = ScratchDir::create_in(root.path(), &config.local.db)?;
        let scratch_path = scratch.path().to_path_buf();

        let mut runner = MockCommandRunner::new();
        let mut seq = Sequence::new();
        runner
            .expect_run()
            .withf(|inv| inv.tool == Tool::Dump)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(exited(0)));
        runner
            .expect_run()
            .withf(|inv| inv.tool == Tool::Restore)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(exited(1)));

        let err = TransferJob::new(Direction::Pull, &config, scratch)
            .run(&runner)
            .await
            .unwrap_err();

        assert_eq!(tool_failure(&err), Some(("mongorestore", Some(1))));
        assert!(!scratch_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn missing_tool_cleans_up() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let config = test_config();
        let scratch = ScratchDir::create_in(root.path(), &config.local.db)?;
        let scratch_path = scratch.path().to_path_buf();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|inv| Err(SyncError::ToolNotFound(inv.tool.binary_name())));

        let err = TransferJob::new(Direction::Push, &config, scratch)
            .run(&runner)
            .await
            .unwrap_err();

        assert!(format!("{:?}", err).contains("mongodump executable not found"));
        assert!(!scratch_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn push_then_pull_runs_two_dumps_and_two_restores() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let config = test_config();

        let mut runner = MockCommandRunner::new();
        let mut seq = Sequence::new();
        for direction in [Direction::Push, Direction::Pull] {
            runner
                .expect_run()
                .withf(move |inv| {
                    inv.tool == Tool::Dump
                        && inv.has_arg("--excludeCollectionsWithPrefix")
                            == (direction == Direction::Pull)
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(exited(0)));
            let destination_host = match direction {
                Direction::Push => "h",
                Direction::Pull => "localhost",
            };
            runner
                .expect_run()
                .withf(move |inv| {
                    inv.tool == Tool::Restore && inv.value_of("--host") == Some(destination_host)
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(exited(0)));
        }

        for direction in [Direction::Push, Direction::Pull] {
            let scratch = ScratchDir::create_in(root.path(), &config.local.db)?;
            TransferJob::new(direction, &config, scratch)
                .run(&runner)
                .await?;
        }

        assert!(!root.path().join("mongo-sync-a").exists());
        Ok(())
    }
}
