// mongo-sync/src/utils/command.rs
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;
use which::which;

use crate::errors::{Result, SyncError};

#[cfg(test)]
use mockall::automock;

/// External MongoDB tools this crate drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Dump,
    Restore,
}

impl Tool {
    pub fn binary_name(self) -> &'static str {
        match self {
            Tool::Dump => "mongodump",
            Tool::Restore => "mongorestore",
        }
    }
}

/// One call of an external tool: which tool and its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: Tool,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(tool: Tool) -> Self {
        ToolInvocation {
            tool,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn flag(self, name: &str, value: impl Into<String>) -> Self {
        self.arg(name).arg(value)
    }
}

#[cfg(test)]
impl ToolInvocation {
    /// Value following `name`, if the flag is present.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == name)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_arg(&self, name: &str) -> bool {
        self.args.iter().any(|a| a == name)
    }
}

// Rendered for logs and dry runs; the password value is masked.
impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tool.binary_name())?;
        let mut mask_next = false;
        for arg in &self.args {
            if mask_next {
                write!(f, " ****")?;
            } else {
                write!(f, " {}", arg)?;
            }
            mask_next = arg == "--password";
        }
        Ok(())
    }
}

/// What a finished tool run reported back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Capability to run an external tool and wait for it to exit.
///
/// Only failures to start the process are errors here; a non-zero exit is
/// reported through [`ToolOutput`] and judged by the caller.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

/// Runs the real binaries found on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn find_executable(tool: Tool) -> Result<PathBuf> {
        which(tool.binary_name()).map_err(|_| SyncError::ToolNotFound(tool.binary_name()))
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let path = Self::find_executable(invocation.tool)?;
        debug!(executable = %path.display(), command = %invocation, "Spawning external tool");

        let output = Command::new(&path)
            .args(&invocation.args)
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
