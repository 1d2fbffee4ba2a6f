use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to parse YAML in {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing required config fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("invalid port '{value}' for config key '{key}'")]
    InvalidPort { key: String, value: String },

    #[error("{0} executable not found in PATH. Please ensure the MongoDB database tools are installed and in your PATH.")]
    ToolNotFound(&'static str),

    #[error("{tool} failed with {}\nStderr: {stderr}", exit_label(.code))]
    ToolFailed {
        tool: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("interrupted before the transfer finished")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
