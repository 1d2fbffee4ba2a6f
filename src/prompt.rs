// mongo-sync/src/prompt.rs
use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use crate::config::SyncConfig;
use crate::sync::Direction;

/// The only answer that lets a destructive run proceed, matched case-insensitively.
pub const CONFIRMATION_TOKEN: &str = "yes";

/// Asks the user to confirm overwriting the destination of `direction`.
///
/// Returns `Ok(false)` for any answer other than "yes", including end of input.
pub fn confirm<R: BufRead, W: Write>(
    direction: Direction,
    config: &SyncConfig,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    let (source, destination) = match direction {
        Direction::Push => (config.local.to_string(), config.remote.to_string()),
        Direction::Pull => (config.remote.to_string(), config.local.to_string()),
    };

    writeln!(
        output,
        "⚠️  {} will DROP and overwrite {} with the contents of {}.",
        direction, destination, source
    )?;
    write!(
        output,
        "Type '{}' to {}: ",
        CONFIRMATION_TOKEN, direction
    )?;
    output.flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(is_confirmation(&answer))
}

pub fn is_confirmation(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(CONFIRMATION_TOKEN)
}
