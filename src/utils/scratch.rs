// mongo-sync/src/utils/scratch.rs
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, TempDir};
use tracing::{debug, warn};

use crate::errors::Result;

const SCRATCH_PREFIX: &str = "mongo-sync-";

/// Staging directory for one transfer's dump.
///
/// The name is derived from the local database name, so it is stable across
/// runs. The directory is removed when this value is closed or dropped.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Creates `<root>/mongo-sync-<local_db>`, replacing a stale one.
    pub fn create_in(root: &Path, local_db: &str) -> Result<Self> {
        let path = scratch_path(root, local_db);
        if path.exists() {
            warn!(path = %path.display(), "Removing stale scratch directory from an earlier run");
            fs::remove_dir_all(&path)?;
        }

        let dir = TempFileBuilder::new()
            .prefix(&scratch_dir_name(local_db))
            .rand_bytes(0)
            .tempdir_in(root)?;
        debug!(path = %dir.path().display(), "Scratch directory created");
        Ok(ScratchDir { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the directory, reporting any failure instead of ignoring it.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!(path = %path.display(), "Scratch directory removed");
        Ok(())
    }
}

/// Where the scratch directory for `local_db` lives under `root`.
pub fn scratch_path(root: &Path, local_db: &str) -> PathBuf {
    root.join(scratch_dir_name(local_db))
}

// Sanitizing is lossy: names such as `a.b` and `a_b` share one directory, so
// two concurrent runs against them would clobber each other's dump.
fn scratch_dir_name(local_db: &str) -> String {
    let sanitized: String = local_db
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}{}", SCRATCH_PREFIX, sanitized)
}
