// mongo-sync/src/restore/db_restore.rs
use std::path::Path;

use crate::config::{AUTHENTICATION_DATABASE, LOCAL_HOST, LocalDatabase, RemoteDatabase};
use crate::utils::command::{Tool, ToolInvocation};

/// Restore into the remote database, the destination of a push.
///
/// `dump_dir` is the per-database directory mongodump wrote, i.e.
/// `<scratch>/<source db>`. Existing collections are dropped first.
pub fn remote_restore(remote: &RemoteDatabase, dump_dir: &Path) -> ToolInvocation {
    ToolInvocation::new(Tool::Restore)
        .flag("--host", &remote.host)
        .flag("--port", remote.port.to_string())
        .flag("--db", &remote.db)
        .flag("--username", &remote.username)
        .flag("--password", &remote.password)
        .flag("--authenticationDatabase", AUTHENTICATION_DATABASE)
        .arg("--drop")
        .arg(dump_dir.display().to_string())
}

/// Restore into the local database, the destination of a pull.
///
/// Credentials are passed only when both local username and password are configured.
pub fn local_restore(local: &LocalDatabase, dump_dir: &Path) -> ToolInvocation {
    let mut restore = ToolInvocation::new(Tool::Restore)
        .flag("--host", LOCAL_HOST)
        .flag("--port", local.port.to_string())
        .flag("--db", &local.db);

    if let Some((username, password)) = local.credentials() {
        restore = restore
            .flag("--username", username)
            .flag("--password", password)
            .flag("--authenticationDatabase", AUTHENTICATION_DATABASE);
    }

    restore.arg("--drop").arg(dump_dir.display().to_string())
}
