// mongo-sync/src/backup/db_dump.rs
use std::path::Path;

use crate::config::{AUTHENTICATION_DATABASE, LOCAL_HOST, LocalDatabase, RemoteDatabase};
use crate::utils::command::{Tool, ToolInvocation};

/// Collections with this prefix are internal to the server and never pulled.
pub const EXCLUDED_COLLECTION_PREFIX: &str = "system";

/// Dump of the local database, used as the source of a push.
///
/// The local end is reached without credentials.
pub fn local_dump(local: &LocalDatabase, out_dir: &Path) -> ToolInvocation {
    ToolInvocation::new(Tool::Dump)
        .flag("--host", LOCAL_HOST)
        .flag("--port", local.port.to_string())
        .flag("--db", &local.db)
        .flag("--out", out_dir.display().to_string())
}

/// Dump of the remote database, used as the source of a pull.
pub fn remote_dump(remote: &RemoteDatabase, out_dir: &Path) -> ToolInvocation {
    ToolInvocation::new(Tool::Dump)
        .flag("--host", &remote.host)
        .flag("--port", remote.port.to_string())
        .flag("--db", &remote.db)
        .flag("--username", &remote.username)
        .flag("--password", &remote.password)
        .flag("--authenticationDatabase", AUTHENTICATION_DATABASE)
        .flag("--excludeCollectionsWithPrefix", EXCLUDED_COLLECTION_PREFIX)
        .flag("--out", out_dir.display().to_string())
}
