// mongo-sync/src/config/mod.rs
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::{Result, SyncError};

/// File looked up next to the executable when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Prefix for environment variables overriding flattened config keys.
pub const ENV_PREFIX: &str = "MONGO_SYNC_";

/// Host of the local end; only its port is configurable.
pub const LOCAL_HOST: &str = "localhost";

/// Database credentials are checked against on both ends.
pub const AUTHENTICATION_DATABASE: &str = "admin";

// Flattened keys, as produced by joining nested YAML keys with '_'
#[derive(Debug, Default)]
struct RawConfig {
    local_db: Option<String>,
    local_host_port: Option<String>,
    local_access_username: Option<String>,
    local_access_password: Option<String>,
    remote_db: Option<String>,
    remote_host_url: Option<String>,
    remote_host_port: Option<String>,
    remote_access_username: Option<String>,
    remote_access_password: Option<String>,
}

const FLAT_KEYS: &[&str] = &[
    "local_db",
    "local_host_port",
    "local_access_username",
    "local_access_password",
    "remote_db",
    "remote_host_url",
    "remote_host_port",
    "remote_access_username",
    "remote_access_password",
];

// On-disk shape. Every leaf is a `String` so serde_yaml hands back the scalar
// exactly as written (`0x1F`, `1.10`, `007`) instead of a resolved number.
// Keys may be nested (`remote: {host: {port: ..}}`) or already joined
// (`remote_host_port`, `remote: {host_port: ..}`); the nested form wins.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    local: Option<EndpointSection>,
    remote: Option<EndpointSection>,
    local_db: Option<String>,
    local_host_port: Option<String>,
    local_access_username: Option<String>,
    local_access_password: Option<String>,
    remote_db: Option<String>,
    remote_host_url: Option<String>,
    remote_host_port: Option<String>,
    remote_access_username: Option<String>,
    remote_access_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointSection {
    db: Option<String>,
    host: Option<HostSection>,
    access: Option<AccessSection>,
    host_url: Option<String>,
    host_port: Option<String>,
    access_username: Option<String>,
    access_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HostSection {
    url: Option<String>,
    port: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AccessSection {
    username: Option<String>,
    password: Option<String>,
}

struct FlatEndpoint {
    db: Option<String>,
    host_url: Option<String>,
    host_port: Option<String>,
    access_username: Option<String>,
    access_password: Option<String>,
}

impl EndpointSection {
    fn flatten(self) -> FlatEndpoint {
        let host = self.host.unwrap_or_default();
        let access = self.access.unwrap_or_default();
        FlatEndpoint {
            db: self.db,
            host_url: host.url.or(self.host_url),
            host_port: host.port.or(self.host_port),
            access_username: access.username.or(self.access_username),
            access_password: access.password.or(self.access_password),
        }
    }
}

impl ConfigFile {
    fn flatten(self) -> RawConfig {
        let local = self.local.unwrap_or_default().flatten();
        let remote = self.remote.unwrap_or_default().flatten();
        RawConfig {
            local_db: local.db.or(self.local_db),
            local_host_port: local.host_port.or(self.local_host_port),
            local_access_username: local.access_username.or(self.local_access_username),
            local_access_password: local.access_password.or(self.local_access_password),
            remote_db: remote.db.or(self.remote_db),
            remote_host_url: remote.host_url.or(self.remote_host_url),
            remote_host_port: remote.host_port.or(self.remote_host_port),
            remote_access_username: remote.access_username.or(self.remote_access_username),
            remote_access_password: remote.access_password.or(self.remote_access_password),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDatabase {
    pub db: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDatabase {
    pub db: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Both ends of a transfer. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub local: LocalDatabase,
    pub remote: RemoteDatabase,
}

impl LocalDatabase {
    /// Credentials for the local restore, only when both halves are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }
}

impl fmt::Display for LocalDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local database '{}' ({}:{})", self.db, LOCAL_HOST, self.port)
    }
}

impl fmt::Display for RemoteDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote database '{}' ({}:{})", self.db, self.host, self.port)
    }
}

impl SyncConfig {
    /// Loads the YAML config at `config_path`, applying `MONGO_SYNC_*` overrides
    /// from the process environment.
    pub fn load_from_yaml(config_path: &Path) -> Result<Self> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env<F>(config_path: &Path, env_lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SyncError::ConfigNotFound(config_path.to_path_buf())
            } else {
                SyncError::Io(e)
            }
        })?;
        info!(config_path = %config_path.display(), "Config file read");

        // An empty file has no document to deserialize.
        let file: ConfigFile = if config_content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(&config_content).map_err(|source| SyncError::ConfigParse {
                path: config_path.to_path_buf(),
                source,
            })?
        };

        let mut raw = file.flatten();
        raw.apply_env_overrides(env_lookup);

        let config = raw.validate()?;
        debug!(
            local_db = %config.local.db,
            remote_db = %config.remote.db,
            remote_host = %config.remote.host,
            "Config validated"
        );
        Ok(config)
    }
}

impl RawConfig {
    fn validate(self) -> Result<SyncConfig> {
        let required = [
            ("local_db", &self.local_db),
            ("local_host_port", &self.local_host_port),
            ("remote_db", &self.remote_db),
            ("remote_host_url", &self.remote_host_url),
            ("remote_host_port", &self.remote_host_port),
            ("remote_access_username", &self.remote_access_username),
            ("remote_access_password", &self.remote_access_password),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| is_blank(value))
            .map(|(key, _)| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SyncError::MissingFields(missing));
        }

        // All required fields are present past this point. Only ports are
        // trimmed; every other value is passed to the tools as written.
        let take = |value: Option<String>| value.unwrap_or_default();

        let local_port = parse_port("local_host_port", take(self.local_host_port).trim())?;
        let remote_port = parse_port("remote_host_port", take(self.remote_host_port).trim())?;

        Ok(SyncConfig {
            local: LocalDatabase {
                db: take(self.local_db),
                port: local_port,
                username: non_empty(self.local_access_username),
                password: non_empty(self.local_access_password),
            },
            remote: RemoteDatabase {
                db: take(self.remote_db),
                host: take(self.remote_host_url),
                port: remote_port,
                username: take(self.remote_access_username),
                password: take(self.remote_access_password),
            },
        })
    }

    fn slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        let slot = match key {
            "local_db" => &mut self.local_db,
            "local_host_port" => &mut self.local_host_port,
            "local_access_username" => &mut self.local_access_username,
            "local_access_password" => &mut self.local_access_password,
            "remote_db" => &mut self.remote_db,
            "remote_host_url" => &mut self.remote_host_url,
            "remote_host_port" => &mut self.remote_host_port,
            "remote_access_username" => &mut self.remote_access_username,
            "remote_access_password" => &mut self.remote_access_password,
            _ => return None,
        };
        Some(slot)
    }

    fn apply_env_overrides<F>(&mut self, env_lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in FLAT_KEYS {
            let var = format!("{}{}", ENV_PREFIX, key.to_ascii_uppercase());
            if let (Some(value), Some(slot)) = (env_lookup(&var), self.slot(key)) {
                debug!(key, var = %var, "Config value overridden from environment");
                *slot = Some(value);
            }
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Keeps a value only if it has non-whitespace content; the value itself is untouched.
fn non_empty(value: Option<String>) -> Option<String> {
    if is_blank(&value) { None } else { value }
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value.parse::<u16>().map_err(|_| SyncError::InvalidPort {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Resolves which config file to read.
///
/// An explicit path is used as given. Otherwise `config.yml` is looked up in
/// the directory holding the running executable, not the working directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let exe = std::env::current_exe()?;
    let exe_dir = exe.parent().unwrap_or_else(|| Path::new("."));
    let default_path = exe_dir.join(DEFAULT_CONFIG_FILE);
    if !default_path.is_file() {
        return Err(SyncError::ConfigNotFound(default_path));
    }
    Ok(default_path)
}
