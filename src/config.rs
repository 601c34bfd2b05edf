//! Connection bootstrap.
//!
//! A hosted deployment hands us `DATABASE_URL`. A local run falls back to a
//! TOML connections file that names a default connection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const CACHE_TTL_ENV: &str = "CHURN_CACHE_TTL_SECS";

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CACHE_CAPACITY: usize = 128;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no DATABASE_URL set and config file not found at {0}")]
    MissingFile(PathBuf),
    #[error("failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("no default_connection_name specified in {0}")]
    NoDefaultConnection(PathBuf),
    #[error("connection '{name}' not found in {path}")]
    UnknownConnection { name: String, path: PathBuf },
    #[error("invalid CHURN_CACHE_TTL_SECS value '{0}'")]
    InvalidTtl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionSource {
    Hosted { url: String },
    File { name: String, url: String },
}

impl ConnectionSource {
    pub fn url(&self) -> &str {
        match self {
            ConnectionSource::Hosted { url } => url,
            ConnectionSource::File { url, .. } => url,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ConnectionSource::Hosted { .. } => format!("hosted ({DATABASE_URL_ENV})"),
            ConnectionSource::File { name, .. } => format!("config connection '{name}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub connection: ConnectionSource,
    pub max_connections: u32,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    default_connection_name: Option<String>,
    cache_ttl_secs: Option<u64>,
    cache_capacity: Option<usize>,
    #[serde(default)]
    connections: HashMap<String, ConnectionEntry>,
}

#[derive(Debug, Deserialize)]
struct ConnectionEntry {
    url: String,
    max_connections: Option<u32>,
}

pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".churn-signals")
        .join("config.toml")
}

/// Resolves settings from the process environment.
pub fn load(config_path: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    let hosted_url = std::env::var(DATABASE_URL_ENV).ok();
    let ttl_override = std::env::var(CACHE_TTL_ENV).ok();
    resolve(hosted_url.as_deref(), ttl_override.as_deref(), &path)
}

pub fn resolve(
    hosted_url: Option<&str>,
    ttl_override: Option<&str>,
    config_path: &Path,
) -> Result<Settings, ConfigError> {
    let hosted_url = hosted_url.filter(|url| !url.trim().is_empty());

    // With a hosted URL the file only tunes the cache, so a broken file is
    // skipped rather than fatal.
    let file = match (hosted_url, config_path.exists()) {
        (_, false) => None,
        (Some(_), true) => match read_config_file(config_path) {
            Ok(file) => Some(file),
            Err(err) => {
                warn!(error = %err, "ignoring unreadable connections file");
                None
            }
        },
        (None, true) => Some(read_config_file(config_path)?),
    };

    let (connection, max_connections) = match hosted_url {
        Some(url) => (
            ConnectionSource::Hosted {
                url: url.to_string(),
            },
            DEFAULT_MAX_CONNECTIONS,
        ),
        None => resolve_from_file(file.as_ref(), config_path)?,
    };

    let mut cache_ttl = Duration::from_secs(
        file.as_ref()
            .and_then(|f| f.cache_ttl_secs)
            .unwrap_or(DEFAULT_CACHE_TTL_SECS),
    );
    if let Some(raw) = ttl_override {
        let secs: u64 = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidTtl(raw.to_string()))?;
        cache_ttl = Duration::from_secs(secs);
    }

    Ok(Settings {
        connection,
        max_connections,
        cache_ttl,
        cache_capacity: file
            .as_ref()
            .and_then(|f| f.cache_capacity)
            .unwrap_or(DEFAULT_CACHE_CAPACITY),
    })
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    toml::from_str(&raw).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn resolve_from_file(
    file: Option<&ConfigFile>,
    path: &Path,
) -> Result<(ConnectionSource, u32), ConfigError> {
    let file = file.ok_or_else(|| ConfigError::MissingFile(path.to_path_buf()))?;
    let name = file
        .default_connection_name
        .clone()
        .ok_or_else(|| ConfigError::NoDefaultConnection(path.to_path_buf()))?;
    let entry = file
        .connections
        .get(&name)
        .ok_or_else(|| ConfigError::UnknownConnection {
            name: name.clone(),
            path: path.to_path_buf(),
        })?;

    Ok((
        ConnectionSource::File {
            name,
            url: entry.url.clone(),
        },
        entry.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
    ))
}
