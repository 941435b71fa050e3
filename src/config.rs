use crate::draft::{DEFAULT_DEBOUNCE, RemoteConfig};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const HTTP_ADDR_VAR: &str = "CLASSROOM_HTTP_ADDR";
pub const CACHE_DIR_VAR: &str = "CLASSROOM_CACHE_DIR";
pub const DB_PATH_VAR: &str = "CLASSROOM_DB_PATH";
pub const DEBOUNCE_MS_VAR: &str = "CLASSROOM_DEBOUNCE_MS";

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_CACHE_DIR: &str = ".classroom-cache";
const DEFAULT_DB_PATH: &str = "classroom.db";

#[derive(Debug, Clone)]
pub struct ConfigError {
    variable: &'static str,
    message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.variable, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Runtime settings shared by the CLI and the HTTP server, read from the
/// environment. Unset variables fall back to defaults; malformed ones are
/// rejected.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub cache_dir: PathBuf,
    pub db_path: PathBuf,
    pub debounce: Duration,
    pub remote: Option<RemoteConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let http_addr = value(HTTP_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string())
            .trim()
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError {
                variable: HTTP_ADDR_VAR,
                message: err.to_string(),
            })?;

        let debounce = match value(DEBOUNCE_MS_VAR) {
            None => DEFAULT_DEBOUNCE,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|err| ConfigError {
                    variable: DEBOUNCE_MS_VAR,
                    message: format!("'{raw}' is not a millisecond count ({err})"),
                })?,
        };

        Ok(Self {
            http_addr,
            cache_dir: value(CACHE_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            db_path: value(DB_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            debounce,
            remote: RemoteConfig::from_lookup(&lookup),
        })
    }
}
