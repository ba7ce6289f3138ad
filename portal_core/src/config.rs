//! Server configuration.
//!
//! Loaded from a JSON file named by `--config` or `PORTAL_CONFIG_PATH`,
//! otherwise the built-in defaults apply.

use std::{
    env, fmt, fs, io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::portal::DEFAULT_TITLE;

pub const CONFIG_PATH_ENV: &str = "PORTAL_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_bind: SocketAddr,
    pub portal_id: u32,
    pub default_title: String,
    /// Line-oriented update feed. `None` disables the tailer.
    pub feed_path: Option<PathBuf>,
    pub feed_interval_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5050),
            portal_id: 1,
            default_title: DEFAULT_TITLE.to_string(),
            feed_path: Some(PathBuf::from("portal_driver.json")),
            feed_interval_ms: 2000,
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse server config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read server config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Builtin,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Builtin => f.write_str("builtin"),
        }
    }
}

impl ServerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ServerConfig::from_json_str(&contents)?;
        Ok(config)
    }

    /// Load from `path` if given, else from `PORTAL_CONFIG_PATH`, else the
    /// defaults. A named file that cannot be loaded is an error.
    pub fn load(path: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
        match path {
            Some(path) => {
                let config = ServerConfig::from_file(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            None => Ok((ServerConfig::default(), ConfigSource::Builtin)),
        }
    }

    pub fn feed_interval(&self) -> Duration {
        Duration::from_millis(self.feed_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = ServerConfig::default();
        assert_eq!(config.http_bind.port(), 5050);
        assert_eq!(config.default_title, "default portal");
        assert_eq!(config.feed_interval(), Duration::from_secs(2));
        assert_eq!(config.feed_path, Some(PathBuf::from("portal_driver.json")));
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config = ServerConfig::from_json_str(
            r#"{"http_bind": "0.0.0.0:8080", "feed_path": null, "log_filter": "portal=debug"}"#,
        )
        .expect("config should parse");
        assert_eq!(config.http_bind.port(), 8080);
        assert!(config.feed_path.is_none());
        assert_eq!(config.log_filter, "portal=debug");
        assert_eq!(config.portal_id, 1);
    }

    #[test]
    fn explicit_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"portal_id": 12, "feed_interval_ms": 250}}"#).expect("write");
        let (config, source) = ServerConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.portal_id, 12);
        assert_eq!(config.feed_interval(), Duration::from_millis(250));
        assert_eq!(source, ConfigSource::File(file.path().to_path_buf()));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = ServerConfig::from_file(Path::new("/definitely/not/here.json"))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }
}
