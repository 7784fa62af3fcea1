//! Process configuration
//!
//! `SnapgenConfig` is read from an optional TOML file; every field has a
//! default so an empty file (or no file) gives a working server.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors loading a config file
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for `SnapgenConfig`
    #[error("invalid config {path}: {source}")]
    Toml {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },
}

/// External services snapgen talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// GitHub REST API base
    pub github_api: String,
    /// Repository config file looked up through the contents API
    pub config_file: String,
    /// Raw content host
    pub raw_content: String,
    /// CDN mirror of the raw content host, used for ReSpec sources
    pub mirror: String,
    /// Bikeshed rendering endpoint
    pub bikeshed: String,
    /// ReSpec spec-generator endpoint
    pub respec: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".to_string(),
            config_file: ".pr-preview.json".to_string(),
            raw_content: "https://raw.githubusercontent.com".to_string(),
            mirror: "https://rawgit.com".to_string(),
            bikeshed: "https://api.csswg.org/bikeshed/".to_string(),
            respec: "https://labs.w3.org/spec-generator/".to_string(),
        }
    }
}

/// Snapgen configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapgenConfig {
    /// Listening port
    pub port: u16,
    /// Listening address
    pub bind_address: IpAddr,
    /// Directory served as static files; snapshots go under `snapshot/`
    pub public_dir: PathBuf,
    /// Optional operational log file
    pub log_file: Option<PathBuf>,
    /// `User-Agent` sent on every outbound request (GitHub requires one)
    pub user_agent: String,
    /// Optional GitHub token for the contents API
    pub github_token: Option<String>,
    /// Optional per-request timeout; unset means requests may hang
    pub request_timeout_secs: Option<u64>,
    /// External services
    pub endpoints: Endpoints,
}

impl SnapgenConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// - `LoadError::Io` if the file cannot be read
    /// - `LoadError::Toml` if it does not parse
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| LoadError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// With listening port
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// With public directory
    #[inline]
    #[must_use]
    pub fn with_public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = dir.into();
        self
    }

    /// With log file
    #[inline]
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// With external endpoints
    #[inline]
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Root of the snapshot tree
    #[inline]
    #[must_use]
    pub fn snapshot_root(&self) -> PathBuf {
        self.public_dir.join("snapshot")
    }

    /// Request timeout, if configured
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for SnapgenConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_address: IpAddr::from([0, 0, 0, 0]),
            public_dir: PathBuf::from("public"),
            log_file: None,
            user_agent: "W3C Commit Snapshot Generator".to_string(),
            github_token: None,
            request_timeout_secs: None,
            endpoints: Endpoints::default(),
        }
    }
}
