//! Server configuration
//!
//! Layered with figment: compiled defaults, then an optional TOML file, then
//! `CAREERSHOT_`-prefixed environment variables (`__` separates nested
//! keys, e.g. `CAREERSHOT_RESOLVER__CONTAINER`). Command-line flags are
//! applied on top by the binary.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthConfig;
use crate::resolver::ResolverConfig;
use crate::storage::ObjectStoreBackend;

/// Config file read when none is given explicitly
pub const DEFAULT_CONFIG_FILE: &str = "careershot.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CAREERSHOT_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// SQLite file backing the record store; None = in-memory
    pub database: Option<String>,
    /// Redirect plain-HTTP requests to HTTPS
    pub https_redirect: bool,
    pub request_timeout_secs: u64,
    pub resolver: ResolverConfig,
    pub object_store: ObjectStoreBackend,
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database: None,
            https_redirect: false,
            request_timeout_secs: 30,
            resolver: ResolverConfig::default(),
            object_store: ObjectStoreBackend::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Load defaults, the TOML file and the environment. An explicit `path`
    /// must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::MissingFile(path.to_path_buf()))
            }
            Some(path) => path,
            None => Path::new(DEFAULT_CONFIG_FILE),
        };

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.container.is_empty() {
            return Err(ConfigError::Invalid("resolver.container is empty".into()));
        }
        if self.resolver.page_size == 0 {
            return Err(ConfigError::Invalid("resolver.page_size must be at least 1".into()));
        }
        if self.resolver.max_scan == 0 {
            return Err(ConfigError::Invalid("resolver.max_scan must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be at least 1".into()));
        }

        if self.auth.enabled {
            if self.auth.token_sha256.is_empty() {
                return Err(ConfigError::Invalid(
                    "auth is enabled but auth.token_sha256 is empty".into(),
                ));
            }
            if let Some(bad) = self
                .auth
                .token_sha256
                .iter()
                .find(|d| d.trim().len() != 64 || hex::decode(d.trim()).is_err())
            {
                return Err(ConfigError::Invalid(format!(
                    "auth.token_sha256 entry {:?} is not a hex SHA-256 digest",
                    bad
                )));
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
