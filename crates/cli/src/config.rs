//! Configuration loading from outing.toml.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use storage::StoreOptions;

/// Environment variable that overrides `auth.jwt_secret`.
pub const SECRET_ENV: &str = "OUTING_JWT_SECRET";

const MIN_SECRET_LEN: usize = 32;

/// Top-level configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Database file. Defaults to the platform data directory.
    pub path: Option<PathBuf>,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret. `OUTING_JWT_SECRET` takes precedence.
    pub jwt_secret: Option<String>,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_token_ttl_secs() -> u64 {
    marketplace::DEFAULT_TOKEN_TTL.as_secs()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.database.busy_timeout_ms),
        }
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.token_ttl_secs)
    }

    /// The signing secret, from the environment or the file.
    pub fn jwt_secret(&self) -> Result<String, ConfigError> {
        select_secret(std::env::var(SECRET_ENV).ok(), self.auth.jwt_secret.clone())
    }
}

fn select_secret(env: Option<String>, file: Option<String>) -> Result<String, ConfigError> {
    let secret = env
        .filter(|s| !s.is_empty())
        .or(file)
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::MissingSecret)?;

    if secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::WeakSecret);
    }
    Ok(secret)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("signing secret not configured: set auth.jwt_secret or OUTING_JWT_SECRET")]
    MissingSecret,

    #[error("signing secret must be at least 32 bytes")]
    WeakSecret,
}
