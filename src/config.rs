//! Configuration module for filestash.
//!
//! Configuration is assembled once at startup from an optional TOML file
//! and the process environment, then handed to the services that need it.
//! Nothing reads the environment after startup.

use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::auth::token::MAX_LIFETIME_MINUTES;
use crate::{Result, StashError};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins (empty = any origin, no credentials).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/filestash.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Upload storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory that receives uploaded files.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Maximum upload size in bytes. Unbounded when unset.
    #[serde(default)]
    pub max_upload_bytes: Option<u64>,
}

fn default_upload_dir() -> String {
    "storage/uploads".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_upload_bytes: None,
        }
    }
}

/// Access token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Token signing secret (required).
    #[serde(default)]
    pub secret_key: String,
    /// Signing algorithm name (HS256, HS384 or HS512).
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Access token lifetime in minutes.
    #[serde(default = "default_token_expiry")]
    pub access_token_expire_minutes: u64,
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_token_expiry() -> u64 {
    60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            algorithm: default_algorithm(),
            access_token_expire_minutes: default_token_expiry(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; console only when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Upload storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Access token configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(StashError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Build configuration from defaults plus environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| StashError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `HOST`, `PORT`
    /// - `DATABASE_PATH`
    /// - `UPLOAD_DIR`, `MAX_UPLOAD_BYTES`
    /// - `SECRET_KEY`, `ALGORITHM`, `ACCESS_TOKEN_EXPIRE_MINUTES`
    /// - `LOG_LEVEL`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Missing .env is the normal case in production
        let _ = dotenvy::dotenv();
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Empty values are ignored. Numeric values that fail to parse are
    /// configuration errors rather than silently falling back.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(path) = get("DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(dir) = get("UPLOAD_DIR") {
            self.storage.upload_dir = dir;
        }
        if let Some(max) = get("MAX_UPLOAD_BYTES") {
            self.storage.max_upload_bytes = Some(parse_var("MAX_UPLOAD_BYTES", &max)?);
        }
        if let Some(secret) = get("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Some(algorithm) = get("ALGORITHM") {
            self.auth.algorithm = algorithm;
        }
        if let Some(minutes) = get("ACCESS_TOKEN_EXPIRE_MINUTES") {
            self.auth.access_token_expire_minutes =
                parse_var("ACCESS_TOKEN_EXPIRE_MINUTES", &minutes)?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the token signing secret is not set.
    pub fn validate(&self) -> Result<()> {
        if self.auth.secret_key.is_empty() {
            return Err(StashError::Config(
                "SECRET_KEY is missing. Set it in the environment, .env, or [auth] secret_key."
                    .to_string(),
            ));
        }
        if self.auth.access_token_expire_minutes == 0 {
            return Err(StashError::Config(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be greater than zero".to_string(),
            ));
        }
        if self.auth.access_token_expire_minutes > MAX_LIFETIME_MINUTES {
            return Err(StashError::Config(format!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must not exceed {MAX_LIFETIME_MINUTES}"
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| StashError::Config(format!("{key} has an invalid value: {value:?}")))
}
