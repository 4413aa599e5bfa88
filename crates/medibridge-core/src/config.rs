//! MediBridge Configuration Management
//!
//! Handles configuration from environment variables and TOML files, with
//! defaults suitable for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::reconcile::InvalidFieldPolicy;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Session cookie and lifetime
    pub session: SessionConfig,

    /// Password hashing parameters
    pub hashing: HashingConfig,

    /// Partial-update behavior
    pub reconcile: ReconcileConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Apply environment variables on top of the current values
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; env takes this path in production
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", port)?;
        }
        if let Some(secs) = lookup("STORE_TIMEOUT_SECS") {
            self.server.store_timeout_secs = parse_value("STORE_TIMEOUT_SECS", secs)?;
        }
        // CORS origins (comma-separated)
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // PostgreSQL
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.postgres_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(max) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_value("DATABASE_MAX_CONNECTIONS", max)?;
        }

        // Sessions
        if let Some(name) = lookup("SESSION_COOKIE_NAME") {
            self.session.cookie_name = name;
        }
        if let Some(hours) = lookup("SESSION_TTL_HOURS") {
            self.session.ttl_hours = parse_value("SESSION_TTL_HOURS", hours)?;
        }
        if let Some(secure) = lookup("SESSION_COOKIE_SECURE") {
            self.session.secure = parse_value("SESSION_COOKIE_SECURE", secure)?;
        }
        if let Some(revoke) = lookup("SESSION_REVOKE_ON_LOGOUT") {
            self.session.revoke_on_logout = parse_value("SESSION_REVOKE_ON_LOGOUT", revoke)?;
        }

        // Reconciler
        if let Some(policy) = lookup("RECONCILE_INVALID_FIELDS") {
            self.reconcile.invalid_fields =
                policy.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "RECONCILE_INVALID_FIELDS".to_string(),
                    value: policy,
                })?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(self)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.port".to_string(),
                value: "0".to_string(),
            });
        }
        if self.server.store_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.store_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.session.ttl_hours == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session.ttl_hours".to_string(),
                value: "0".to_string(),
            });
        }
        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired("session.cookie_name".to_string()));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Deadline for each storage call, in seconds
    pub store_timeout_secs: u64,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            store_timeout_secs: 5,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; the in-memory store is used when unset
    pub postgres_url: Option<String>,

    /// PostgreSQL connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: None,
            max_connections: 10,
        }
    }
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie carrying the session token
    pub cookie_name: String,

    /// Session lifetime in hours
    pub ttl_hours: u64,

    /// Add the `Secure` attribute to the cookie
    pub secure: bool,

    /// Delete the server-side session on logout
    pub revoke_on_logout: bool,
}

impl SessionConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours as i64)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "medibridge-token".to_string(),
            ttl_hours: 7 * 24,
            secure: false,
            revoke_on_logout: true,
        }
    }
}

/// Argon2id parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,
    /// Iterations
    pub time_cost: u32,
    /// Lanes
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// What happens to present fields that fail their constraint
    pub invalid_fields: InvalidFieldPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
