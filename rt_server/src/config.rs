//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use robo_tournament::{db::DatabaseConfig, tournament::BracketConfig};
use std::net::SocketAddr;

/// Default server bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Group sizes and bye handling
    pub bracket: BracketConfig,
    /// Keep everything in process memory instead of PostgreSQL
    pub memory: bool,
    /// Prometheus scrape address, metrics disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `memory` - Use the in-memory repository (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a set variable cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        memory: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.unwrap_or_else(default_bind),
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database = database.with_url(url);
        }

        let memory = memory || parse_env_or("MEMORY_STORE", false);

        Ok(ServerConfig {
            bind,
            database,
            bracket: BracketConfig::from_env(),
            memory,
            metrics_bind: parse_addr("METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let policy = &self.bracket.group_sizes;

        if policy.default_size < 2 {
            return Err(ConfigError::Invalid {
                var: "GROUP_SIZE_DEFAULT".to_string(),
                reason: "Must be at least 2".to_string(),
            });
        }

        if let Some((category, size)) = policy.overrides.iter().find(|(_, size)| **size < 2) {
            return Err(ConfigError::Invalid {
                var: "GROUP_SIZE_OVERRIDES".to_string(),
                reason: format!("Category {category} has group size {size}, must be at least 2"),
            });
        }

        if !self.memory {
            if self.database.database_url.is_empty() {
                return Err(ConfigError::MissingRequired {
                    var: "DATABASE_URL".to_string(),
                    hint: "Pass --db-url or run with --memory".to_string(),
                });
            }

            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        self.database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6969))
}

/// Parse an optional socket address; set-but-garbage is an error
fn parse_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("'{value}' is not an IP:PORT address"),
            }),
        Err(_) => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
