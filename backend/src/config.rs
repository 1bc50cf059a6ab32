//! Configuration management for the Inventory Management API
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with INV__ prefix (e.g. INV__JWT__SECRET)

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::Pagination;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production, test)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Password hashing configuration
    pub security: SecurityConfig,

    /// List endpoint limits
    pub pagination: PaginationConfig,

    /// Log output configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("INV_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("security.bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
            .set_default("pagination.default_per_page", 20)?
            .set_default("pagination.max_per_page", 100)?
            .set_default("logging.json", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (INV_ prefix)
            .add_source(
                Environment::with_prefix("INV")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < 16 && self.environment == "production" {
            return Err(ConfigError::Message(
                "jwt.secret must be at least 16 characters in production".to_string(),
            ));
        }
        if self.jwt.access_token_expiry <= 0 || self.jwt.refresh_token_expiry <= 0 {
            return Err(ConfigError::Message(
                "token expiry values must be positive".to_string(),
            ));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Message(
                "security.bcrypt_cost must be between 4 and 31".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether this is the development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl PaginationConfig {
    /// Turn raw query values into a clamped `Pagination`
    pub fn resolve(&self, page: Option<u32>, per_page: Option<u32>) -> Pagination {
        Pagination {
            page: page.unwrap_or(1),
            per_page: per_page.unwrap_or(self.default_per_page),
        }
        .normalized(self.max_per_page)
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: shared::DEFAULT_PER_PAGE,
            max_per_page: shared::MAX_PER_PAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            environment: "production".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/inventory".to_string(),
                max_connections: 5,
                min_connections: 1,
                acquire_timeout_secs: 5,
            },
            jwt: JwtConfig {
                secret: "a-long-enough-production-secret".to_string(),
                access_token_expiry: 3600,
                refresh_token_expiry: 7200,
            },
            security: SecurityConfig { bcrypt_cost: 10 },
            pagination: PaginationConfig::default(),
            logging: LoggingConfig { json: true },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected_in_production() {
        let mut config = sample();
        config.jwt.secret = "short".to_string();
        assert!(config.validate().is_err());

        config.environment = "development".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        let mut config = sample();
        config.security.bcrypt_cost = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pagination_resolve_applies_defaults_and_limits() {
        let pagination = PaginationConfig {
            default_per_page: 25,
            max_per_page: 50,
        };
        assert_eq!(
            pagination.resolve(None, None),
            Pagination { page: 1, per_page: 25 }
        );
        assert_eq!(
            pagination.resolve(Some(0), Some(500)),
            Pagination { page: 1, per_page: 50 }
        );
    }
}
