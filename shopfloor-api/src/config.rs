/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `SESSION_TTL_HOURS`: Session lifetime (default: 8)
/// - `HYDRATION_TTL_SECONDS`: Working-set staleness window (default: 30)
/// - `WRITE_MAX_ATTEMPTS`: Durable write retry cap (default: 3)
/// - `WRITE_BACKOFF_MS`: Sleep between transient write retries (default: 150)
/// - `RUST_LOG`: Log level (default: info)

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Tenant cache configuration
    pub cache: CacheConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Tenant cache and durability knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Session lifetime in hours
    pub session_ttl_hours: i64,

    /// Working-set hydration TTL in seconds
    pub hydration_ttl_seconds: u64,

    /// Durable write retry cap
    pub write_max_attempts: u32,

    /// Sleep between transient write retries, in milliseconds
    pub write_backoff_ms: u64,
}

impl CacheConfig {
    pub fn hydration_ttl(&self) -> Duration {
        Duration::from_secs(self.hydration_ttl_seconds)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    pub fn write_backoff(&self) -> Duration {
        Duration::from_millis(self.write_backoff_ms)
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or values fail to
    /// parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "8".to_string())
            .parse::<i64>()?;

        let hydration_ttl_seconds = env::var("HYDRATION_TTL_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()?;

        let write_max_attempts = env::var("WRITE_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()?;

        let write_backoff_ms = env::var("WRITE_BACKOFF_MS")
            .unwrap_or_else(|_| "150".to_string())
            .parse::<u64>()?;

        if session_ttl_hours <= 0 {
            anyhow::bail!("SESSION_TTL_HOURS must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            cache: CacheConfig {
                session_ttl_hours,
                hydration_ttl_seconds,
                write_max_attempts,
                write_backoff_ms,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            cache: CacheConfig {
                session_ttl_hours: 8,
                hydration_ttl_seconds: 30,
                write_max_attempts: 3,
                write_backoff_ms: 150,
            },
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_cache_durations() {
        let cache = config().cache;
        assert_eq!(cache.hydration_ttl(), Duration::from_secs(30));
        assert_eq!(cache.session_ttl(), chrono::Duration::hours(8));
        assert_eq!(cache.write_backoff(), Duration::from_millis(150));
    }
}
