//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `IDEMPOTENT_CONSUMER`
//! prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use idempotent_consumer::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Relaying every {:?}", config.relay.poll_interval());
//! ```

mod database;
mod error;
mod processing;
mod redis;
mod relay;
mod telemetry;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use processing::ProcessingConfig;
pub use redis::RedisConfig;
pub use relay::RelayConfig;
pub use telemetry::{Environment, TelemetryConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Logging (environment, filter, format)
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// PostgreSQL connection
    pub database: DatabaseConfig,

    /// Redis stream transport
    pub redis: RedisConfig,

    /// Outbox relay loop
    #[serde(default)]
    pub relay: RelayConfig,

    /// Processing engine destinations and inbound consumer
    #[serde(default)]
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `IDEMPOTENT_CONSUMER` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `IDEMPOTENT_CONSUMER__DATABASE__URL=...` -> `database.url = ...`
    /// - `IDEMPOTENT_CONSUMER__RELAY__BATCH_SIZE=50` -> `relay.batch_size = 50`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("IDEMPOTENT_CONSUMER")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.redis.validate()?;
        self.relay.validate()?;
        self.processing.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.telemetry.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::consumer::FailurePolicy;
    use crate::domain::processing::ProcessingStrategy;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var(
            "IDEMPOTENT_CONSUMER__DATABASE__URL",
            "postgresql://test@localhost/orders",
        );
        env::set_var("IDEMPOTENT_CONSUMER__REDIS__URL", "redis://localhost:6379");
    }

    fn clear_env() {
        for key in [
            "IDEMPOTENT_CONSUMER__DATABASE__URL",
            "IDEMPOTENT_CONSUMER__REDIS__URL",
            "IDEMPOTENT_CONSUMER__TELEMETRY__ENVIRONMENT",
            "IDEMPOTENT_CONSUMER__RELAY__BATCH_SIZE",
            "IDEMPOTENT_CONSUMER__PROCESSING__FAILURE_POLICY",
            "IDEMPOTENT_CONSUMER__PROCESSING__MAX_CONCURRENCY",
            "IDEMPOTENT_CONSUMER__PROCESSING__STRATEGY",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/orders");
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_database_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("IDEMPOTENT_CONSUMER__REDIS__URL", "redis://localhost:6379");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_section_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.telemetry.environment, Environment::Development);
        assert_eq!(config.relay.batch_size, 100);
        assert_eq!(config.processing.outbound_topic, "demo-outbound-topic");
        assert_eq!(config.processing.failure_policy, FailurePolicy::Redeliver);
    }

    #[test]
    fn test_overrides_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("IDEMPOTENT_CONSUMER__TELEMETRY__ENVIRONMENT", "production");
        env::set_var("IDEMPOTENT_CONSUMER__RELAY__BATCH_SIZE", "25");
        env::set_var("IDEMPOTENT_CONSUMER__PROCESSING__FAILURE_POLICY", "dead_letter");
        env::set_var("IDEMPOTENT_CONSUMER__PROCESSING__MAX_CONCURRENCY", "3");
        env::set_var("IDEMPOTENT_CONSUMER__PROCESSING__STRATEGY", "idempotent");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert_eq!(config.relay.batch_size, 25);
        assert_eq!(config.processing.failure_policy, FailurePolicy::DeadLetter);
        assert_eq!(config.processing.max_concurrency, 3);
        assert_eq!(config.processing.strategy, ProcessingStrategy::Idempotent);
    }
}
