//! Redis configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Redis configuration for the stream transport
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Prefix prepended to every destination to form the stream key
    #[serde(default)]
    pub stream_prefix: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl RedisConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            stream_prefix: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_defaults() {
        let config = RedisConfig::default();
        assert_eq!(config.timeout_secs, 5);
        assert!(config.stream_prefix.is_empty());
    }

    #[test]
    fn test_timeout_duration() {
        let config = RedisConfig {
            timeout_secs: 10,
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_validation_missing_url() {
        assert_eq!(
            RedisConfig::default().validate(),
            Err(ValidationError::MissingRequired("REDIS_URL"))
        );
    }

    #[test]
    fn test_validation_invalid_scheme() {
        let config = RedisConfig {
            url: "http://localhost:6379".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRedisUrl));
    }

    #[test]
    fn test_validation_tls_url() {
        let config = RedisConfig {
            url: "rediss://cache.example.com:6380".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
