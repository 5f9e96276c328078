//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Relay poll interval must be between 1ms and 60s")]
    InvalidPollInterval,

    #[error("Relay batch size must be between 1 and 10000")]
    InvalidBatchSize,

    #[error("Consumer read block must be between 1ms and 60s")]
    InvalidReadBlock,

    #[error("Max concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("Topic name must not be empty: {0}")]
    EmptyTopic(&'static str),
}
