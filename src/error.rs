//! Error types for admission control.
//!
//! Only configuration mistakes and lifecycle misuse are errors. A denied
//! request is an ordinary [`CheckResult`](crate::CheckResult) with
//! `allowed == false`.

use thiserror::Error;

/// Result type for limiter operations.
pub type Result<T> = std::result::Result<T, RateLimitError>;

/// Main error type for limiter operations.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The limiter was already destroyed. This is a lifecycle bug in the caller.
    #[error("Limiter '{limiter}' used after destroy")]
    Destroyed {
        /// Name of the destroyed limiter.
        limiter: String,
    },
}

impl RateLimitError {
    /// Check if this error comes from invalid configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Configuration-related errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid quota configuration.
    #[error("Invalid quota: {0}")]
    InvalidQuota(String),

    /// No limiter registered under this profile name.
    #[error("Unknown limiter profile: {0}")]
    UnknownProfile(String),

    /// Two profiles share a name.
    #[error("Duplicate limiter profile: {0}")]
    DuplicateProfile(String),

    /// An environment override is set but unusable.
    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// Raw value found.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Reclaim interval must be non-zero.
    #[error("Invalid reclaim interval: {0}")]
    InvalidReclaimInterval(String),

    /// A periodic reclaimer needs a tokio runtime to spawn on.
    #[error("Periodic reclamation requires a running tokio runtime")]
    MissingRuntime,
}
