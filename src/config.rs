//! Limiter profile table.
//!
//! Profiles are fixed policy, loaded once at startup. Only the general API
//! profile can be tuned from the environment:
//!
//! - `RATE_LIMIT_WINDOW_MS`: window length in milliseconds
//! - `RATE_LIMIT_MAX_REQUESTS`: requests per window
//!
//! A variable that is set but not a positive integer is a configuration
//! error, never a silent fallback to the default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::key::KeyStrategy;
use crate::limiter::LimiterConfig;
use crate::reclaimer::ReclaimInterval;

/// Well-known profile names.
pub mod profiles {
    /// Catch-all for API routes.
    pub const GENERAL_API: &str = "general-api";
    /// Login and other credential endpoints.
    pub const AUTH: &str = "auth";
    /// API routes for signed-in users.
    pub const PER_USER_API: &str = "per-user-api";
    /// Contact form submissions.
    pub const CONTACT_FORM: &str = "contact-form";
    /// Newsletter sign-ups.
    pub const NEWSLETTER: &str = "newsletter";
}

/// Env var overriding the general API window.
pub const ENV_WINDOW_MS: &str = "RATE_LIMIT_WINDOW_MS";

/// Env var overriding the general API request cap.
pub const ENV_MAX_REQUESTS: &str = "RATE_LIMIT_MAX_REQUESTS";

const MINUTE_MS: u64 = 60 * 1000;
const HOUR_MS: u64 = 60 * MINUTE_MS;

/// One named limiter profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Registry name.
    pub name: String,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests admitted per window.
    pub max_requests: u64,

    /// How keys are derived (default: client IP).
    #[serde(default)]
    pub key_strategy: KeyStrategy,

    /// Sweep interval in milliseconds (default: 5 minutes). `0` disables
    /// the background sweep.
    #[serde(default = "default_reclaim_interval_ms")]
    pub reclaim_interval_ms: u64,
}

fn default_reclaim_interval_ms() -> u64 {
    crate::reclaimer::DEFAULT_RECLAIM_INTERVAL.as_millis() as u64
}

impl ProfileConfig {
    /// Create a profile with the default reclaim interval.
    pub fn new(
        name: impl Into<String>,
        window_ms: u64,
        max_requests: u64,
        key_strategy: KeyStrategy,
    ) -> Self {
        Self {
            name: name.into(),
            window_ms,
            max_requests,
            key_strategy,
            reclaim_interval_ms: default_reclaim_interval_ms(),
        }
    }

    /// Reclamation schedule for this profile.
    pub fn reclaim_interval(&self) -> ReclaimInterval {
        match self.reclaim_interval_ms {
            0 => ReclaimInterval::Manual,
            ms => ReclaimInterval::Every(Duration::from_millis(ms)),
        }
    }

    /// Convert into a limiter configuration.
    pub fn to_limiter_config(&self) -> LimiterConfig {
        LimiterConfig::new(
            self.name.clone(),
            self.max_requests,
            Duration::from_millis(self.window_ms),
        )
        .with_key(self.key_strategy.clone())
        .with_reclaim(self.reclaim_interval())
    }
}

/// The full profile table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Profiles, one limiter each.
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl RegistryConfig {
    /// The built-in profile table.
    pub fn standard() -> Self {
        Self {
            profiles: vec![
                ProfileConfig::new(profiles::GENERAL_API, 15 * MINUTE_MS, 100, KeyStrategy::ClientIp),
                ProfileConfig::new(profiles::AUTH, 15 * MINUTE_MS, 5, KeyStrategy::ClientIp),
                ProfileConfig::new(
                    profiles::PER_USER_API,
                    MINUTE_MS,
                    60,
                    KeyStrategy::UserOrClientIp,
                ),
                ProfileConfig::new(profiles::CONTACT_FORM, HOUR_MS, 3, KeyStrategy::ClientIp),
                ProfileConfig::new(profiles::NEWSLETTER, 24 * HOUR_MS, 1, KeyStrategy::ClientIp),
            ],
        }
    }

    /// The built-in table with general API overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|var| std::env::var(var).ok())
    }

    /// The built-in table with general API overrides from `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::standard();
        let window_ms = parse_positive(&lookup, ENV_WINDOW_MS)?;
        let max_requests = parse_positive(&lookup, ENV_MAX_REQUESTS)?;

        if let Some(general) = config.profile_mut(profiles::GENERAL_API) {
            if let Some(window_ms) = window_ms {
                general.window_ms = window_ms;
            }
            if let Some(max_requests) = max_requests {
                general.max_requests = max_requests;
            }
        }

        Ok(config)
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Option<&ProfileConfig> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Look up a profile by name for editing.
    pub fn profile_mut(&mut self, name: &str) -> Option<&mut ProfileConfig> {
        self.profiles.iter_mut().find(|p| p.name == name)
    }
}

fn parse_positive<F>(lookup: &F, var: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };

    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value,
            reason: "expected a positive integer".into(),
        }
        .into()),
    }
}
