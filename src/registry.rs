//! Named set of limiters, one per route class.
//!
//! The registry is built once at startup, passed to route handlers, and torn
//! down with [`LimiterRegistry::destroy_all`] on shutdown. It is read-only in
//! between.
//!
//! # Example
//!
//! ```ignore
//! use admission_ratelimit::{LimiterRegistry, RegistryConfig};
//! use admission_ratelimit::config::profiles;
//!
//! let registry = LimiterRegistry::from_config(&RegistryConfig::from_env()?)?;
//!
//! let result = registry.get(profiles::AUTH)?.check(&identity)?;
//!
//! // on shutdown
//! registry.destroy_all();
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::config::RegistryConfig;
use crate::error::{ConfigError, Result};
use crate::limiter::{Limiter, LimiterConfig};
use crate::reclaimer::ReclaimInterval;

/// Fixed map from profile name to limiter.
#[derive(Debug)]
pub struct LimiterRegistry {
    limiters: HashMap<String, Arc<Limiter>>,
}

impl LimiterRegistry {
    /// Create a new registry builder.
    pub fn builder() -> LimiterRegistryBuilder {
        LimiterRegistryBuilder::new()
    }

    /// Build one limiter per profile in `config`.
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        Self::builder().profiles(config).build()
    }

    /// Get the limiter for a profile.
    ///
    /// An unknown name is a configuration error in the caller.
    pub fn get(&self, name: &str) -> Result<&Arc<Limiter>> {
        self.limiters
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()).into())
    }

    /// Registered profile names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.limiters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of limiters.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Destroy every limiter. Idempotent.
    pub fn destroy_all(&self) {
        for limiter in self.limiters.values() {
            limiter.destroy();
        }
        info!(limiters = self.limiters.len(), "limiter registry destroyed");
    }
}

/// Builder for LimiterRegistry.
#[derive(Default)]
pub struct LimiterRegistryBuilder {
    configs: Vec<LimiterConfig>,
    clock: Option<Arc<dyn Clock>>,
    reclaim: Option<ReclaimInterval>,
}

impl LimiterRegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one limiter.
    pub fn limiter(mut self, config: LimiterConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Add every profile of a table.
    pub fn profiles(mut self, config: &RegistryConfig) -> Self {
        self.configs
            .extend(config.profiles.iter().map(|p| p.to_limiter_config()));
        self
    }

    /// Use one clock for every limiter.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override every limiter's reclamation schedule.
    pub fn reclaim(mut self, reclaim: ReclaimInterval) -> Self {
        self.reclaim = Some(reclaim);
        self
    }

    /// Construct all limiters.
    ///
    /// Fails on the first invalid profile or duplicate name; limiters built
    /// so far are destroyed.
    pub fn build(self) -> Result<LimiterRegistry> {
        let mut limiters = HashMap::with_capacity(self.configs.len());

        for mut config in self.configs {
            if limiters.contains_key(config.name()) {
                return Err(ConfigError::DuplicateProfile(config.name().to_string()).into());
            }
            if let Some(clock) = &self.clock {
                config = config.with_clock(clock.clone());
            }
            if let Some(reclaim) = self.reclaim {
                config = config.with_reclaim(reclaim);
            }

            let limiter = Limiter::new(config)?;
            limiters.insert(limiter.name().to_string(), Arc::new(limiter));
        }

        info!(limiters = limiters.len(), "limiter registry built");
        Ok(LimiterRegistry { limiters })
    }
}
