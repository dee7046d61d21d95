//! Axum middleware for admission control.
//!
//! Provides a Tower layer that runs one limiter in front of a router.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::post};
//! use admission_ratelimit::{LimiterRegistry, RegistryConfig, middleware::RateLimitLayer};
//! use admission_ratelimit::config::profiles;
//!
//! let registry = LimiterRegistry::from_config(&RegistryConfig::from_env()?)?;
//!
//! let app = Router::new()
//!     .route("/api/auth/login", post(login))
//!     .layer(RateLimitLayer::new(registry.get(profiles::AUTH)?.clone()));
//! ```

mod layer;

pub use layer::{AuthenticatedUser, RateLimitLayer, RateLimitService};
