//! Key derivation for admission control.
//!
//! A key names the client a request is counted against. Extractors implement
//! [`Key`] and may fail; [`KeyStrategy`] composes them into a total function
//! that always yields a key, falling back to [`UNKNOWN_KEY`].
//!
//! # Overview
//!
//! - `ClientIpKey`: trusted proxy headers, in precedence order
//!   `cf-connecting-ip`, `x-real-ip`, first hop of `x-forwarded-for`;
//!   a trailing port is ignored
//! - `UserIdKey`: the authenticated user id, if any
//! - `KeyStrategy::UserOrClientIp`: user id first, IP chain otherwise
//!
//! # Example
//!
//! ```ignore
//! use admission_ratelimit::key::{Identity, KeyStrategy};
//!
//! let identity = Identity::new().with_header("x-real-ip", "8.8.8.8");
//! assert_eq!(KeyStrategy::ClientIp.derive(&identity), "ip:8.8.8.8");
//! ```

mod composite;
mod extractors;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use composite::{Fallback, Total};
pub use extractors::*;

/// Key used when no identity signal is present.
///
/// All such clients share a single bucket.
pub const UNKNOWN_KEY: &str = "ip:unknown";

/// Trait for extracting rate limiting keys from requests.
///
/// Return `None` if the key cannot be extracted (e.g., missing or malformed
/// header) so a composite can move on to the next source.
pub trait Key<R: ?Sized>: Send + Sync + 'static {
    /// Extract a rate limiting key from the request.
    fn extract(&self, request: &R) -> Option<String>;

    /// Get the key name for logging.
    fn name(&self) -> &'static str;
}

/// A key extractor backed by a closure.
#[derive(Clone)]
pub struct FnKey<F> {
    extractor: F,
    name: &'static str,
}

impl<F> std::fmt::Debug for FnKey<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnKey").field("name", &self.name).finish()
    }
}

impl<F> FnKey<F> {
    /// Create a new function-based key extractor.
    pub fn new(name: &'static str, extractor: F) -> Self {
        Self { extractor, name }
    }
}

impl<R, F> Key<R> for FnKey<F>
where
    R: ?Sized,
    F: Fn(&R) -> Option<String> + Send + Sync + 'static,
{
    fn extract(&self, request: &R) -> Option<String> {
        (self.extractor)(request)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Boxed custom extractor over any request identity.
pub type CustomExtractor = Arc<dyn Fn(&dyn RequestIdentity) -> Option<String> + Send + Sync>;

/// Per-profile key derivation policy.
///
/// Unlike a bare [`Key`], a strategy is total: `derive` never fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategy {
    /// Client IP from trusted proxy headers.
    #[default]
    ClientIp,
    /// Authenticated user id, else client IP.
    UserOrClientIp,
    /// Caller supplied extractor, else [`UNKNOWN_KEY`].
    #[serde(skip)]
    Custom(FnKey<CustomExtractor>),
}

impl KeyStrategy {
    /// Build a strategy from a closure.
    pub fn custom<F>(name: &'static str, extractor: F) -> Self
    where
        F: Fn(&dyn RequestIdentity) -> Option<String> + Send + Sync + 'static,
    {
        Self::Custom(FnKey::new(name, Arc::new(extractor)))
    }

    /// Derive the key for a request.
    pub fn derive<R: RequestIdentity>(&self, request: &R) -> String {
        match self {
            Self::ClientIp => Total::new(ClientIpKey, UNKNOWN_KEY).derive(request),
            Self::UserOrClientIp => {
                Total::new(Fallback::new(UserIdKey, ClientIpKey), UNKNOWN_KEY).derive(request)
            }
            Self::Custom(key) => (key.extractor)(request).unwrap_or_else(|| UNKNOWN_KEY.to_string()),
        }
    }

    /// Get the strategy name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ClientIp => "client_ip",
            Self::UserOrClientIp => "user_or_client_ip",
            Self::Custom(key) => key.name,
        }
    }
}
