//! Identity views and the built-in extractors.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use crate::key::Key;

// ============================================================================
// Request Info Traits
// ============================================================================

/// Header name set by the CDN with the connecting client's address.
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";

/// Header name set by the reverse proxy with the client's address.
pub const X_REAL_IP: &str = "x-real-ip";

/// Comma separated proxy chain; the first hop is the client.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Trait for requests that have headers.
pub trait HasHeaders {
    /// Get a header value by lowercase name.
    fn header(&self, name: &str) -> Option<&str>;
}

/// Trait for requests that may carry an authenticated user.
pub trait HasUserId {
    /// Get the authenticated user id.
    fn user_id(&self) -> Option<&str> {
        None
    }
}

/// Everything a limiter may read from a request.
pub trait RequestIdentity: HasHeaders + HasUserId {}

impl<T: HasHeaders + HasUserId + ?Sized> RequestIdentity for T {}

/// Owned request identity, for callers without a framework request type.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    headers: HashMap<String, String>,
    user_id: Option<String>,
}

impl Identity {
    /// Create an identity with no signals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header. Names are case-insensitive.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Set the authenticated user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

impl HasHeaders for Identity {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }
}

impl HasUserId for Identity {
    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

// ============================================================================
// IP-based Extractors
// ============================================================================

/// Extract key from trusted client IP headers.
///
/// Tiers are tried in order: `cf-connecting-ip`, `x-real-ip`, then the first
/// hop of `x-forwarded-for`. Values may carry a port (`1.2.3.4:5678`,
/// `[2001:db8::1]:443`) or brackets (`[2001:db8::1]`); the port is dropped.
/// Anything else that is not an IP address skips its tier. Keys look like
/// `ip:203.0.113.50`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIpKey;

impl ClientIpKey {
    /// Create a new client IP extractor.
    pub fn new() -> Self {
        Self
    }

    /// Resolve the client address without formatting a key.
    pub fn client_ip<R: HasHeaders + ?Sized>(request: &R) -> Option<IpAddr> {
        let single = |name| request.header(name).and_then(parse_ip);
        single(CF_CONNECTING_IP)
            .or_else(|| single(X_REAL_IP))
            .or_else(|| {
                request
                    .header(X_FORWARDED_FOR)
                    .and_then(|chain| chain.split(',').next())
                    .and_then(parse_ip)
            })
    }
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    let value = value.trim();
    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
        .or_else(|| value.strip_prefix('[')?.strip_suffix(']')?.parse().ok())
}

impl<R: HasHeaders + ?Sized> Key<R> for ClientIpKey {
    fn extract(&self, request: &R) -> Option<String> {
        Self::client_ip(request).map(|ip| format!("ip:{}", ip))
    }

    fn name(&self) -> &'static str {
        "client_ip"
    }
}

// ============================================================================
// User-based Extractors
// ============================================================================

/// Extract key from the authenticated user id. Keys look like `user:42`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserIdKey;

impl UserIdKey {
    /// Create a new user id extractor.
    pub fn new() -> Self {
        Self
    }
}

impl<R: HasUserId + ?Sized> Key<R> for UserIdKey {
    fn extract(&self, request: &R) -> Option<String> {
        request
            .user_id()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| format!("user:{}", id))
    }

    fn name(&self) -> &'static str {
        "user_id"
    }
}
