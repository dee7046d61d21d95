//! In-process admission control for web route handlers.
//!
//! `admission_ratelimit` bounds request volume per client with a family of
//! independent fixed-window limiters:
//!
//! - **Fixed-window counting**: exact per-key admission bound, even under heavy concurrency
//! - **Key derivation**: trusted proxy headers, authenticated user id, custom closures
//! - **Background reclamation**: cancellable sweeps of expired windows
//! - **Named profiles**: one registry of limiters built at startup, torn down at shutdown
//! - **Response contract**: `X-RateLimit-*` headers and a 429 JSON body
//!
//! # Quick Start
//!
//! ```ignore
//! use admission_ratelimit::{LimiterRegistry, RegistryConfig, Admission};
//! use admission_ratelimit::config::profiles;
//! use admission_ratelimit::key::Identity;
//!
//! #[tokio::main]
//! async fn main() -> admission_ratelimit::Result<()> {
//!     let registry = LimiterRegistry::from_config(&RegistryConfig::from_env()?)?;
//!
//!     let identity = Identity::new().with_header("cf-connecting-ip", "9.9.9.9");
//!     let result = registry.get(profiles::AUTH)?.check(&identity)?;
//!
//!     match Admission::render(&result) {
//!         Admission::Proceed { headers } => println!("ok, {} remaining", result.remaining),
//!         Admission::Reject { status, .. } => println!("{status}: retry in {:?}", result.retry_after()),
//!     }
//!
//!     registry.destroy_all();
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `axum`: Tower layer applying one limiter to a router

pub mod clock;
pub mod config;
pub mod decision;
pub mod error;
pub mod headers;
pub mod key;
pub mod limiter;
pub mod quota;
pub mod reclaimer;
pub mod registry;
pub mod response;
pub mod storage;

#[cfg(feature = "axum")]
pub mod middleware;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ProfileConfig, RegistryConfig};
pub use decision::CheckResult;
pub use error::{ConfigError, RateLimitError, Result};
pub use headers::RateLimitHeaders;
pub use key::{Identity, KeyStrategy};
pub use limiter::{Limiter, LimiterConfig};
pub use quota::Quota;
pub use reclaimer::{ReclaimInterval, ReclaimerStats};
pub use registry::{LimiterRegistry, LimiterRegistryBuilder};
pub use response::{Admission, RejectionBody};
pub use storage::{MemoryWindowStore, WindowEntry, WindowStore};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{RegistryConfig, profiles};
    pub use crate::decision::CheckResult;
    pub use crate::error::{RateLimitError, Result};
    pub use crate::key::{Identity, KeyStrategy, RequestIdentity};
    pub use crate::limiter::{Limiter, LimiterConfig};
    pub use crate::reclaimer::ReclaimInterval;
    pub use crate::registry::LimiterRegistry;
    pub use crate::response::Admission;
}
