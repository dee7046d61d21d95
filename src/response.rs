//! Rendering admission decisions for the web layer.
//!
//! [`Admission::render`] is pure: it never touches a store and cannot change
//! the decision it is given.
//!
//! # Example
//!
//! ```ignore
//! use admission_ratelimit::response::Admission;
//!
//! match Admission::render(&limiter.check(&identity)?) {
//!     Admission::Proceed { headers } => { /* run handler, attach headers */ }
//!     Admission::Reject { headers, status, body } => { /* reply 429 */ }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::decision::CheckResult;
use crate::headers::RateLimitHeaders;

/// HTTP status for a denied request.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Message carried by the rejection body.
pub const REJECTION_MESSAGE: &str = "rate limit exceeded";

/// JSON body sent with a 429.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionBody {
    /// Always `false`.
    pub success: bool,
    /// Human readable reason.
    pub message: String,
}

impl Default for RejectionBody {
    fn default() -> Self {
        Self {
            success: false,
            message: REJECTION_MESSAGE.to_string(),
        }
    }
}

impl RejectionBody {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "success": self.success,
            "message": self.message,
        })
        .to_string()
    }
}

/// What the web layer should do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Run the handler and attach `headers` to its response.
    Proceed {
        /// Rate limit headers.
        headers: Vec<(&'static str, String)>,
    },
    /// Stop processing and reply with `status` and `body`.
    Reject {
        /// Rate limit headers, `Retry-After` included.
        headers: Vec<(&'static str, String)>,
        /// Always [`STATUS_TOO_MANY_REQUESTS`].
        status: u16,
        /// JSON error body.
        body: RejectionBody,
    },
}

impl Admission {
    /// Render a check result.
    pub fn render(result: &CheckResult) -> Self {
        let headers = RateLimitHeaders::from(result).to_vec();
        if result.allowed {
            Self::Proceed { headers }
        } else {
            Self::Reject {
                headers,
                status: STATUS_TOO_MANY_REQUESTS,
                body: RejectionBody::default(),
            }
        }
    }

    /// Headers to attach in either case.
    pub fn headers(&self) -> &[(&'static str, String)] {
        match self {
            Self::Proceed { headers } | Self::Reject { headers, .. } => headers,
        }
    }

    /// Check if the caller must short-circuit.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Reject { .. })
    }
}
