//! Response headers describing a client's window.

use crate::decision::CheckResult;

/// Header names, as sent on the wire.
pub mod names {
    /// Requests admitted per window.
    pub const LIMIT: &str = "X-RateLimit-Limit";
    /// Requests left in the current window.
    pub const REMAINING: &str = "X-RateLimit-Remaining";
    /// Window end, Unix epoch seconds.
    pub const RESET: &str = "X-RateLimit-Reset";
    /// Whole seconds to wait. Only sent on denial.
    pub const RETRY_AFTER: &str = "Retry-After";
}

/// The header set for one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: u64,
    pub remaining: u64,
    pub reset_epoch_secs: u64,
    pub retry_after_secs: Option<u64>,
}

impl RateLimitHeaders {
    /// Name/value pairs in wire order. `Retry-After` comes last when present.
    pub fn to_vec(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (names::LIMIT, self.limit.to_string()),
            (names::REMAINING, self.remaining.to_string()),
            (names::RESET, self.reset_epoch_secs.to_string()),
        ];
        pairs.extend(
            self.retry_after_secs
                .map(|secs| (names::RETRY_AFTER, secs.to_string())),
        );
        pairs
    }
}

impl From<&CheckResult> for RateLimitHeaders {
    fn from(result: &CheckResult) -> Self {
        Self {
            limit: result.limit,
            remaining: result.remaining,
            reset_epoch_secs: result.reset_epoch_secs(),
            retry_after_secs: result.retry_after_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_has_no_retry_after() {
        let result = CheckResult::allowed(5, 4, 1_700_000_000_500);
        let headers = RateLimitHeaders::from(&result).to_vec();

        assert_eq!(
            headers,
            vec![
                ("X-RateLimit-Limit", "5".to_string()),
                ("X-RateLimit-Remaining", "4".to_string()),
                ("X-RateLimit-Reset", "1700000001".to_string()),
            ]
        );
    }

    #[test]
    fn test_denied_carries_retry_after() {
        let result = CheckResult::denied(5, 60_000, 30_000);
        let headers = RateLimitHeaders::from(&result);

        assert_eq!(headers.retry_after_secs, Some(30));
        assert_eq!(headers.reset_epoch_secs, 60);
        assert_eq!(
            headers.to_vec().last(),
            Some(&(names::RETRY_AFTER, "30".to_string()))
        );
    }

    #[test]
    fn test_reset_rounds_up_to_whole_second() {
        let headers = RateLimitHeaders::from(&CheckResult::allowed(1, 0, 1_001));
        assert_eq!(headers.reset_epoch_secs, 2);

        let headers = RateLimitHeaders::from(&CheckResult::allowed(1, 0, 2_000));
        assert_eq!(headers.reset_epoch_secs, 2);
    }
}
