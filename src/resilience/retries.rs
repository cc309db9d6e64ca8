//! Retry decisions.
//!
//! # Design Decisions
//! - Never retry POST/PUT/DELETE/PATCH (non-idempotent); a repeated
//!   `donate` or `funds` call could double-record a payment
//! - Connection errors and 502/503/504 are retryable for GET/HEAD
//! - Everything else is returned to the caller as-is

use reqwest::Method;

/// Whether a request with `method` that ended with `status` (or a
/// connection error) may be attempted again.
pub fn is_retryable(method: &Method, status: Option<u16>, connection_error: bool) -> bool {
    if !(method == Method::GET || method == Method::HEAD) {
        return false;
    }
    if connection_error {
        return true;
    }
    matches!(status, Some(502..=504))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_idempotent_methods() {
        assert!(is_retryable(&Method::GET, None, true));
        assert!(is_retryable(&Method::GET, Some(503), false));
        assert!(!is_retryable(&Method::POST, None, true));
        assert!(!is_retryable(&Method::PUT, Some(503), false));
    }

    #[test]
    fn test_client_errors_not_retried() {
        assert!(!is_retryable(&Method::GET, Some(400), false));
        assert!(!is_retryable(&Method::GET, Some(500), false));
        assert!(!is_retryable(&Method::GET, Some(200), false));
    }
}
