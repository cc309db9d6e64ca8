//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Backend read:
//!     → reqwest timeout (per request deadline)
//!     → On failure: retries.rs (retryable?) → backoff.rs (how long to wait)
//!
//! Confirmation:
//!     → timeouts.rs (race a future against a deadline, exactly one outcome)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Retries only for idempotent requests (GET, HEAD)
//! - Jittered backoff prevents thundering herd

pub mod backoff;
pub mod retries;
pub mod timeouts;
