//! Deadline races.

use std::future::Future;
use std::time::Duration;

/// Outcome of racing a future against a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Race<T> {
    Finished(T),
    TimedOut,
}

/// Run `fut` until it completes or `limit` elapses, whichever is first.
///
/// The losing side is dropped, so a late completion can never be observed
/// after a timeout has been reported.
pub async fn race<F: Future>(limit: Duration, fut: F) -> Race<F::Output> {
    match tokio::time::timeout(limit, fut).await {
        Ok(value) => Race::Finished(value),
        Err(_) => Race::TimedOut,
    }
}
