//! Time-related operations.
//!
//! Re-exports Tokio timers plus an optional-deadline helper.

pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
pub use tokio::time::error::Elapsed;
pub use tokio::time::{interval, sleep, sleep_until, timeout, Interval, Sleep, Timeout};

/// Runs `future` with an optional deadline.
///
/// `None` means "wait forever", which keeps call sites free of duplicated
/// `match` arms when a timeout is configurable.
pub async fn maybe_timeout<F>(limit: Option<Duration>, future: F) -> Result<F::Output, Elapsed>
where
    F: std::future::Future,
{
    match limit {
        Some(limit) => timeout(limit, future).await,
        None => Ok(future.await),
    }
}
