//! Time-related abstractions.
//!
//! `Instant` is Tokio's instant so that elapsed-time checks (retry backoff
//! windows, fade progress) follow a paused test clock exactly like sleeps do.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(10)).await;
//!     assert!(start.elapsed() >= Duration::from_millis(10));
//! }
//! ```

pub use tokio::time::error::Elapsed;
pub use tokio::time::{sleep, sleep_until, timeout, Instant, Sleep, Timeout};

pub use std::time::Duration;

use crate::sync::CancellationToken;

/// Sleeps for `duration` unless `token` is cancelled first.
///
/// Returns `true` when the full duration elapsed and `false` when the sleep
/// was cut short by cancellation. A token that is already cancelled returns
/// `false` immediately.
pub async fn sleep_unless_cancelled(duration: Duration, token: &CancellationToken) -> bool {
    if token.is_cancelled() {
        return false;
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = sleep(duration) => true,
    }
}
