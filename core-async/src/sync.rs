//! Synchronization primitives.
//!
//! Async-aware primitives from `tokio::sync` plus the cancellation token used
//! to tear down scheduled playback work. Short, non-async critical sections in
//! the engine use `parking_lot` directly; anything held across an `.await`
//! must come from here.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{CancellationToken, Mutex};
//!
//! async fn example() {
//!     let token = CancellationToken::new();
//!     let child = token.child_token();
//!     token.cancel();
//!     assert!(child.is_cancelled());
//!
//!     let mutex = Mutex::new(0);
//!     *mutex.lock().await += 1;
//! }
//! ```

pub use tokio::sync::{mpsc, oneshot, Mutex, MutexGuard, Notify};

pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
