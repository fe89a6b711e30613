//! Task spawning and execution abstractions.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//!
//! async fn example() {
//!     let handle = task::spawn(async { 42 });
//!     assert_eq!(handle.await.unwrap(), 42);
//!
//!     // CPU-bound work such as decoding goes to the blocking pool.
//!     let decoded = task::spawn_blocking(|| vec![0.0f32; 16]).await.unwrap();
//!     assert_eq!(decoded.len(), 16);
//! }
//! ```

pub use tokio::task::{spawn_blocking, yield_now, AbortHandle, JoinError, JoinHandle, JoinSet};

/// Spawns a new asynchronous task on the current runtime.
///
/// The returned `JoinHandle` can be awaited for the task's output or dropped
/// to detach the task.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
