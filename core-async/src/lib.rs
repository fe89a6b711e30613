//! Runtime abstraction layer for the retro-sfx engine.
//!
//! Every crate in the workspace goes through this crate for timers, task
//! spawning and synchronization instead of naming Tokio directly. That keeps
//! the engine's suspension points (fetches, decodes, fades, scheduled stops)
//! in one place and lets tests swap in a paused clock.
//!
//! # Modules
//!
//! - `task`: task spawning (`spawn`, `spawn_blocking`)
//! - `time`: sleeps, timeouts and cancellable delays
//! - `sync`: async locks, channels and [`sync::CancellationToken`]
//! - `runtime`: `block_on` helpers used by the attribute macros
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//! use core_async::time::{sleep_unless_cancelled, Duration};
//!
//! async fn scheduled_stop(token: CancellationToken) {
//!     if sleep_unless_cancelled(Duration::from_millis(300), &token).await {
//!         // timer elapsed without cancellation
//!     }
//! }
//! ```

// Entry-point/test macros so downstream crates never need a direct Tokio
// dependency.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
