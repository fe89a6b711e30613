//! Runtime utilities that abstract over the underlying async executor.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

/// Runs the provided future on a current-thread runtime whose clock starts
/// paused. Timers auto-advance whenever every task is idle, so fades and
/// scheduled stops resolve instantly and deterministically.
#[cfg(any(test, feature = "test-util"))]
pub fn block_on_paused<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("core_async::runtime::block_on_paused: failed to build Tokio runtime")
        .block_on(future)
}

/// Returns `true` when called from inside a runtime context.
pub fn in_runtime() -> bool {
    Handle::try_current().is_ok()
}
