//! Task spawning and execution.
//!
//! Thin wrappers over `tokio::task`. Transfer attempts and the scheduler's
//! admission loop are spawned through here so that they always land on the
//! runtime that owns the download queue.

pub use futures::future::join_all;
pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the current runtime.
///
/// The task may run on a different worker thread, so both the future and its
/// output must be `Send + 'static`.
///
/// # Examples
///
/// ```rust
/// use core_async::task::spawn;
///
/// # core_async::runtime::block_on(async {
/// let handle = spawn(async { 42 });
/// assert_eq!(handle.await.unwrap(), 42);
/// # });
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Returns `true` when called from inside a runtime context.
///
/// Drop guards use this to decide whether fire-and-forget work can still be
/// spawned (it cannot during runtime shutdown).
pub fn in_runtime() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
