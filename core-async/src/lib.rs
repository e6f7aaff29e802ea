//! Async runtime facade for the offline download core.
//!
//! Every `core-*` and `bridge-*` crate goes through this crate instead of
//! depending on Tokio directly. Keeping the executor behind one facade means the
//! download engine, the scheduler and the desktop adapters all agree on the
//! same task, timer, lock and cancellation types.
//!
//! # Modules
//!
//! - `task`: task spawning and join handles
//! - `time`: sleeps, timeouts and wall-clock helpers
//! - `sync`: locks, channels and the cooperative [`sync::CancellationToken`]
//! - `fs` / `io`: async filesystem and stream traits
//! - `pool`: a bounded worker pool for fire-and-forget background work
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//! use core_async::task;
//!
//! # core_async::runtime::block_on(async {
//! let token = CancellationToken::new();
//! let child = token.clone();
//!
//! let handle = task::spawn(async move {
//!     while !child.is_cancelled() {
//!         task::yield_now().await;
//!     }
//!     "stopped"
//! });
//!
//! token.cancel();
//! assert_eq!(handle.await.unwrap(), "stopped");
//! # });
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod fs;
pub mod io;
pub mod pool;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use pool::WorkerPool;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
