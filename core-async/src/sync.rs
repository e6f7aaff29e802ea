//! Synchronization primitives.
//!
//! Async-aware locks and channels from `tokio::sync`, plus the cooperative
//! [`CancellationToken`] from `tokio-util`.
//!
//! Cancellation is advisory: calling [`CancellationToken::cancel`] only flips
//! a shared flag. Work that holds a clone polls `is_cancelled()` at its own
//! checkpoints and winds down from there; nothing is interrupted mid-call.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{CancellationToken, Mutex};
//!
//! # core_async::runtime::block_on(async {
//! let mutex = Mutex::new(0);
//! *mutex.lock().await += 1;
//!
//! let token = CancellationToken::new();
//! let observer = token.clone();
//! token.cancel();
//! assert!(observer.is_cancelled());
//! # });
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Barrier, Mutex, MutexGuard, Notify, OwnedSemaphorePermit,
    RwLock, RwLockReadGuard, RwLockWriteGuard, Semaphore, SemaphorePermit,
};
pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
