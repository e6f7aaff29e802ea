//! # Download Core
//!
//! Makes remote tracks available on disk for offline playback.
//!
//! ## Overview
//!
//! - [`DownloadQueue`] keeps the working set, orders it by priority and caps
//!   how many transfers run at once.
//! - [`DownloadItem`] is the per-track state machine: artifact layout, retry
//!   budget, playback gate and observable progress.
//! - The transfer engine runs one resumable attempt: it resumes from the
//!   partial artifact, honours cooperative cancellation and promotes the
//!   finished file, deferring the rename while the track is being played.
//! - [`LeaseScope`] holds keep-network / keep-awake leases for exactly one
//!   attempt.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_download::{DownloadConfig, DownloadQueue, Track};
//! use core_runtime::CoreConfig;
//! use std::sync::Arc;
//!
//! let core = CoreConfig::builder()
//!     .download_root("/var/cache/offline")
//!     .media_fetcher(Arc::new(fetcher))
//!     .build()?;
//! let queue = DownloadQueue::new(&core, DownloadConfig::default())?;
//!
//! let item = queue.enqueue(Track::new("tr-1", "mp3").with_size(4_000_000), false, 10).await;
//! let mut progress = item.subscribe_progress();
//! ```
//!
//! ## Artifacts
//!
//! See [`paths`] for the on-disk layout. A *save* copy is pinned and never
//! evicted; a *complete* copy is cache and may be reclaimed; a *partial* copy
//! is where the next attempt resumes.

pub mod config;
mod context;
mod engine;
pub mod error;
pub mod item;
pub mod lease;
pub mod paths;
pub mod queue;
pub mod track;

pub use config::{DownloadConfig, Quality, DEFAULT_PRIORITY, MAX_RETRIES};
pub use context::TransferContext;
pub use error::{DownloadError, Result};
pub use item::{DownloadItem, DownloadState, ItemStatus, PendingRename};
pub use lease::LeaseScope;
pub use paths::ArtifactPaths;
pub use queue::{DownloadQueue, QueueStats};
pub use track::Track;
