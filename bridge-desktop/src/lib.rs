//! # Desktop Bridge Implementations
//!
//! Default collaborator implementations for desktop platforms
//! (macOS, Windows, Linux):
//! - `MediaFetcher` over HTTP range requests using `reqwest`
//! - `LeaseProvider` with process-local, reference-counted leases
//! - `CacheReclaimer` that evicts the oldest unpinned copies under a byte budget
//! - `MediaIndex` that tracks pinned files in memory (desktops have no system
//!   media scanner to notify)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{default_download_root, DirectoryCacheReclaimer, HttpMediaFetcher};
//!
//! let fetcher = HttpMediaFetcher::new(|req| {
//!     format!("https://music.example/rest/stream?id={}&maxBitRate={}", req.track_id, req.max_bitrate)
//! })?;
//! let reclaimer = DirectoryCacheReclaimer::new(default_download_root(), 1 << 30);
//! ```

mod cache;
mod fetch;
mod lease;
mod media;

pub use cache::{default_download_root, is_evictable_artifact, DirectoryCacheReclaimer};
pub use fetch::{HttpMediaFetcher, StreamUrlBuilder};
pub use lease::ProcessLeaseProvider;
pub use media::DesktopMediaIndex;
