//! # Host Bridge Traits
//!
//! Contracts between the offline download core and the collaborators it
//! drives but does not implement.
//!
//! ## Overview
//!
//! The core owns the download state machine, the scheduler and the transfer
//! engine. Everything it needs from the outside world is expressed here as a
//! trait so each host (desktop, mobile, tests) can plug in its own adapter:
//!
//! ### Transfer
//! - [`MediaFetcher`](fetch::MediaFetcher) - remote byte source with offset resumption
//! - [`ArtworkFetcher`](media::ArtworkFetcher) - best-effort cover-art caching
//!
//! ### Storage lifecycle
//! - [`CacheReclaimer`](cache::CacheReclaimer) - evicts stale cached artifacts
//! - [`MediaIndex`](media::MediaIndex) - tells the device media index about pinned files
//!
//! ### Device resources
//! - [`LeaseProvider`](lease::LeaseProvider) - scoped wake/network leases
//!
//! ### Logging
//! - [`LoggerSink`](log::LoggerSink) - mirror structured logs into a host logger
//!
//! ## Fallbacks
//!
//! Every optional collaborator ships a no-op implementation
//! ([`NoopCacheReclaimer`](cache::NoopCacheReclaimer),
//! [`NoopLeaseProvider`](lease::NoopLeaseProvider),
//! [`NoopMediaIndex`](media::NoopMediaIndex),
//! [`NoopArtworkFetcher`](media::NoopArtworkFetcher)) so the core can run
//! without them. [`MediaFetcher`](fetch::MediaFetcher) has no fallback; a
//! missing fetcher is reported as a missing capability at configuration time.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`; implementations are shared behind `Arc`
//! between concurrently running transfer attempts.

pub mod cache;
pub mod error;
pub mod fetch;
pub mod lease;
pub mod log;
pub mod media;

pub use error::BridgeError;

pub use cache::{CacheReclaimer, NoopCacheReclaimer, ReclaimReport};
pub use fetch::{FetchRequest, FetchResponse, MediaFetcher};
pub use lease::{LeaseKind, LeaseProvider, NoopLeaseProvider, ResourceLease};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{ArtworkFetcher, MediaIndex, NoopArtworkFetcher, NoopMediaIndex};
