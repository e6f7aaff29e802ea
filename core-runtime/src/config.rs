//! # Core Configuration Module
//!
//! Wires the download core to its host collaborators.
//!
//! ## Overview
//!
//! [`CoreConfig`] is assembled with [`CoreConfigBuilder`] and validated
//! fail-fast: a missing required collaborator is reported at build time with
//! an actionable message instead of surfacing later as a failed download.
//!
//! ## Required
//!
//! - `download_root` - directory that holds partial, complete and save artifacts
//! - `MediaFetcher` - remote byte source
//!
//! ## Optional (with platform defaults)
//!
//! - `CacheReclaimer` - desktop default: `DirectoryCacheReclaimer` over the download root
//! - `LeaseProvider` - desktop default: `ProcessLeaseProvider`
//! - `MediaIndex` - desktop default: `DesktopMediaIndex`
//! - `ArtworkFetcher` - no default
//!
//! Without the `desktop-shims` feature the optional collaborators stay unset
//! and the core falls back to no-op implementations.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .download_root("/home/me/Music/offline")
//!     .media_fetcher(Arc::new(my_fetcher))
//!     .cache_limit_mb(2048)
//!     .build()?;
//! ```
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No fetcher: fails with a CapabilityMissing error.
//! CoreConfig::builder()
//!     .download_root("/music")
//!     .build()
//!     .expect("Should fail - missing MediaFetcher");
//! ```

use crate::error::{Error, Result};
use crate::events::EventBus;
use bridge_traits::{ArtworkFetcher, CacheReclaimer, LeaseProvider, MediaFetcher, MediaIndex};
use std::path::PathBuf;
use std::sync::Arc;

/// Default cache budget for evictable (unpinned) copies.
pub const DEFAULT_CACHE_LIMIT_MB: u64 = 1024;

const MAX_CACHE_LIMIT_MB: u64 = 100_000;

/// Collaborators and settings for the download core.
#[derive(Clone)]
pub struct CoreConfig {
    /// Root directory for downloaded artifacts
    pub download_root: PathBuf,

    /// Budget for evictable copies in megabytes
    pub cache_limit_mb: u64,

    /// Remote byte source (required)
    pub media_fetcher: Arc<dyn MediaFetcher>,

    pub cache_reclaimer: Option<Arc<dyn CacheReclaimer>>,

    pub lease_provider: Option<Arc<dyn LeaseProvider>>,

    pub media_index: Option<Arc<dyn MediaIndex>>,

    pub artwork_fetcher: Option<Arc<dyn ArtworkFetcher>>,

    /// Bus that receives download lifecycle events
    pub event_bus: EventBus,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("download_root", &self.download_root)
            .field("cache_limit_mb", &self.cache_limit_mb)
            .field("media_fetcher", &"MediaFetcher { ... }")
            .field(
                "cache_reclaimer",
                &self
                    .cache_reclaimer
                    .as_ref()
                    .map(|_| "CacheReclaimer { ... }"),
            )
            .field(
                "lease_provider",
                &self.lease_provider.as_ref().map(|_| "LeaseProvider { ... }"),
            )
            .field(
                "media_index",
                &self.media_index.as_ref().map(|_| "MediaIndex { ... }"),
            )
            .field(
                "artwork_fetcher",
                &self
                    .artwork_fetcher
                    .as_ref()
                    .map(|_| "ArtworkFetcher { ... }"),
            )
            .field("event_bus", &self.event_bus)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Cache budget in bytes.
    pub fn cache_limit_bytes(&self) -> u64 {
        self.cache_limit_mb * 1024 * 1024
    }

    /// Validates the configuration.
    ///
    /// Checks that the download root is set and the cache budget is within
    /// `1..=100_000` MB.
    pub fn validate(&self) -> Result<()> {
        if self.download_root.as_os_str().is_empty() {
            return Err(Error::Config("Download root cannot be empty".to_string()));
        }

        if self.cache_limit_mb == 0 {
            return Err(Error::Config(
                "Cache limit must be greater than 0 MB".to_string(),
            ));
        }

        if self.cache_limit_mb > MAX_CACHE_LIMIT_MB {
            return Err(Error::Config(
                "Cache limit exceeds maximum of 100GB (100,000 MB)".to_string(),
            ));
        }

        Ok(())
    }
}

fn media_fetcher_missing_error() -> Error {
    Error::capability_missing(
        "MediaFetcher",
        "MediaFetcher implementation is required to download tracks. \
         Desktop: construct bridge_desktop::HttpMediaFetcher with your server's stream URL builder. \
         Mobile: inject the platform's authenticated streaming client.",
    )
}

#[cfg(feature = "desktop-shims")]
struct PlatformDefaults {
    cache_reclaimer: Option<Arc<dyn CacheReclaimer>>,
    lease_provider: Option<Arc<dyn LeaseProvider>>,
    media_index: Option<Arc<dyn MediaIndex>>,
}

#[cfg(feature = "desktop-shims")]
fn platform_defaults(download_root: &std::path::Path, cache_limit_mb: u64) -> PlatformDefaults {
    use bridge_desktop::{DesktopMediaIndex, DirectoryCacheReclaimer, ProcessLeaseProvider};

    PlatformDefaults {
        cache_reclaimer: Some(Arc::new(DirectoryCacheReclaimer::new(
            download_root,
            cache_limit_mb * 1024 * 1024,
        ))),
        lease_provider: Some(Arc::new(ProcessLeaseProvider::new())),
        media_index: Some(Arc::new(DesktopMediaIndex::new())),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    download_root: Option<PathBuf>,
    cache_limit_mb: Option<u64>,
    media_fetcher: Option<Arc<dyn MediaFetcher>>,
    cache_reclaimer: Option<Arc<dyn CacheReclaimer>>,
    lease_provider: Option<Arc<dyn LeaseProvider>>,
    media_index: Option<Arc<dyn MediaIndex>>,
    artwork_fetcher: Option<Arc<dyn ArtworkFetcher>>,
    event_bus: Option<EventBus>,
}

impl CoreConfigBuilder {
    /// Sets the directory that holds downloaded artifacts.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().download_root("/music/offline");
    /// ```
    pub fn download_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.download_root = Some(path.into());
        self
    }

    /// Sets the budget for evictable copies. Default: 1024 MB.
    pub fn cache_limit_mb(mut self, limit_mb: u64) -> Self {
        self.cache_limit_mb = Some(limit_mb);
        self
    }

    /// Sets the remote byte source (required).
    pub fn media_fetcher(mut self, fetcher: Arc<dyn MediaFetcher>) -> Self {
        self.media_fetcher = Some(fetcher);
        self
    }

    pub fn cache_reclaimer(mut self, reclaimer: Arc<dyn CacheReclaimer>) -> Self {
        self.cache_reclaimer = Some(reclaimer);
        self
    }

    pub fn lease_provider(mut self, provider: Arc<dyn LeaseProvider>) -> Self {
        self.lease_provider = Some(provider);
        self
    }

    pub fn media_index(mut self, index: Arc<dyn MediaIndex>) -> Self {
        self.media_index = Some(index);
        self
    }

    pub fn artwork_fetcher(mut self, fetcher: Arc<dyn ArtworkFetcher>) -> Self {
        self.artwork_fetcher = Some(fetcher);
        self
    }

    /// Shares an existing bus instead of creating a new one.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when the download root is missing or settings are out of range
    /// - [`Error::CapabilityMissing`] when no `MediaFetcher` was injected
    pub fn build(self) -> Result<CoreConfig> {
        let download_root = self.download_root.ok_or_else(|| {
            Error::Config("Download root is required. Use .download_root() to set it.".to_string())
        })?;

        let media_fetcher = self.media_fetcher.ok_or_else(media_fetcher_missing_error)?;
        let cache_limit_mb = self.cache_limit_mb.unwrap_or(DEFAULT_CACHE_LIMIT_MB);

        #[cfg(feature = "desktop-shims")]
        let (cache_reclaimer, lease_provider, media_index) = {
            let defaults = platform_defaults(&download_root, cache_limit_mb);
            (
                self.cache_reclaimer.or(defaults.cache_reclaimer),
                self.lease_provider.or(defaults.lease_provider),
                self.media_index.or(defaults.media_index),
            )
        };

        #[cfg(not(feature = "desktop-shims"))]
        let (cache_reclaimer, lease_provider, media_index) =
            (self.cache_reclaimer, self.lease_provider, self.media_index);

        let config = CoreConfig {
            download_root,
            cache_limit_mb,
            media_fetcher,
            cache_reclaimer,
            lease_provider,
            media_index,
            artwork_fetcher: self.artwork_fetcher,
            event_bus: self.event_bus.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{FetchRequest, FetchResponse, NoopLeaseProvider};

    struct StaticFetcher;

    #[async_trait]
    impl MediaFetcher for StaticFetcher {
        async fn fetch(&self, _request: FetchRequest) -> BridgeResult<FetchResponse> {
            let body: &'static [u8] = b"";
            Ok(FetchResponse::new(Box::new(body), true))
        }
    }

    #[test]
    fn test_builder_requires_download_root() {
        let result = CoreConfig::builder()
            .media_fetcher(Arc::new(StaticFetcher))
            .build();

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Download root is required"));
    }

    #[test]
    fn test_builder_requires_media_fetcher() {
        let err = CoreConfig::builder()
            .download_root("/music")
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            Error::CapabilityMissing { ref capability, .. } if capability == "MediaFetcher"
        ));
        assert!(err.to_string().contains("HttpMediaFetcher"));
    }

    #[test]
    fn test_builder_with_required_fields() {
        let config = CoreConfig::builder()
            .download_root("/music")
            .media_fetcher(Arc::new(StaticFetcher))
            .build()
            .unwrap();

        assert_eq!(config.download_root, PathBuf::from("/music"));
        assert_eq!(config.cache_limit_mb, DEFAULT_CACHE_LIMIT_MB);
        assert_eq!(config.cache_limit_bytes(), 1024 * 1024 * 1024);
        assert!(config.artwork_fetcher.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_cache_limit() {
        let result = CoreConfig::builder()
            .download_root("/music")
            .media_fetcher(Arc::new(StaticFetcher))
            .cache_limit_mb(0)
            .build();

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must be greater than 0"));
    }

    #[test]
    fn test_validate_rejects_excessive_cache_limit() {
        let result = CoreConfig::builder()
            .download_root("/music")
            .media_fetcher(Arc::new(StaticFetcher))
            .cache_limit_mb(200_000)
            .build();

        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validate_rejects_empty_root() {
        let result = CoreConfig::builder()
            .download_root("")
            .media_fetcher(Arc::new(StaticFetcher))
            .build();

        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_injected_collaborators_win() {
        let config = CoreConfig::builder()
            .download_root("/music")
            .media_fetcher(Arc::new(StaticFetcher))
            .lease_provider(Arc::new(NoopLeaseProvider))
            .build()
            .unwrap();

        assert!(config.lease_provider.is_some());
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_optional_collaborators_stay_unset() {
        let config = CoreConfig::builder()
            .download_root("/music")
            .media_fetcher(Arc::new(StaticFetcher))
            .build()
            .unwrap();

        assert!(config.cache_reclaimer.is_none());
        assert!(config.lease_provider.is_none());
        assert!(config.media_index.is_none());
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_defaults_injected() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::builder()
            .download_root(dir.path())
            .media_fetcher(Arc::new(StaticFetcher))
            .build()
            .unwrap();

        assert!(config.cache_reclaimer.is_some());
        assert!(config.lease_provider.is_some());
        assert!(config.media_index.is_some());
    }

    #[test]
    fn test_shared_event_bus() {
        let bus = EventBus::new(8);
        let _rx = bus.subscribe();
        let config = CoreConfig::builder()
            .download_root("/music")
            .media_fetcher(Arc::new(StaticFetcher))
            .event_bus(bus.clone())
            .build()
            .unwrap();

        assert_eq!(config.event_bus.subscriber_count(), 1);
    }
}
