//! Device media index and artwork collaborators.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// The device-wide media index (e.g. a media scanner).
///
/// Pinned downloads are registered so other applications can see them; files
/// that stop being pinned are forgotten again. Both calls are notifications
/// and must not block for long.
pub trait MediaIndex: Send + Sync {
    fn register(&self, path: &Path) -> Result<()>;

    fn forget(&self, path: &Path) -> Result<()>;
}

/// Index for hosts without a media scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMediaIndex;

impl MediaIndex for NoopMediaIndex {
    fn register(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn forget(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Fetches and caches cover art that belongs to a downloaded track.
#[async_trait]
pub trait ArtworkFetcher: Send + Sync {
    async fn cache_cover_art(&self, cover_art_id: &str) -> Result<()>;
}

/// Artwork fetcher that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopArtworkFetcher;

#[async_trait]
impl ArtworkFetcher for NoopArtworkFetcher {
    async fn cache_cover_art(&self, _cover_art_id: &str) -> Result<()> {
        Ok(())
    }
}
