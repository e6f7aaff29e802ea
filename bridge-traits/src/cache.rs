//! Cache lifecycle collaborator.
//!
//! After every transfer attempt the core asks the reclaimer to free space.
//! The call is fire-and-forget: the core only logs the report. Each request
//! carries the artifacts of items that are playing or waiting for a rename;
//! those must survive the pass.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// What a reclaim pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimReport {
    pub files_removed: usize,
    pub bytes_freed: u64,
    /// Bytes still used by evictable artifacts after the pass.
    pub bytes_remaining: u64,
}

/// Evicts stale cached artifacts under storage pressure.
///
/// Implementations must never evict pinned (save) artifacts, partial files
/// that may still be resumed, or any path in `protected`.
#[async_trait]
pub trait CacheReclaimer: Send + Sync {
    async fn reclaim(&self, protected: &[PathBuf]) -> Result<ReclaimReport>;
}

/// Reclaimer that never evicts anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCacheReclaimer;

#[async_trait]
impl CacheReclaimer for NoopCacheReclaimer {
    async fn reclaim(&self, _protected: &[PathBuf]) -> Result<ReclaimReport> {
        Ok(ReclaimReport::default())
    }
}
