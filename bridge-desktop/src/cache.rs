//! Size-bounded eviction of unpinned downloads.

use async_trait::async_trait;
use bridge_traits::{
    cache::{CacheReclaimer, ReclaimReport},
    error::{BridgeError, Result},
};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Default download root: `<platform cache dir>/offline-core/downloads`.
pub fn default_download_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("offline-core")
        .join("downloads")
}

/// Whether `file_name` is an unpinned finished copy (`<stem>.complete.<ext>`).
///
/// Pinned copies and partial files are never evictable.
pub fn is_evictable_artifact(file_name: &str) -> bool {
    file_name.contains(".complete.") || file_name.ends_with(".complete")
}

/// [`CacheReclaimer`] that keeps unpinned copies under a byte budget.
///
/// Walks the download root, then deletes evictable artifacts oldest
/// modification time first until their total size fits the budget. Protected
/// paths neither count toward the budget nor get evicted. Items
/// refresh their modification time when played, so this approximates LRU.
#[derive(Debug, Clone)]
pub struct DirectoryCacheReclaimer {
    root: PathBuf,
    limit_bytes: u64,
}

struct Candidate {
    path: PathBuf,
    len: u64,
    modified: SystemTime,
}

impl DirectoryCacheReclaimer {
    pub fn new(root: impl Into<PathBuf>, limit_bytes: u64) -> Self {
        Self {
            root: root.into(),
            limit_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    fn collect(
        dir: &Path,
        protected: &HashSet<PathBuf>,
        out: &mut Vec<Candidate>,
    ) -> io::Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                Self::collect(&entry.path(), protected, out)?;
                continue;
            }

            let name = entry.file_name();
            if !file_type.is_file() || !is_evictable_artifact(&name.to_string_lossy()) {
                continue;
            }

            let path = entry.path();
            if protected.contains(&path) {
                debug!(path = ?path, "Skipping artifact in use");
                continue;
            }

            let metadata = entry.metadata()?;
            out.push(Candidate {
                path,
                len: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(())
    }

    fn reclaim_blocking(
        root: &Path,
        limit_bytes: u64,
        protected: &HashSet<PathBuf>,
    ) -> io::Result<ReclaimReport> {
        let mut candidates = Vec::new();
        Self::collect(root, protected, &mut candidates)?;
        candidates.sort_by_key(|c| c.modified);

        let mut total: u64 = candidates.iter().map(|c| c.len).sum();
        let mut report = ReclaimReport::default();

        for candidate in candidates {
            if total <= limit_bytes {
                break;
            }
            match fs::remove_file(&candidate.path) {
                Ok(()) => {
                    debug!(path = ?candidate.path, bytes = candidate.len, "Evicted cached copy");
                    total -= candidate.len;
                    report.files_removed += 1;
                    report.bytes_freed += candidate.len;
                }
                // Removed concurrently (e.g. the item was deleted).
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    total -= candidate.len;
                }
                Err(e) => warn!(path = ?candidate.path, error = %e, "Failed to evict cached copy"),
            }
        }

        report.bytes_remaining = total;
        Ok(report)
    }
}

#[async_trait]
impl CacheReclaimer for DirectoryCacheReclaimer {
    async fn reclaim(&self, protected: &[PathBuf]) -> Result<ReclaimReport> {
        let root = self.root.clone();
        let limit = self.limit_bytes;
        let protected: HashSet<PathBuf> = protected.iter().cloned().collect();

        let report = core_async::task::spawn_blocking(move || {
            Self::reclaim_blocking(&root, limit, &protected)
        })
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Reclaim task failed: {e}")))??;

        if report.files_removed > 0 {
            info!(
                files_removed = report.files_removed,
                bytes_freed = report.bytes_freed,
                "Reclaimed cache space"
            );
        }
        Ok(report)
    }
}
