//! Collaborators shared by every item of one queue.

use crate::config::DownloadConfig;
use bridge_traits::{
    ArtworkFetcher, CacheReclaimer, LeaseProvider, MediaFetcher, MediaIndex, NoopArtworkFetcher,
    NoopCacheReclaimer, NoopLeaseProvider, NoopMediaIndex,
};
use core_async::pool::WorkerPool;
use core_async::sync::Notify;
use core_runtime::events::{CoreEvent, EventBus};
use core_runtime::CoreConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::trace;

/// Everything a transfer attempt needs besides its item.
///
/// Missing optional collaborators are replaced by no-op implementations, so
/// the engine never has to branch on their presence.
#[derive(Clone)]
pub struct TransferContext {
    pub(crate) fetcher: Arc<dyn MediaFetcher>,
    pub(crate) reclaimer: Arc<dyn CacheReclaimer>,
    pub(crate) leases: Arc<dyn LeaseProvider>,
    pub(crate) media_index: Arc<dyn MediaIndex>,
    pub(crate) artwork: Arc<dyn ArtworkFetcher>,
    pub(crate) events: EventBus,
    pub(crate) pool: WorkerPool,
    pub(crate) admission: Arc<Notify>,
    /// Artifacts of items that are playing or wait for a rename, by track id.
    protected: Arc<Mutex<HashMap<String, Vec<PathBuf>>>>,
    pub(crate) config: DownloadConfig,
    pub(crate) download_root: PathBuf,
}

impl TransferContext {
    pub fn new(core: &CoreConfig, config: DownloadConfig) -> Self {
        Self {
            fetcher: Arc::clone(&core.media_fetcher),
            reclaimer: core
                .cache_reclaimer
                .clone()
                .unwrap_or_else(|| Arc::new(NoopCacheReclaimer)),
            leases: core
                .lease_provider
                .clone()
                .unwrap_or_else(|| Arc::new(NoopLeaseProvider)),
            media_index: core
                .media_index
                .clone()
                .unwrap_or_else(|| Arc::new(NoopMediaIndex)),
            artwork: core
                .artwork_fetcher
                .clone()
                .unwrap_or_else(|| Arc::new(NoopArtworkFetcher)),
            events: core.event_bus.clone(),
            pool: WorkerPool::new("cache-reclaim", 1),
            admission: Arc::new(Notify::new()),
            protected: Arc::new(Mutex::new(HashMap::new())),
            config,
            download_root: core.download_root.clone(),
        }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub fn download_root(&self) -> &std::path::Path {
        &self.download_root
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Publishes an event; having no subscribers is fine.
    pub(crate) fn emit(&self, event: impl Into<CoreEvent>) {
        if self.events.emit(event.into()).is_err() {
            trace!("No event subscribers");
        }
    }

    /// Shields `paths` from cache reclamation, or lifts the shield with
    /// `None`.
    pub(crate) fn set_protected(&self, track_id: &str, paths: Option<Vec<PathBuf>>) {
        let mut protected = self.protected.lock();
        match paths {
            Some(paths) => {
                protected.insert(track_id.to_string(), paths);
            }
            None => {
                protected.remove(track_id);
            }
        }
    }

    /// Every path a reclaim pass must leave alone.
    pub(crate) fn protected_paths(&self) -> Vec<PathBuf> {
        self.protected.lock().values().flatten().cloned().collect()
    }

    /// Wakes the scheduler so it re-evaluates admission.
    pub(crate) fn notify_scheduler(&self) {
        self.admission.notify_one();
    }
}

impl std::fmt::Debug for TransferContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferContext")
            .field("download_root", &self.download_root)
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
