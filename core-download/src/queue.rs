//! # Download Queue
//!
//! The working set of download items and the scheduler that admits them.
//!
//! Pending items are ordered by priority (lower first), ties broken by
//! enqueue order. At most `max_concurrent_downloads` attempts run at once.
//! Admission is re-evaluated on every enqueue and whenever an attempt ends;
//! attempts signal their end through a `Notify` that a background driver
//! task listens on.

use crate::config::{DownloadConfig, DEFAULT_PRIORITY};
use crate::context::TransferContext;
use crate::error::{DownloadError, Result};
use crate::item::{DownloadItem, DownloadState};
use crate::track::Track;
use core_async::sync::{CancellationToken, Notify};
use core_async::task::join_all;
use core_runtime::events::DownloadEvent;
use core_runtime::CoreConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument};

/// Counts over the working set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Items in the working set
    pub total: usize,

    /// Items with a running attempt
    pub active: usize,

    /// Items the scheduler would start when a slot frees up
    pub pending: usize,

    pub complete: usize,

    pub saved: usize,

    /// Failed items, including exhausted ones
    pub failed: usize,

    /// Failed items with no retry budget left
    pub exhausted: usize,

    pub cancelled: usize,
}

struct Entry {
    seq: u64,
    item: Arc<DownloadItem>,
}

#[derive(Default)]
struct QueueState {
    next_seq: u64,
    entries: Vec<Entry>,
    /// Ids admitted regardless of eligibility on their next evaluation.
    forced: HashSet<String>,
}

struct QueueInner {
    ctx: Arc<TransferContext>,
    state: Mutex<QueueState>,
    shutdown: CancellationToken,
}

/// Priority scheduler over a set of [`DownloadItem`]s.
///
/// Cloning is cheap; clones share the same working set.
#[derive(Clone)]
pub struct DownloadQueue {
    inner: Arc<QueueInner>,
}

impl DownloadQueue {
    /// Creates a queue and starts its admission driver.
    pub fn new(core: &CoreConfig, config: DownloadConfig) -> Result<Self> {
        config.validate().map_err(DownloadError::Config)?;
        if !core_async::task::in_runtime() {
            return Err(DownloadError::Config(
                "download queue must be created inside a runtime".to_string(),
            ));
        }

        let ctx = Arc::new(TransferContext::new(core, config));
        let inner = Arc::new(QueueInner {
            ctx: Arc::clone(&ctx),
            state: Mutex::new(QueueState::default()),
            shutdown: CancellationToken::new(),
        });

        core_async::spawn(drive(
            Arc::downgrade(&inner),
            Arc::clone(&ctx.admission),
            inner.shutdown.clone(),
        ));

        info!(
            max_concurrent = ctx.config().max_concurrent_downloads,
            root = %ctx.download_root().display(),
            "Download queue started"
        );
        Ok(Self { inner })
    }

    pub fn context(&self) -> &TransferContext {
        &self.inner.ctx
    }

    // ========================================================================
    // Working set
    // ========================================================================

    /// Adds a track to the working set.
    ///
    /// A track that is already queued is returned as is, its priority raised
    /// to `priority` if that is more urgent. Asking to pin an unpinned item
    /// cancels it and replaces it with a pinned one.
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub async fn enqueue(&self, track: Track, pin: bool, priority: u32) -> Arc<DownloadItem> {
        if let Some(existing) = self.get(&track.id) {
            if !(pin && !existing.is_pinned()) {
                if priority < existing.priority() {
                    existing.set_priority(priority);
                    debug!(priority, "Priority raised");
                }
                self.inner.evaluate();
                return existing;
            }

            return self.upgrade_to_pinned(existing, track, priority).await;
        }

        let item = self.new_item(track, pin, priority);
        {
            let mut state = self.inner.state.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.entries.push(Entry {
                seq,
                item: Arc::clone(&item),
            });
        }

        self.announce(&item);
        self.inner.evaluate();
        item
    }

    /// [`enqueue`](Self::enqueue) with the default priority, unpinned.
    pub async fn enqueue_default(&self, track: Track) -> Arc<DownloadItem> {
        self.enqueue(track, false, DEFAULT_PRIORITY).await
    }

    async fn upgrade_to_pinned(
        &self,
        existing: Arc<DownloadItem>,
        track: Track,
        priority: u32,
    ) -> Arc<DownloadItem> {
        info!("Upgrading to pinned download");
        let seq = self.detach(existing.id());

        existing.cancel_download();
        existing.wait_idle().await;

        let replacement = self.new_item(track, true, priority.min(existing.priority()));
        replacement.mark_playing(existing.is_playing());

        {
            let mut state = self.inner.state.lock();
            let seq = seq.unwrap_or_else(|| {
                let next = state.next_seq;
                state.next_seq += 1;
                next
            });
            state.entries.retain(|e| e.item.id() != replacement.id());
            state.entries.push(Entry {
                seq,
                item: Arc::clone(&replacement),
            });
        }

        self.announce(&replacement);
        self.inner.evaluate();
        replacement
    }

    fn new_item(&self, track: Track, pin: bool, priority: u32) -> Arc<DownloadItem> {
        let quality = self.inner.ctx.config().default_quality;
        DownloadItem::new(track, quality, pin, priority, Arc::clone(&self.inner.ctx))
    }

    fn announce(&self, item: &DownloadItem) {
        self.inner.ctx.emit(DownloadEvent::Queued {
            track_id: item.id().to_string(),
            priority: item.priority(),
            pinned: item.is_pinned(),
        });
    }

    /// Takes an entry out of the working set, returning its sequence number.
    fn detach(&self, id: &str) -> Option<u64> {
        let mut state = self.inner.state.lock();
        state.forced.remove(id);
        let index = state.entries.iter().position(|e| e.item.id() == id)?;
        Some(state.entries.remove(index).seq)
    }

    pub fn get(&self, id: &str) -> Option<Arc<DownloadItem>> {
        self.inner
            .state
            .lock()
            .entries
            .iter()
            .find(|e| e.item.id() == id)
            .map(|e| Arc::clone(&e.item))
    }

    /// All items in scheduling order.
    pub fn items(&self) -> Vec<Arc<DownloadItem>> {
        let mut ordered: Vec<(u32, u64, Arc<DownloadItem>)> = self
            .inner
            .state
            .lock()
            .entries
            .iter()
            .map(|e| (e.item.priority(), e.seq, Arc::clone(&e.item)))
            .collect();
        ordered.sort_by_key(|(priority, seq, _)| (*priority, *seq));
        ordered.into_iter().map(|(_, _, item)| item).collect()
    }

    /// Removes an item and deletes its artifacts.
    ///
    /// Returns `Ok(false)` when the id is unknown.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let item = self.get(id);
        let Some(item) = item else {
            return Ok(false);
        };
        self.detach(id);
        item.delete().await?;
        Ok(true)
    }

    /// Drops every item from the working set, cancelling running attempts.
    ///
    /// Artifacts stay on disk, so a later enqueue of the same track resumes
    /// or reuses them.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> usize {
        let items: Vec<Arc<DownloadItem>> = {
            let mut state = self.inner.state.lock();
            state.forced.clear();
            state.entries.drain(..).map(|e| e.item).collect()
        };

        for item in &items {
            item.cancel_download();
        }
        join_all(items.iter().map(|item| item.wait_idle())).await;

        info!(count = items.len(), "Download queue cleared");
        items.len()
    }

    /// Changes an item's priority; running attempts are not preempted.
    pub fn set_priority(&self, id: &str, priority: u32) -> bool {
        let Some(item) = self.get(id) else {
            return false;
        };
        item.set_priority(priority);
        self.inner.evaluate();
        true
    }

    /// Schedules an item again regardless of its state or retry budget.
    ///
    /// The budget is not reset, so an exhausted item gets exactly one more
    /// attempt per call.
    pub fn retry(&self, id: &str) -> bool {
        let Some(item) = self.get(id) else {
            return false;
        };
        if item.is_downloading() {
            return false;
        }

        info!(track_id = id, retries_left = item.retry_budget(), "Manual retry");
        self.inner.state.lock().forced.insert(id.to_string());
        self.inner.evaluate();
        true
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .entries
            .iter()
            .filter(|e| e.item.is_downloading())
            .count()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.inner.state.lock();
        let mut stats = QueueStats {
            total: state.entries.len(),
            ..Default::default()
        };

        for entry in &state.entries {
            let item = &entry.item;
            if item.is_downloading() {
                stats.active += 1;
                continue;
            }
            if item.is_eligible() || state.forced.contains(item.id()) {
                stats.pending += 1;
            }
            match item.state() {
                DownloadState::Complete => stats.complete += 1,
                DownloadState::Saved => stats.saved += 1,
                DownloadState::Cancelled => stats.cancelled += 1,
                DownloadState::Failed => {
                    stats.failed += 1;
                    if item.retry_budget() == 0 {
                        stats.exhausted += 1;
                    }
                }
                DownloadState::Idle | DownloadState::Downloading => {}
            }
        }

        stats
    }

    /// Stops admitting work, cancels running attempts and waits for them
    /// and for pending cache reclaims.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.ctx.notify_scheduler();

        let items: Vec<Arc<DownloadItem>> = self
            .inner
            .state
            .lock()
            .entries
            .iter()
            .map(|e| Arc::clone(&e.item))
            .collect();

        for item in &items {
            item.cancel_download();
        }
        join_all(items.iter().map(|item| item.wait_idle())).await;

        self.inner.ctx.pool.shutdown().await;
        info!("Download queue shut down");
    }
}

impl std::fmt::Debug for DownloadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadQueue")
            .field("len", &self.len())
            .field("active", &self.active_count())
            .field("shutdown", &self.inner.shutdown.is_cancelled())
            .finish()
    }
}

impl QueueInner {
    /// Starts the most urgent eligible items until the concurrency cap is
    /// reached.
    fn evaluate(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }

        let cap = self.ctx.config().max_concurrent_downloads;
        let mut state = self.state.lock();

        let mut active = state
            .entries
            .iter()
            .filter(|e| e.item.is_downloading())
            .count();
        if active >= cap {
            return;
        }

        let mut candidates: Vec<(u32, u64, Arc<DownloadItem>)> = state
            .entries
            .iter()
            .filter(|e| {
                !e.item.is_downloading()
                    && (state.forced.contains(e.item.id()) || e.item.is_eligible())
            })
            .map(|e| (e.item.priority(), e.seq, Arc::clone(&e.item)))
            .collect();
        candidates.sort_by_key(|(priority, seq, _)| (*priority, *seq));

        for (_, _, item) in candidates {
            if active >= cap {
                break;
            }
            if item.start_download() {
                debug!(track_id = %item.id(), priority = item.priority(), "Admitted");
                state.forced.remove(item.id());
                active += 1;
            }
        }
    }
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.ctx.notify_scheduler();
    }
}

/// Re-evaluates admission each time an attempt ends.
async fn drive(queue: Weak<QueueInner>, admission: Arc<Notify>, shutdown: CancellationToken) {
    loop {
        admission.notified().await;
        if shutdown.is_cancelled() {
            break;
        }
        match queue.upgrade() {
            Some(queue) => queue.evaluate(),
            None => break,
        }
    }
    debug!("Admission driver stopped");
}
