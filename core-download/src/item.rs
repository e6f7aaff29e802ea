//! # Download Item
//!
//! One track in the working set: its artifact layout, retry budget, playback
//! gate and observable lifecycle.
//!
//! ## State machine
//!
//! ```text
//! Idle ──start──▶ Downloading ──▶ Complete | Saved | Failed | Cancelled
//!                      ▲                               │        │
//!                      └────────── start (explicit) ───┴────────┘
//! ```
//!
//! At most one transfer attempt runs per item. Progress and state are `watch`
//! channels, so observers read them without blocking the attempt. The playing
//! flag and the deferred rename share one lock with the engine's promotion
//! step; a rename is either applied by the engine or recorded and applied by
//! [`DownloadItem::mark_playing`], never both.

use crate::config::Quality;
use crate::context::TransferContext;
use crate::engine;
use crate::error::{DownloadError, Result};
use crate::paths::ArtifactPaths;
use crate::track::Track;
use core_async::sync::{watch, CancellationToken};
use core_runtime::events::{CacheEvent, DownloadEvent, RenameTarget};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Lifecycle state of a download item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    Idle,
    Downloading,
    Cancelled,
    Failed,
    /// A finished evictable copy exists, or a promotion is waiting for
    /// playback to stop.
    Complete,
    Saved,
}

impl DownloadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadState::Idle => "idle",
            DownloadState::Downloading => "downloading",
            DownloadState::Cancelled => "cancelled",
            DownloadState::Failed => "failed",
            DownloadState::Complete => "complete",
            DownloadState::Saved => "saved",
        }
    }
}

/// Promotion postponed while the item is being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingRename {
    ToSave,
    ToComplete,
}

impl PendingRename {
    pub(crate) fn target(&self) -> RenameTarget {
        match self {
            PendingRename::ToSave => RenameTarget::Save,
            PendingRename::ToComplete => RenameTarget::Complete,
        }
    }
}

/// Serializable point-in-time view of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatus {
    pub track_id: String,
    pub state: DownloadState,
    pub progress: u8,
    pub priority: u32,
    pub pinned: bool,
    pub playing: bool,
    pub failed: bool,
    pub retry_budget: u32,
    pub pending_rename: Option<PendingRename>,
}

#[derive(Debug, Default)]
pub(crate) struct PlaybackGate {
    pub(crate) playing: bool,
    pub(crate) pending: Option<PendingRename>,
}

/// A track being made available locally.
pub struct DownloadItem {
    track: Track,
    quality: Quality,
    paths: ArtifactPaths,
    pinned: AtomicBool,
    priority: AtomicU32,
    retry_budget: AtomicU32,
    failed: AtomicBool,
    removed: AtomicBool,
    state: watch::Sender<DownloadState>,
    progress: watch::Sender<u8>,
    running: watch::Sender<bool>,
    pub(crate) gate: Mutex<PlaybackGate>,
    attempt: Mutex<Option<CancellationToken>>,
    pub(crate) ctx: Arc<TransferContext>,
}

impl DownloadItem {
    pub fn new(
        track: Track,
        quality: Quality,
        pinned: bool,
        priority: u32,
        ctx: Arc<TransferContext>,
    ) -> Arc<Self> {
        let paths = ArtifactPaths::for_track(ctx.download_root(), &track);
        let retry_budget = ctx.config().max_retries;

        Arc::new(Self {
            track,
            quality,
            paths,
            pinned: AtomicBool::new(pinned),
            priority: AtomicU32::new(priority),
            retry_budget: AtomicU32::new(retry_budget),
            failed: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            state: watch::Sender::new(DownloadState::Idle),
            progress: watch::Sender::new(0),
            running: watch::Sender::new(false),
            gate: Mutex::new(PlaybackGate::default()),
            attempt: Mutex::new(None),
            ctx,
        })
    }

    // ========================================================================
    // Identity
    // ========================================================================

    pub fn id(&self) -> &str {
        &self.track.id
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Bitrate of the stored file: the server's value if known, else the
    /// requested one.
    pub fn effective_bitrate(&self) -> u32 {
        self.track
            .bitrate
            .unwrap_or_else(|| self.quality.max_bitrate())
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.load(Ordering::Acquire)
    }

    pub fn priority(&self) -> u32 {
        self.priority.load(Ordering::Acquire)
    }

    pub fn set_priority(&self, priority: u32) {
        self.priority.store(priority, Ordering::Release);
    }

    // ========================================================================
    // Attempt control
    // ========================================================================

    /// Launches a transfer attempt.
    ///
    /// Returns `false` without side effects when an attempt is already
    /// running, the item was deleted, or there is no runtime to spawn on.
    pub fn start_download(self: &Arc<Self>) -> bool {
        let mut slot = self.attempt.lock();
        if slot.is_some() {
            debug!(track_id = %self.id(), "Attempt already running");
            return false;
        }
        if self.removed.load(Ordering::Acquire) || !core_async::task::in_runtime() {
            return false;
        }

        self.failed.store(false, Ordering::Release);
        self.progress.send_replace(0);
        self.state.send_replace(DownloadState::Downloading);
        self.running.send_replace(true);

        let token = CancellationToken::new();
        *slot = Some(token.clone());

        let guard = AttemptGuard {
            item: Arc::clone(self),
        };
        core_async::spawn(async move {
            engine::run_attempt(&guard.item, token).await;
            drop(guard);
        });

        true
    }

    /// Requests cooperative cancellation of the running attempt, if any.
    ///
    /// Returns immediately; the attempt stops at its next checkpoint.
    pub fn cancel_download(&self) {
        if let Some(token) = self.attempt.lock().as_ref() {
            debug!(track_id = %self.id(), "Cancelling attempt");
            token.cancel();
        }
    }

    /// Waits until no attempt is running.
    pub async fn wait_idle(&self) {
        let mut running = self.running.subscribe();
        let _ = running.wait_for(|running| !*running).await;
    }

    // ========================================================================
    // Playback gate
    // ========================================================================

    /// Records whether a player has the item open.
    ///
    /// Switching to `false` applies a deferred rename, exactly once.
    pub fn mark_playing(&self, playing: bool) {
        let mut gate = self.gate.lock();
        gate.playing = playing;

        if !playing {
            if let Some(pending) = gate.pending.take() {
                if let Err(e) = self.apply_rename(pending) {
                    self.record_failure(&e);
                }
            }
        }
        self.protect(&gate);
    }

    /// Keeps the reclaimer away from this item's artifacts while it is
    /// playing or waiting for a rename. Called with the gate held.
    pub(crate) fn protect(&self, gate: &PlaybackGate) {
        let paths = (gate.playing || gate.pending.is_some())
            .then(|| self.paths.all().into_iter().map(Path::to_path_buf).collect());
        self.ctx.set_protected(self.id(), paths);
    }

    pub fn is_playing(&self) -> bool {
        self.gate.lock().playing
    }

    pub fn pending_rename(&self) -> Option<PendingRename> {
        self.gate.lock().pending
    }

    /// Called with the gate held.
    fn apply_rename(&self, pending: PendingRename) -> Result<()> {
        let target = pending.target();
        let path = match pending {
            PendingRename::ToSave => {
                let source = if self.paths.complete().exists() {
                    self.paths.complete()
                } else {
                    self.paths.partial()
                };
                rename(source, self.paths.save())?;
                self.register(self.paths.save());
                self.state.send_replace(DownloadState::Saved);
                self.paths.save()
            }
            PendingRename::ToComplete => {
                rename(self.paths.partial(), self.paths.complete())?;
                self.state.send_replace(DownloadState::Complete);
                self.paths.complete()
            }
        };

        info!(track_id = %self.id(), ?target, "Deferred rename applied");
        self.ctx.emit(DownloadEvent::RenameApplied {
            track_id: self.id().to_string(),
            target,
            path: path.display().to_string(),
        });
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// A finished copy exists on disk.
    pub fn is_complete(&self) -> bool {
        self.paths.save().exists() || self.paths.complete().exists()
    }

    pub fn is_saved(&self) -> bool {
        self.paths.save().exists()
    }

    /// Nothing is left to transfer: the copy this item wants exists, or its
    /// promotion only waits for playback to stop.
    pub fn is_work_done(&self) -> bool {
        self.pending_rename().is_some()
            || self.paths.save().exists()
            || (self.paths.complete().exists() && !self.is_pinned())
    }

    pub fn is_downloading(&self) -> bool {
        *self.running.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == DownloadState::Cancelled
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Failed, with budget left for an automatic retry.
    pub fn should_retry(&self) -> bool {
        self.is_failed() && self.retry_budget() > 0
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    pub fn state(&self) -> DownloadState {
        *self.state.borrow()
    }

    /// The scheduler may start this item without being asked to.
    pub(crate) fn is_eligible(&self) -> bool {
        if self.is_downloading() || self.pending_rename().is_some() {
            return false;
        }
        match self.state() {
            DownloadState::Idle => true,
            DownloadState::Failed => self.retry_budget() > 0,
            _ => false,
        }
    }

    /// Finished copy a player should prefer; *save* wins over *complete*.
    pub fn complete_or_save_path(&self) -> Option<PathBuf> {
        [self.paths.save(), self.paths.complete()]
            .into_iter()
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Best path to open right now, falling back to the partial artifact.
    pub fn playable_path(&self) -> Option<PathBuf> {
        self.complete_or_save_path().or_else(|| {
            let partial = self.paths.partial();
            partial.exists().then(|| partial.to_path_buf())
        })
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DownloadState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ItemStatus {
        let (playing, pending_rename) = {
            let gate = self.gate.lock();
            (gate.playing, gate.pending)
        };
        ItemStatus {
            track_id: self.id().to_string(),
            state: self.state(),
            progress: self.progress(),
            priority: self.priority(),
            pinned: self.is_pinned(),
            playing,
            failed: self.is_failed(),
            retry_budget: self.retry_budget(),
            pending_rename,
        }
    }

    // ========================================================================
    // Artifact maintenance
    // ========================================================================

    /// Demotes a pinned copy to an evictable one.
    ///
    /// A pending promotion to *save* is dropped when a *complete* copy already
    /// exists, otherwise it is redirected to *complete*.
    pub fn unpin(&self) -> Result<()> {
        let mut gate = self.gate.lock();
        self.pinned.store(false, Ordering::Release);

        if gate.pending == Some(PendingRename::ToSave) {
            gate.pending = if self.paths.complete().exists() {
                None
            } else {
                Some(PendingRename::ToComplete)
            };
            self.protect(&gate);
        }

        if self.paths.save().exists() {
            rename(self.paths.save(), self.paths.complete())?;
            if let Err(e) = self.ctx.media_index.forget(self.paths.save()) {
                warn!(track_id = %self.id(), error = %e, "Media index forget failed");
            }
            self.state.send_replace(DownloadState::Complete);
            info!(track_id = %self.id(), "Unpinned");
        } else if self.state() == DownloadState::Saved {
            self.state.send_replace(DownloadState::Complete);
        }

        Ok(())
    }

    /// Removes artifacts made redundant by a finished copy.
    ///
    /// Does nothing while an attempt runs or a rename is pending. Returns
    /// `true` when every removal succeeded.
    pub fn cleanup(&self) -> bool {
        if self.is_downloading() {
            return false;
        }
        let gate = self.gate.lock();
        if gate.pending.is_some() {
            return false;
        }

        let mut redundant = Vec::new();
        if self.paths.save().exists() {
            redundant.push(self.paths.complete());
            redundant.push(self.paths.partial());
        } else if self.paths.complete().exists() {
            redundant.push(self.paths.partial());
        }

        let mut ok = true;
        for path in redundant {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Removed redundant artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove artifact");
                    ok = false;
                }
            }
        }
        ok
    }

    /// Marks every existing artifact as recently used.
    pub fn touch(&self) -> Result<()> {
        let now = SystemTime::now();
        for path in self.paths.all() {
            match std::fs::File::options().write(true).open(path) {
                Ok(file) => file.set_modified(now)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Cancels any attempt and removes all three artifacts.
    ///
    /// The item cannot be started again afterwards.
    pub async fn delete(&self) -> Result<()> {
        self.removed.store(true, Ordering::Release);
        self.cancel_download();
        self.wait_idle().await;

        let was_saved = self.paths.save().exists();
        {
            let mut gate = self.gate.lock();
            gate.pending = None;
            self.protect(&gate);
        }

        let mut first_error = None;
        for path in self.paths.all() {
            if let Err(e) = core_async::fs::remove_if_exists(path).await {
                warn!(path = %path.display(), error = %e, "Failed to delete artifact");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        if was_saved {
            if let Err(e) = self.ctx.media_index.forget(self.paths.save()) {
                warn!(track_id = %self.id(), error = %e, "Media index forget failed");
            }
        }

        self.progress.send_replace(0);
        self.state.send_replace(DownloadState::Idle);
        info!(track_id = %self.id(), "Download removed");
        self.ctx.emit(DownloadEvent::Removed {
            track_id: self.id().to_string(),
        });

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Engine hooks
    // ========================================================================

    /// Raises progress; never lowers it within an attempt.
    pub(crate) fn set_progress(&self, percent: u8) {
        let percent = percent.min(100);
        let raised = self.progress.send_if_modified(|current| {
            if percent > *current {
                *current = percent;
                true
            } else {
                false
            }
        });
        if raised {
            self.ctx.emit(DownloadEvent::Progress {
                track_id: self.id().to_string(),
                percent,
            });
        }
    }

    pub(crate) fn set_state(&self, state: DownloadState) {
        self.state.send_replace(state);
    }

    /// Charges the retry budget (floor 0) and publishes the failure.
    pub(crate) fn record_failure(&self, error: &DownloadError) {
        let retries_left = self
            .retry_budget
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |budget| {
                budget.checked_sub(1)
            })
            .map_or(0, |previous| previous - 1);

        self.failed.store(true, Ordering::Release);
        self.state.send_replace(DownloadState::Failed);

        warn!(
            track_id = %self.id(),
            error = %error,
            transient = error.is_transient(),
            retries_left,
            "Download attempt failed"
        );
        self.ctx.emit(DownloadEvent::Failed {
            track_id: self.id().to_string(),
            message: error.to_string(),
            retries_left,
        });
    }

    /// Registers a pinned copy with the device media index; failures are
    /// logged only.
    pub(crate) fn register(&self, path: &Path) {
        if let Err(e) = self.ctx.media_index.register(path) {
            warn!(track_id = %self.id(), error = %e, "Media index registration failed");
        }
    }

    fn request_reclaim(&self) {
        if !core_async::task::in_runtime() {
            return;
        }
        let reclaimer = Arc::clone(&self.ctx.reclaimer);
        let ctx = Arc::clone(&self.ctx);
        let protected = self.ctx.protected_paths();
        let _ = self.ctx.pool.submit(async move {
            match reclaimer.reclaim(&protected).await {
                Ok(report) if report.files_removed > 0 => {
                    info!(
                        files_removed = report.files_removed,
                        bytes_freed = report.bytes_freed,
                        "Cache space reclaimed"
                    );
                    ctx.emit(CacheEvent::Reclaimed {
                        files_removed: report.files_removed,
                        bytes_freed: report.bytes_freed,
                    });
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Cache reclaim failed"),
            }
        });
    }
}

impl std::fmt::Debug for DownloadItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadItem")
            .field("track_id", &self.id())
            .field("state", &self.state())
            .field("progress", &self.progress())
            .field("pinned", &self.is_pinned())
            .field("retry_budget", &self.retry_budget())
            .finish()
    }
}

pub(crate) fn rename(from: &Path, to: &Path) -> Result<()> {
    std::fs::rename(from, to).map_err(|source| DownloadError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Ends an attempt on every exit path, panics included.
struct AttemptGuard {
    item: Arc<DownloadItem>,
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        let item = &self.item;
        {
            let mut slot = item.attempt.lock();
            *slot = None;
            item.state.send_if_modified(|state| {
                if *state == DownloadState::Downloading {
                    *state = DownloadState::Failed;
                    true
                } else {
                    false
                }
            });
            item.running.send_replace(false);
        }
        item.request_reclaim();
        item.ctx.notify_scheduler();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DownloadConfig;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, FetchRequest, FetchResponse, MediaFetcher, MediaIndex};
    use core_runtime::CoreConfig;
    use mockall::mock;
    use tempfile::TempDir;

    struct OfflineFetcher;

    #[async_trait]
    impl MediaFetcher for OfflineFetcher {
        async fn fetch(&self, _request: FetchRequest) -> BridgeResult<FetchResponse> {
            Err(BridgeError::NotAvailable("offline".to_string()))
        }
    }

    mock! {
        pub Index {}

        impl MediaIndex for Index {
            fn register(&self, path: &Path) -> BridgeResult<()>;
            fn forget(&self, path: &Path) -> BridgeResult<()>;
        }
    }

    fn item(dir: &TempDir, pinned: bool) -> Arc<DownloadItem> {
        item_with_index(dir, pinned, MockIndex::new())
    }

    fn item_with_index(dir: &TempDir, pinned: bool, index: MockIndex) -> Arc<DownloadItem> {
        let core = CoreConfig::builder()
            .download_root(dir.path())
            .media_fetcher(Arc::new(OfflineFetcher))
            .media_index(Arc::new(index))
            .build()
            .unwrap();
        let ctx = Arc::new(TransferContext::new(&core, DownloadConfig::default()));
        let track = Track::new("tr-1", "mp3").with_path("Artist/song.mp3");
        DownloadItem::new(track, Quality::ORIGINAL, pinned, 10, ctx)
    }

    fn write(path: &Path, bytes: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_new_item_is_idle() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, false);

        assert_eq!(item.state(), DownloadState::Idle);
        assert_eq!(item.retry_budget(), 5);
        assert!(!item.is_failed());
        assert!(!item.is_downloading());
        assert!(!item.is_work_done());
        assert!(item.is_eligible());
        assert!(item.playable_path().is_none());
    }

    #[test]
    fn test_save_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, true);
        write(item.paths().complete(), b"complete");
        write(item.paths().save(), b"save");

        assert!(item.is_saved());
        assert_eq!(item.complete_or_save_path().unwrap(), item.paths().save());
    }

    #[test]
    fn test_pinned_item_with_complete_copy_has_work_left() {
        let dir = TempDir::new().unwrap();
        let pinned = item(&dir, true);
        write(pinned.paths().complete(), b"complete");

        assert!(pinned.is_complete());
        assert!(!pinned.is_work_done());
    }

    #[test]
    fn test_playable_path_falls_back_to_partial() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, false);
        write(item.paths().partial(), b"part");

        assert_eq!(item.playable_path().unwrap(), item.paths().partial());
        assert!(item.complete_or_save_path().is_none());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, false);

        item.set_progress(40);
        item.set_progress(30);
        assert_eq!(item.progress(), 40);
        item.set_progress(250);
        assert_eq!(item.progress(), 100);
    }

    #[test]
    fn test_retry_budget_floors_at_zero() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, false);
        let error = DownloadError::Stalled(std::time::Duration::from_secs(1));

        for _ in 0..7 {
            item.record_failure(&error);
        }
        assert_eq!(item.retry_budget(), 0);
        assert!(item.is_failed());
        assert!(!item.should_retry());
        assert!(!item.is_eligible());
    }

    #[test]
    fn test_unpin_demotes_saved_copy() {
        let dir = TempDir::new().unwrap();
        let mut index = MockIndex::new();
        index
            .expect_forget()
            .withf(|path| path.ends_with("Artist/song.mp3"))
            .times(1)
            .returning(|_| Ok(()));
        let item = item_with_index(&dir, true, index);
        write(item.paths().save(), b"bytes");

        item.unpin().unwrap();

        assert!(!item.is_pinned());
        assert!(!item.paths().save().exists());
        assert_eq!(std::fs::read(item.paths().complete()).unwrap(), b"bytes");
        assert_eq!(item.state(), DownloadState::Complete);
    }

    #[test]
    fn test_unpin_redirects_pending_rename() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, true);
        write(item.paths().partial(), b"bytes");
        {
            let mut gate = item.gate.lock();
            gate.playing = true;
            gate.pending = Some(PendingRename::ToSave);
        }

        item.unpin().unwrap();
        assert_eq!(item.pending_rename(), Some(PendingRename::ToComplete));

        item.mark_playing(false);
        assert!(item.paths().complete().exists());
        assert!(!item.paths().save().exists());
    }

    #[test]
    fn test_deferred_save_registers_with_media_index() {
        let dir = TempDir::new().unwrap();
        let mut index = MockIndex::new();
        index
            .expect_register()
            .withf(|path| path.ends_with("Artist/song.mp3"))
            .times(1)
            .returning(|_| Ok(()));
        let item = item_with_index(&dir, true, index);
        write(item.paths().partial(), b"bytes");
        {
            let mut gate = item.gate.lock();
            gate.playing = true;
            gate.pending = Some(PendingRename::ToSave);
        }

        item.mark_playing(false);
        item.mark_playing(false);

        assert_eq!(item.state(), DownloadState::Saved);
        assert_eq!(std::fs::read(item.paths().save()).unwrap(), b"bytes");
    }

    #[test]
    fn test_cleanup_removes_redundant_artifacts() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, true);
        write(item.paths().save(), b"save");
        write(item.paths().complete(), b"complete");
        write(item.paths().partial(), b"part");

        assert!(item.cleanup());
        assert!(item.paths().save().exists());
        assert!(!item.paths().complete().exists());
        assert!(!item.paths().partial().exists());
    }

    #[test]
    fn test_cleanup_keeps_rename_source() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, false);
        write(item.paths().complete(), b"old");
        write(item.paths().partial(), b"new");
        item.gate.lock().pending = Some(PendingRename::ToComplete);

        assert!(!item.cleanup());
        assert!(item.paths().partial().exists());
    }

    #[test]
    fn test_touch_refreshes_mtime() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, false);
        write(item.paths().complete(), b"bytes");
        let old = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        std::fs::File::options()
            .write(true)
            .open(item.paths().complete())
            .unwrap()
            .set_modified(old)
            .unwrap();

        item.touch().unwrap();

        let modified = std::fs::metadata(item.paths().complete())
            .unwrap()
            .modified()
            .unwrap();
        assert!(modified > old);
    }

    #[test]
    fn test_start_without_runtime_is_rejected() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, false);

        assert!(!item.start_download());
        assert_eq!(item.state(), DownloadState::Idle);
    }

    #[test]
    fn test_snapshot_serializes() {
        let dir = TempDir::new().unwrap();
        let item = item(&dir, true);
        let json = serde_json::to_value(item.snapshot()).unwrap();

        assert_eq!(json["track_id"], "tr-1");
        assert_eq!(json["state"], "idle");
        assert_eq!(json["pinned"], true);
        assert_eq!(json["retry_budget"], 5);
    }
}
