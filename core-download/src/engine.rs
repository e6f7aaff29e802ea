//! # Transfer Engine
//!
//! Runs one resumable attempt for one item:
//!
//! 1. Settle early when a finished copy already exists.
//! 2. Hold the attempt's leases.
//! 3. Resume from the length of the partial artifact, skipping the fetch
//!    when it already holds the whole track.
//! 4. Copy the stream chunk by chunk, checking the cancellation token at
//!    every chunk boundary.
//! 5. Fetch cover art (best effort), then promote the partial artifact or
//!    defer the promotion while the item is being played.
//!
//! The engine never returns an error. Every outcome is recorded on the item
//! and published on the event bus.

use crate::error::{DownloadError, Result};
use crate::item::{rename, DownloadItem, DownloadState, PendingRename, PlaybackGate};
use crate::lease::LeaseScope;
use bridge_traits::FetchRequest;
use core_async::fs::{self, OpenOptions};
use core_async::io::{AsyncReadExt, AsyncWriteExt};
use core_async::sync::CancellationToken;
use core_async::time::maybe_timeout;
use core_runtime::events::DownloadEvent;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// How an attempt that did not fail ended.
#[derive(Debug)]
enum Outcome {
    Completed(PathBuf),
    Saved(PathBuf),
    Deferred(PendingRename),
}

/// Runs one attempt and records its outcome on `item`.
#[instrument(skip(item, token), fields(track_id = %item.id()))]
pub(crate) async fn run_attempt(item: &DownloadItem, token: CancellationToken) {
    let result = transfer(item, &token).await;
    publish(item, result).await;
}

/// Records how an attempt ended. A deferred promotion was already published
/// under the playback gate.
async fn publish(item: &DownloadItem, result: Result<Outcome>) {
    match result {
        Ok(Outcome::Completed(path)) => {
            item.set_progress(100);
            item.set_state(DownloadState::Complete);
            info!(path = %path.display(), "Download completed");
            item.ctx.emit(DownloadEvent::Completed {
                track_id: item.id().to_string(),
                path: path.display().to_string(),
            });
        }
        Ok(Outcome::Saved(path)) => {
            item.set_progress(100);
            item.set_state(DownloadState::Saved);
            info!(path = %path.display(), "Download saved");
            item.ctx.emit(DownloadEvent::Saved {
                track_id: item.id().to_string(),
                path: path.display().to_string(),
            });
        }
        Ok(Outcome::Deferred(pending)) => {
            info!(?pending, "Promotion deferred until playback stops");
        }
        Err(DownloadError::Cancelled) => {
            let bytes_retained = fs::len_or_zero(item.paths().partial())
                .await
                .unwrap_or(0);
            item.set_state(DownloadState::Cancelled);
            info!(bytes_retained, "Download cancelled");
            item.ctx.emit(DownloadEvent::Cancelled {
                track_id: item.id().to_string(),
                bytes_retained,
            });
        }
        Err(e) => item.record_failure(&e),
    }
}

async fn transfer(item: &DownloadItem, token: &CancellationToken) -> Result<Outcome> {
    if token.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }

    let paths = item.paths();
    if let Some(parent) = paths.parent() {
        fs::create_dir_all(parent).await?;
    }

    if let Some(outcome) = settle_existing(item).await? {
        return Ok(outcome);
    }

    let ctx = &item.ctx;
    let config = ctx.config();
    let _leases = LeaseScope::acquire(ctx.leases.as_ref(), config.keep_awake, item.id());

    let offset = fs::len_or_zero(paths.partial()).await?;
    if item.track().size.is_some_and(|size| size > 0 && offset >= size) {
        debug!(offset, "Partial artifact already holds every byte");
        return finish(item).await;
    }
    let request = FetchRequest::new(item.id())
        .with_offset(offset)
        .with_max_bitrate(item.quality().max_bitrate())
        .with_pinned(item.is_pinned());

    ctx.emit(DownloadEvent::Started {
        track_id: item.id().to_string(),
        resume_offset: offset,
        retries_left: item.retry_budget(),
    });
    debug!(offset, "Requesting stream");

    let response = ctx.fetcher.fetch(request).await?;
    if token.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }

    let resume = response.offset_honored && offset > 0;
    let start = if resume { offset } else { 0 };
    if offset > 0 && !resume {
        debug!(offset, "Offset not honored, restarting from zero");
    }

    let total = item
        .track()
        .size
        .or_else(|| response.content_length.map(|len| start + len))
        .filter(|total| *total > 0);

    let mut stream = response.stream;
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(resume)
        .truncate(!resume)
        .open(paths.partial())
        .await?;

    let mut buf = vec![0u8; config.chunk_size];
    let mut copied: u64 = 0;
    loop {
        if token.is_cancelled() {
            file.flush().await?;
            return Err(DownloadError::Cancelled);
        }

        let read = maybe_timeout(config.stall_timeout, stream.read(&mut buf))
            .await
            .map_err(|_| DownloadError::Stalled(config.stall_timeout.unwrap_or_default()))??;

        // A read that returns after cancellation is discarded, EOF included.
        if token.is_cancelled() {
            file.flush().await?;
            return Err(DownloadError::Cancelled);
        }
        if read == 0 {
            break;
        }

        file.write_all(&buf[..read]).await?;
        copied += read as u64;

        if let Some(total) = total {
            item.set_progress(percent(start + copied, total));
        }
    }

    file.flush().await?;
    drop(file);
    drop(stream);
    debug!(copied, total_bytes = start + copied, "Stream finished");

    finish(item).await
}

/// Cover art (best effort), then promotion of the partial artifact.
async fn finish(item: &DownloadItem) -> Result<Outcome> {
    if let Some(cover_art) = item.track().cover_art.as_deref() {
        if let Err(e) = item.ctx.artwork.cache_cover_art(cover_art).await {
            warn!(cover_art, error = %e, "Cover art fetch failed");
        }
    }

    promote_partial(item)
}

/// Resolves attempts that find a finished copy on disk.
async fn settle_existing(item: &DownloadItem) -> Result<Option<Outcome>> {
    let paths = item.paths();

    if paths.save().exists() {
        if fs::remove_if_exists(paths.complete()).await? {
            debug!("Removed stale complete copy next to saved copy");
        }
        return Ok(Some(Outcome::Saved(paths.save().to_path_buf())));
    }

    if !paths.complete().exists() {
        return Ok(None);
    }

    if !item.is_pinned() {
        return Ok(Some(Outcome::Completed(paths.complete().to_path_buf())));
    }

    promote_complete(item).map(Some)
}

fn promote_complete(item: &DownloadItem) -> Result<Outcome> {
    let paths = item.paths();
    let mut gate = item.gate.lock();
    if gate.playing {
        return Ok(defer(item, &mut gate, PendingRename::ToSave));
    }

    rename(paths.complete(), paths.save())?;
    item.register(paths.save());
    Ok(Outcome::Saved(paths.save().to_path_buf()))
}

/// Last fallible step of an attempt; nothing can fail after a rename
/// succeeds, so a failed attempt never leaves a fresh finished copy behind.
fn promote_partial(item: &DownloadItem) -> Result<Outcome> {
    let paths = item.paths();
    let pinned = item.is_pinned();
    let mut gate = item.gate.lock();

    if gate.playing {
        let pending = if pinned {
            PendingRename::ToSave
        } else {
            PendingRename::ToComplete
        };
        return Ok(defer(item, &mut gate, pending));
    }

    if pinned {
        rename(paths.partial(), paths.save())?;
        item.register(paths.save());
        Ok(Outcome::Saved(paths.save().to_path_buf()))
    } else {
        rename(paths.partial(), paths.complete())?;
        Ok(Outcome::Completed(paths.complete().to_path_buf()))
    }
}

/// Records a postponed promotion and publishes it before the gate is
/// released, so [`DownloadItem::mark_playing`] always observes it complete.
fn defer(item: &DownloadItem, gate: &mut PlaybackGate, pending: PendingRename) -> Outcome {
    gate.pending = Some(pending);
    item.protect(gate);
    item.set_progress(100);
    item.set_state(DownloadState::Complete);
    item.ctx.emit(DownloadEvent::RenameDeferred {
        track_id: item.id().to_string(),
        target: pending.target(),
    });
    Outcome::Deferred(pending)
}

fn percent(done: u64, total: u64) -> u8 {
    (done.saturating_mul(100) / total).min(100) as u8
}
