//! Fakes and helpers shared by the download integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    ArtworkFetcher, BridgeError, CacheReclaimer, FetchRequest, FetchResponse, LeaseKind,
    LeaseProvider, MediaFetcher, MediaIndex, ReclaimReport, ResourceLease,
};
use core_async::io::{AsyncRead, DuplexStream, ReadBuf};
use core_download::{DownloadConfig, DownloadItem, DownloadQueue, Quality, TransferContext, Track};
use core_runtime::CoreConfig;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Byte streams
// ============================================================================

/// Yields its chunks one read at a time, then EOF or a connection reset.
pub struct ScriptedStream {
    chunks: VecDeque<Vec<u8>>,
    fail_at_end: bool,
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.chunks.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.chunks.push_front(chunk[n..].to_vec());
                }
                Poll::Ready(Ok(()))
            }
            None if self.fail_at_end => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
            None => Poll::Ready(Ok(())),
        }
    }
}

/// What the fetcher answers to the next request for a track.
pub enum Script {
    Body {
        chunks: Vec<Vec<u8>>,
        fail_at_end: bool,
        honored: bool,
    },
    /// Bytes arrive as the test writes them to the other end.
    Pipe { reader: DuplexStream, honored: bool },
    Error(BridgeError),
}

impl Script {
    pub fn body(bytes: &[u8]) -> Self {
        Script::Body {
            chunks: vec![bytes.to_vec()],
            fail_at_end: false,
            honored: true,
        }
    }

    pub fn chunks(chunks: Vec<Vec<u8>>) -> Self {
        Script::Body {
            chunks,
            fail_at_end: false,
            honored: true,
        }
    }

    /// Sends `bytes`, then the connection drops.
    pub fn broken(bytes: &[u8]) -> Self {
        Script::Body {
            chunks: vec![bytes.to_vec()],
            fail_at_end: true,
            honored: true,
        }
    }

    /// Ignores the requested offset and sends everything.
    pub fn ignoring_offset(bytes: &[u8]) -> Self {
        Script::Body {
            chunks: vec![bytes.to_vec()],
            fail_at_end: false,
            honored: false,
        }
    }

    /// Returns the script and the writer that feeds it.
    pub fn pipe() -> (Self, DuplexStream) {
        let (writer, reader) = core_async::io::duplex(64 * 1024);
        (
            Script::Pipe {
                reader,
                honored: true,
            },
            writer,
        )
    }

    pub fn http(status: u16) -> Self {
        Script::Error(BridgeError::Http {
            status,
            message: format!("HTTP {status}"),
        })
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// Answers fetches from per-track scripts and records every request.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedFetcher {
    pub fn push(&self, track_id: &str, script: Script) {
        self.scripts
            .lock()
            .entry(track_id.to_string())
            .or_default()
            .push_back(script);
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }

    pub fn offsets(&self, track_id: &str) -> Vec<u64> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.track_id == track_id)
            .map(|r| r.offset)
            .collect()
    }

    pub fn fetch_count(&self, track_id: &str) -> usize {
        self.offsets(track_id).len()
    }

    /// Track ids in the order they were fetched.
    pub fn order(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| r.track_id.clone())
            .collect()
    }
}

#[async_trait]
impl MediaFetcher for ScriptedFetcher {
    async fn fetch(&self, request: FetchRequest) -> BridgeResult<FetchResponse> {
        self.requests.lock().push(request.clone());

        let script = self
            .scripts
            .lock()
            .get_mut(&request.track_id)
            .and_then(|queue| queue.pop_front());

        match script {
            Some(Script::Body {
                chunks,
                fail_at_end,
                honored,
            }) => {
                let stream = ScriptedStream {
                    chunks: chunks.into(),
                    fail_at_end,
                };
                Ok(FetchResponse::new(Box::new(stream), honored))
            }
            Some(Script::Pipe { reader, honored }) => {
                Ok(FetchResponse::new(Box::new(reader), honored))
            }
            Some(Script::Error(e)) => Err(e),
            None => Err(BridgeError::OperationFailed(format!(
                "no script for {}",
                request.track_id
            ))),
        }
    }
}

#[derive(Default)]
pub struct RecordingIndex {
    registered: Mutex<HashSet<PathBuf>>,
    forgotten: Mutex<Vec<PathBuf>>,
}

impl RecordingIndex {
    pub fn is_registered(&self, path: &Path) -> bool {
        self.registered.lock().contains(path)
    }

    pub fn forgotten(&self) -> Vec<PathBuf> {
        self.forgotten.lock().clone()
    }
}

impl MediaIndex for RecordingIndex {
    fn register(&self, path: &Path) -> BridgeResult<()> {
        self.registered.lock().insert(path.to_path_buf());
        Ok(())
    }

    fn forget(&self, path: &Path) -> BridgeResult<()> {
        self.registered.lock().remove(path);
        self.forgotten.lock().push(path.to_path_buf());
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingReclaimer {
    calls: AtomicUsize,
    protected: Mutex<Vec<Vec<PathBuf>>>,
}

impl CountingReclaimer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Protected paths passed to the most recent pass.
    pub fn last_protected(&self) -> Vec<PathBuf> {
        self.protected.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CacheReclaimer for CountingReclaimer {
    async fn reclaim(&self, protected: &[PathBuf]) -> BridgeResult<ReclaimReport> {
        self.protected.lock().push(protected.to_vec());
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ReclaimReport::default())
    }
}

#[derive(Default)]
pub struct CountingLeases {
    held: Arc<Mutex<HashMap<LeaseKind, usize>>>,
    acquired: AtomicUsize,
}

struct CountingLease {
    kind: LeaseKind,
    held: Arc<Mutex<HashMap<LeaseKind, usize>>>,
    released: bool,
}

impl ResourceLease for CountingLease {
    fn kind(&self) -> LeaseKind {
        self.kind
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            *self.held.lock().entry(self.kind).or_default() -= 1;
        }
    }
}

impl CountingLeases {
    pub fn held(&self, kind: LeaseKind) -> usize {
        self.held.lock().get(&kind).copied().unwrap_or(0)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

impl LeaseProvider for CountingLeases {
    fn acquire(&self, kind: LeaseKind, _tag: &str) -> BridgeResult<Box<dyn ResourceLease>> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        *self.held.lock().entry(kind).or_default() += 1;
        Ok(Box::new(CountingLease {
            kind,
            held: Arc::clone(&self.held),
            released: false,
        }))
    }
}

#[derive(Default)]
pub struct RecordingArtwork {
    requested: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingArtwork {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl ArtworkFetcher for RecordingArtwork {
    async fn cache_cover_art(&self, cover_art_id: &str) -> BridgeResult<()> {
        self.requested.lock().push(cover_art_id.to_string());
        if self.fail {
            Err(BridgeError::OperationFailed("artwork server down".to_string()))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub dir: TempDir,
    pub fetcher: Arc<ScriptedFetcher>,
    pub index: Arc<RecordingIndex>,
    pub reclaimer: Arc<CountingReclaimer>,
    pub leases: Arc<CountingLeases>,
    pub artwork: Arc<RecordingArtwork>,
    pub core: CoreConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_artwork(RecordingArtwork::default())
    }

    pub fn with_artwork(artwork: RecordingArtwork) -> Self {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let index = Arc::new(RecordingIndex::default());
        let reclaimer = Arc::new(CountingReclaimer::default());
        let leases = Arc::new(CountingLeases::default());
        let artwork = Arc::new(artwork);

        let core = CoreConfig::builder()
            .download_root(dir.path())
            .media_fetcher(fetcher.clone())
            .media_index(index.clone())
            .cache_reclaimer(reclaimer.clone())
            .lease_provider(leases.clone())
            .artwork_fetcher(artwork.clone())
            .build()
            .unwrap();

        Self {
            dir,
            fetcher,
            index,
            reclaimer,
            leases,
            artwork,
            core,
        }
    }

    pub fn context(&self, config: DownloadConfig) -> Arc<TransferContext> {
        Arc::new(TransferContext::new(&self.core, config))
    }

    pub fn item(&self, track: Track, pinned: bool) -> Arc<DownloadItem> {
        self.item_with(track, pinned, DownloadConfig::default())
    }

    pub fn item_with(
        &self,
        track: Track,
        pinned: bool,
        config: DownloadConfig,
    ) -> Arc<DownloadItem> {
        DownloadItem::new(track, Quality::ORIGINAL, pinned, 100, self.context(config))
    }

    pub fn queue(&self, config: DownloadConfig) -> DownloadQueue {
        DownloadQueue::new(&self.core, config).unwrap()
    }
}

pub fn track(id: &str) -> Track {
    Track::new(id, "mp3")
        .with_title(format!("Song {id}"))
        .with_path(format!("Artist/Album/{id}.mp3"))
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub async fn wait_until<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = core_async::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if core_async::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        core_async::sleep(Duration::from_millis(5)).await;
    }
}
