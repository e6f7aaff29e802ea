//! # Event Bus System
//!
//! Broadcasts download lifecycle events to any number of observers using
//! `tokio::sync::broadcast` (through `core_async::sync`).
//!
//! ## Overview
//!
//! - **Event Types**: [`CoreEvent`] wraps per-domain enums ([`DownloadEvent`], [`CacheEvent`])
//! - **EventBus**: cloneable broadcast sender
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! ```text
//! ┌──────────────┐   emit    ┌──────────┐   subscribe   ┌────────────┐
//! │ DownloadItem ├──────────>│          ├──────────────>│ UI / Host  │
//! └──────────────┘           │ EventBus │               └────────────┘
//! ┌──────────────┐   emit    │          │   subscribe   ┌────────────┐
//! │ DownloadQueue├──────────>│          ├──────────────>│ Telemetry  │
//! └──────────────┘           └──────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, DownloadEvent, EventBus};
//!
//! let bus = EventBus::new(100);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Download(DownloadEvent::Saved {
//!     track_id: "tr-1".to_string(),
//!     path: "/music/a.mp3".to_string(),
//! }))
//! .ok();
//! assert!(rx.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it may keep receiving.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Emitting with no subscribers returns an error. Publishers in the core
//! ignore it; nobody listening is not a failure.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Progress events are frequent; subscribers that cannot keep up receive
/// `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Per-item download lifecycle
    Download(DownloadEvent),
    /// Cache maintenance
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Download(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Download(DownloadEvent::Failed {
                retries_left: 0, ..
            }) => EventSeverity::Error,
            CoreEvent::Download(DownloadEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Download(DownloadEvent::Completed { .. })
            | CoreEvent::Download(DownloadEvent::Saved { .. })
            | CoreEvent::Cache(CacheEvent::Reclaimed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Track the event refers to, when it refers to one.
    pub fn track_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Download(e) => Some(e.track_id()),
            CoreEvent::Cache(_) => None,
        }
    }
}

impl From<DownloadEvent> for CoreEvent {
    fn from(event: DownloadEvent) -> Self {
        CoreEvent::Download(event)
    }
}

impl From<CacheEvent> for CoreEvent {
    fn from(event: CacheEvent) -> Self {
        CoreEvent::Cache(event)
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Download Events
// ============================================================================

/// Which finished artifact a rename targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RenameTarget {
    Save,
    Complete,
}

/// Events emitted by download items and the download queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    /// Item entered the working set.
    Queued {
        track_id: String,
        priority: u32,
        pinned: bool,
    },
    /// A transfer attempt started.
    Started {
        track_id: String,
        /// Bytes already present in the partial artifact.
        resume_offset: u64,
        /// Retry budget left when the attempt began.
        retries_left: u32,
    },
    /// Progress update, 0-100.
    Progress { track_id: String, percent: u8 },
    /// Finished copy is available as an evictable cache entry.
    Completed { track_id: String, path: String },
    /// Finished copy is pinned.
    Saved { track_id: String, path: String },
    /// Promotion postponed because the item is being played.
    RenameDeferred {
        track_id: String,
        target: RenameTarget,
    },
    /// A postponed promotion was applied.
    RenameApplied {
        track_id: String,
        target: RenameTarget,
        path: String,
    },
    /// Attempt failed.
    Failed {
        track_id: String,
        message: String,
        retries_left: u32,
    },
    /// Attempt cancelled cooperatively; partial bytes were retained.
    Cancelled {
        track_id: String,
        bytes_retained: u64,
    },
    /// Item removed and its artifacts deleted.
    Removed { track_id: String },
}

impl DownloadEvent {
    fn description(&self) -> &str {
        match self {
            DownloadEvent::Queued { .. } => "Download queued",
            DownloadEvent::Started { .. } => "Download started",
            DownloadEvent::Progress { .. } => "Download progress",
            DownloadEvent::Completed { .. } => "Download completed",
            DownloadEvent::Saved { .. } => "Download saved",
            DownloadEvent::RenameDeferred { .. } => "Rename deferred while playing",
            DownloadEvent::RenameApplied { .. } => "Deferred rename applied",
            DownloadEvent::Failed { .. } => "Download failed",
            DownloadEvent::Cancelled { .. } => "Download cancelled",
            DownloadEvent::Removed { .. } => "Download removed",
        }
    }

    pub fn track_id(&self) -> &str {
        match self {
            DownloadEvent::Queued { track_id, .. }
            | DownloadEvent::Started { track_id, .. }
            | DownloadEvent::Progress { track_id, .. }
            | DownloadEvent::Completed { track_id, .. }
            | DownloadEvent::Saved { track_id, .. }
            | DownloadEvent::RenameDeferred { track_id, .. }
            | DownloadEvent::RenameApplied { track_id, .. }
            | DownloadEvent::Failed { track_id, .. }
            | DownloadEvent::Cancelled { track_id, .. }
            | DownloadEvent::Removed { track_id } => track_id,
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A reclaim pass removed evictable artifacts.
    Reclaimed { files_removed: usize, bytes_freed: u64 },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Reclaimed { .. } => "Cache space reclaimed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for core events.
///
/// Cloning is cheap; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus that buffers up to `capacity` events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it, or an error when
    /// nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a receiver for all future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let stream = EventStream::new(bus.subscribe())
///     .filter(|event| event.track_id() == Some("tr-1"));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` when the subscriber fell behind by `n` events,
    /// `RecvError::Closed` when all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(track_id: &str, percent: u8) -> CoreEvent {
        CoreEvent::Download(DownloadEvent::Progress {
            track_id: track_id.to_string(),
            percent,
        })
    }

    #[test]
    fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(progress("t", 1)).is_err());
    }

    #[core_async::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Download(DownloadEvent::Queued {
            track_id: "tr-1".to_string(),
            priority: 100,
            pinned: true,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[core_async::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| event.track_id() == Some("wanted"));

        bus.emit(progress("other", 10)).ok();
        bus.emit(CoreEvent::Cache(CacheEvent::Reclaimed {
            files_removed: 1,
            bytes_freed: 10,
        }))
        .ok();
        bus.emit(progress("wanted", 20)).ok();

        assert_eq!(stream.recv().await.unwrap(), progress("wanted", 20));
        assert!(stream.try_recv().is_none());
    }

    #[core_async::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(progress("t", i * 20)).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let exhausted = CoreEvent::Download(DownloadEvent::Failed {
            track_id: "t".to_string(),
            message: "connection reset".to_string(),
            retries_left: 0,
        });
        assert_eq!(exhausted.severity(), EventSeverity::Error);

        let retryable = CoreEvent::Download(DownloadEvent::Failed {
            track_id: "t".to_string(),
            message: "connection reset".to_string(),
            retries_left: 3,
        });
        assert_eq!(retryable.severity(), EventSeverity::Warning);

        let saved = CoreEvent::Download(DownloadEvent::Saved {
            track_id: "t".to_string(),
            path: "/x".to_string(),
        });
        assert_eq!(saved.severity(), EventSeverity::Info);
        assert_eq!(progress("t", 5).severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description() {
        let event = CoreEvent::Download(DownloadEvent::RenameDeferred {
            track_id: "t".to_string(),
            target: RenameTarget::Save,
        });
        assert_eq!(event.description(), "Rename deferred while playing");
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Download(DownloadEvent::RenameApplied {
            track_id: "tr-9".to_string(),
            target: RenameTarget::Complete,
            path: "/music/x.complete.mp3".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Download\""));
        assert!(json.contains("\"event\":\"RenameApplied\""));
        assert!(json.contains("\"target\":\"complete\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[core_async::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let handles: Vec<_> = (0..2)
            .map(|n| {
                let bus = bus.clone();
                core_async::spawn(async move {
                    for i in 0..10 {
                        bus.emit(progress(&format!("t{n}"), i)).ok();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }
}
