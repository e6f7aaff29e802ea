//! Remote media byte source.
//!
//! The transfer engine asks a [`MediaFetcher`] for the bytes of one track,
//! starting at a byte offset and at a desired quality. The fetcher answers
//! with a stream and tells the engine whether the offset was honoured. When it
//! was not (the server ignored the range and restarted at zero), the engine
//! rewrites its partial artifact from scratch.

use async_trait::async_trait;
use core_async::io::DynAsyncRead;
use std::fmt;

use crate::error::Result;

/// Parameters for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Server-side identifier of the track.
    pub track_id: String,
    /// First byte the caller still needs.
    pub offset: u64,
    /// Maximum bitrate in kbps; `0` requests the original file.
    pub max_bitrate: u32,
    /// Whether the download is going to be pinned. Some servers serve the
    /// original file for permanent copies even when transcoding is enabled.
    pub pinned: bool,
}

impl FetchRequest {
    pub fn new(track_id: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            offset: 0,
            max_bitrate: 0,
            pinned: false,
        }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_max_bitrate(mut self, max_bitrate: u32) -> Self {
        self.max_bitrate = max_bitrate;
        self
    }

    pub fn with_pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }
}

/// Result of a fetch: the byte stream plus resumption metadata.
pub struct FetchResponse {
    /// Body bytes, starting at the requested offset when `offset_honored`,
    /// otherwise at byte zero.
    pub stream: Box<DynAsyncRead>,
    /// `true` when the stream starts at the requested offset.
    pub offset_honored: bool,
    /// Number of bytes the stream will yield, when the remote reported it.
    pub content_length: Option<u64>,
}

impl FetchResponse {
    pub fn new(stream: Box<DynAsyncRead>, offset_honored: bool) -> Self {
        Self {
            stream,
            offset_honored,
            content_length: None,
        }
    }

    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("offset_honored", &self.offset_honored)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Remote capability that yields track bytes.
///
/// Implementations should honour `offset` whenever the remote supports range
/// requests. Errors are treated by the engine as transient transfer failures.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::fetch::{FetchRequest, MediaFetcher};
///
/// async fn first_bytes(fetcher: &dyn MediaFetcher) -> bridge_traits::error::Result<bool> {
///     let response = fetcher
///         .fetch(FetchRequest::new("tr-42").with_offset(4096).with_max_bitrate(192))
///         .await?;
///     Ok(response.offset_honored)
/// }
/// ```
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Opens a byte stream for `request.track_id` starting at `request.offset`.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}
