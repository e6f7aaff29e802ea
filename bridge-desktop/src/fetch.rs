//! HTTP media fetcher using reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    fetch::{FetchRequest, FetchResponse, MediaFetcher},
};
use futures_util::TryStreamExt;
use reqwest::{header, Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

/// Turns a fetch request into the stream URL of the remote server.
pub type StreamUrlBuilder = Arc<dyn Fn(&FetchRequest) -> String + Send + Sync>;

/// Reqwest-based [`MediaFetcher`].
///
/// Resumes with `Range: bytes=<offset>-` and reports the offset as honoured
/// only when the server answers `206 Partial Content`. The body is streamed,
/// never buffered.
///
/// No overall request timeout is set: a download may legitimately take
/// minutes. Stalls are detected by the transfer engine per read.
pub struct HttpMediaFetcher {
    client: Client,
    url_builder: StreamUrlBuilder,
}

impl HttpMediaFetcher {
    pub fn new<F>(url_builder: F) -> Result<Self>
    where
        F: Fn(&FetchRequest) -> String + Send + Sync + 'static,
    {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .user_agent(concat!("offline-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {e}")))?;

        Ok(Self::with_client(client, url_builder))
    }

    pub fn with_client<F>(client: Client, url_builder: F) -> Self
    where
        F: Fn(&FetchRequest) -> String + Send + Sync + 'static,
    {
        Self {
            client,
            url_builder: Arc::new(url_builder),
        }
    }

    fn range_header(offset: u64) -> Option<String> {
        (offset > 0).then(|| format!("bytes={offset}-"))
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let url = (self.url_builder)(&request);
        let mut builder = self.client.get(&url);
        if let Some(range) = Self::range_header(request.offset) {
            builder = builder.header(header::RANGE, range);
        }

        debug!(track_id = %request.track_id, offset = request.offset, "Opening media stream");

        let response = builder.send().await.map_err(|e| {
            warn!(track_id = %request.track_id, error = %e, "Media request failed");
            if e.is_connect() {
                BridgeError::OperationFailed(format!("Connection failed: {}", e))
            } else {
                BridgeError::OperationFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Http {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let offset_honored = status == StatusCode::PARTIAL_CONTENT;
        if request.offset > 0 && !offset_honored {
            debug!(track_id = %request.track_id, "Server ignored range, restarting from zero");
        }

        let content_length = response.content_length();
        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let mut fetched = FetchResponse::new(Box::new(StreamReader::new(stream)), offset_honored);
        if let Some(length) = content_length {
            fetched = fetched.with_content_length(length);
        }

        Ok(fetched)
    }
}
