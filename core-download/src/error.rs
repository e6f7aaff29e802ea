//! # Download Error Types

use bridge_traits::BridgeError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that end a transfer attempt.
///
/// These never escape the transfer engine: they are recorded on the item
/// (`is_failed`, retry budget) and published as events.
#[derive(Error, Debug)]
pub enum DownloadError {
    // ========================================================================
    // Transfer Errors
    // ========================================================================
    /// The media fetcher could not open a stream.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] BridgeError),

    /// Reading the stream or writing the partial artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No bytes arrived within the stall timeout.
    #[error("Stream stalled for {0:?}")]
    Stalled(Duration),

    // ========================================================================
    // Artifact Errors
    // ========================================================================
    /// Promoting an artifact failed.
    #[error("Failed to rename {from:?} to {to:?}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // Control
    // ========================================================================
    #[error("Invalid download configuration: {0}")]
    Config(String),

    /// The attempt observed its cancellation token. Not a failure.
    #[error("Download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Returns `true` if another attempt may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::Fetch(e) => e.is_transient(),
            DownloadError::Io(_) | DownloadError::Stalled(_) | DownloadError::Rename { .. } => true,
            DownloadError::Config(_) | DownloadError::Cancelled => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled)
    }
}

/// Result type for download operations.
pub type Result<T> = std::result::Result<T, DownloadError>;
