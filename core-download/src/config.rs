//! Download configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry budget every new item starts with.
pub const MAX_RETRIES: u32 = 5;

/// Priority assigned when the caller does not pick one. Lower runs sooner.
pub const DEFAULT_PRIORITY: u32 = 100;

/// Target bitrate for transcoded downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Quality {
    max_bitrate: u32,
}

impl Quality {
    /// The original file, no transcoding.
    pub const ORIGINAL: Quality = Quality { max_bitrate: 0 };

    pub fn kbps(max_bitrate: u32) -> Self {
        Self { max_bitrate }
    }

    /// Bitrate cap in kbps; `0` means original.
    pub fn max_bitrate(&self) -> u32 {
        self.max_bitrate
    }

    pub fn is_original(&self) -> bool {
        self.max_bitrate == 0
    }
}

/// Configuration for the download queue and its transfer engines.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Transfer engines allowed to run at once (default: 3)
    pub max_concurrent_downloads: usize,

    /// Retry budget for new items (default: 5)
    pub max_retries: u32,

    /// Bytes read from the stream per chunk (default: 8 KiB)
    pub chunk_size: usize,

    /// Longest wait for the next chunk before the attempt fails (default: 60s)
    pub stall_timeout: Option<Duration>,

    /// Hold a keep-awake lease during transfers (default: false)
    pub keep_awake: bool,

    /// Quality requested for new items
    pub default_quality: Quality,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 3,
            max_retries: MAX_RETRIES,
            chunk_size: 8 * 1024,
            stall_timeout: Some(Duration::from_secs(60)),
            keep_awake: false,
            default_quality: Quality::ORIGINAL,
        }
    }
}

impl DownloadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent_downloads(mut self, count: usize) -> Self {
        self.max_concurrent_downloads = count;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// `None` disables stall detection.
    pub fn with_stall_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stall_timeout = timeout;
        self
    }

    pub fn with_keep_awake(mut self, enabled: bool) -> Self {
        self.keep_awake = enabled;
        self
    }

    pub fn with_default_quality(mut self, quality: Quality) -> Self {
        self.default_quality = quality;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_downloads == 0 {
            return Err("max_concurrent_downloads must be at least 1".to_string());
        }

        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }

        if self.stall_timeout == Some(Duration::ZERO) {
            return Err("stall_timeout must be positive; use None to disable it".to_string());
        }

        Ok(())
    }
}
