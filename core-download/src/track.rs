use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identity and metadata of a remote track.
///
/// Only what the download core needs: how to name its files, how big it is,
/// and which cover art belongs to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Server-side identifier; unique within the working set.
    pub id: String,
    pub title: String,
    /// File extension of the downloaded format (e.g. `mp3`).
    pub suffix: String,
    /// Total size in bytes, when the server reports it.
    pub size: Option<u64>,
    pub duration: Option<Duration>,
    /// Bitrate in kbps of the stored file.
    pub bitrate: Option<u32>,
    /// Relative storage path (`Artist/Album/01 - Title.mp3`), if known.
    pub path: Option<String>,
    pub cover_art: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            suffix: suffix.into(),
            size: None,
            duration: None,
            bitrate: None,
            path: None,
            cover_art: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, bytes: u64) -> Self {
        self.size = Some(bytes);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_bitrate(mut self, kbps: u32) -> Self {
        self.bitrate = Some(kbps);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_cover_art(mut self, cover_art: impl Into<String>) -> Self {
        self.cover_art = Some(cover_art.into());
        self
    }

    /// Title for logs; falls back to the id.
    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}
