use bridge_traits::{error::Result, media::MediaIndex};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// In-memory [`MediaIndex`] for desktop hosts.
///
/// Desktop file managers see pinned files directly, so registration only
/// records which paths are currently exposed.
#[derive(Debug, Default)]
pub struct DesktopMediaIndex {
    registered: Mutex<HashSet<PathBuf>>,
}

impl DesktopMediaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self, path: &Path) -> bool {
        self.registered.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.registered.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MediaIndex for DesktopMediaIndex {
    fn register(&self, path: &Path) -> Result<()> {
        if self.registered.lock().insert(path.to_path_buf()) {
            debug!(path = ?path, "Registered pinned media");
        }
        Ok(())
    }

    fn forget(&self, path: &Path) -> Result<()> {
        if self.registered.lock().remove(path) {
            debug!(path = ?path, "Forgot media");
        }
        Ok(())
    }
}
