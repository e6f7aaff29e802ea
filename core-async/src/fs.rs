//! Async filesystem helpers re-exported from the underlying runtime.

pub use tokio::fs::{
    copy, create_dir_all, metadata, read, read_dir, remove_file, rename, write, DirEntry, File,
    OpenOptions,
};

use std::io;
use std::path::Path;

/// Length of the file at `path`, or `0` when it does not exist.
pub async fn len_or_zero(path: &Path) -> io::Result<u64> {
    match metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

/// Removes a file, treating "already gone" as success.
///
/// Returns `true` when a file was actually removed.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
