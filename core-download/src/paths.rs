//! On-disk layout of a track's artifacts.
//!
//! Every track maps to three files in the same directory:
//!
//! - *save*: `<root>/<relative path>`, the pinned copy
//! - *complete*: `<stem>.complete.<ext>`, an evictable cache copy
//! - *partial*: `<stem>.partial.<ext>`, bytes of an unfinished transfer
//!
//! The mapping only depends on the download root and the track, so a partial
//! left behind by a previous process is picked up again after a restart.

use crate::track::Track;
use std::path::{Component, Path, PathBuf};

const PARTIAL_MARKER: &str = "partial";
const COMPLETE_MARKER: &str = "complete";

/// The three artifact locations of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    partial: PathBuf,
    complete: PathBuf,
    save: PathBuf,
}

impl ArtifactPaths {
    /// Derives the layout for `track` under `root`.
    pub fn for_track(root: &Path, track: &Track) -> Self {
        let relative = track
            .path
            .as_deref()
            .and_then(sanitize_relative)
            .or_else(|| sanitize_relative(&fallback_name(track)))
            .unwrap_or_else(|| PathBuf::from(sanitize_component(&track.id)));

        let save = root.join(relative);
        let partial = sibling_with_marker(&save, PARTIAL_MARKER);
        let complete = sibling_with_marker(&save, COMPLETE_MARKER);

        Self {
            partial,
            complete,
            save,
        }
    }

    pub fn partial(&self) -> &Path {
        &self.partial
    }

    pub fn complete(&self) -> &Path {
        &self.complete
    }

    pub fn save(&self) -> &Path {
        &self.save
    }

    /// Directory holding all three artifacts.
    pub fn parent(&self) -> Option<&Path> {
        self.save.parent()
    }

    /// All artifacts, in partial, complete, save order.
    pub fn all(&self) -> [&Path; 3] {
        [&self.partial, &self.complete, &self.save]
    }
}

fn fallback_name(track: &Track) -> String {
    if track.suffix.is_empty() {
        track.id.clone()
    } else {
        format!("{}.{}", track.id, track.suffix)
    }
}

/// Keeps the path relative and inside the root.
fn sanitize_relative(raw: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(raw).components() {
        if let Component::Normal(part) = component {
            let part = sanitize_component(&part.to_string_lossy());
            if !part.is_empty() {
                out.push(part);
            }
        }
    }

    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn sibling_with_marker(save: &Path, marker: &str) -> PathBuf {
    let stem = save
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match save.extension() {
        Some(ext) => format!("{stem}.{marker}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{marker}"),
    };

    save.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_track_path() {
        let track = Track::new("tr-1", "mp3").with_path("Artist/Album/01 - Song.mp3");
        let paths = ArtifactPaths::for_track(Path::new("/music"), &track);

        assert_eq!(paths.save(), Path::new("/music/Artist/Album/01 - Song.mp3"));
        assert_eq!(
            paths.complete(),
            Path::new("/music/Artist/Album/01 - Song.complete.mp3")
        );
        assert_eq!(
            paths.partial(),
            Path::new("/music/Artist/Album/01 - Song.partial.mp3")
        );
        assert_eq!(paths.parent(), Some(Path::new("/music/Artist/Album")));
    }

    #[test]
    fn test_layout_falls_back_to_id() {
        let track = Track::new("tr-42", "flac");
        let paths = ArtifactPaths::for_track(Path::new("/music"), &track);

        assert_eq!(paths.save(), Path::new("/music/tr-42.flac"));
        assert_eq!(paths.partial(), Path::new("/music/tr-42.partial.flac"));
    }

    #[test]
    fn test_layout_without_extension() {
        let track = Track::new("tr-7", "");
        let paths = ArtifactPaths::for_track(Path::new("/music"), &track);

        assert_eq!(paths.save(), Path::new("/music/tr-7"));
        assert_eq!(paths.complete(), Path::new("/music/tr-7.complete"));
        assert_eq!(paths.partial(), Path::new("/music/tr-7.partial"));
    }

    #[test]
    fn test_escaping_paths_are_contained() {
        let track = Track::new("tr-1", "mp3").with_path("../../etc/Al?bum/song.mp3");
        let paths = ArtifactPaths::for_track(Path::new("/music"), &track);

        assert_eq!(paths.save(), Path::new("/music/etc/Al_bum/song.mp3"));
        for path in paths.all() {
            assert!(path.starts_with("/music"));
        }
    }

    #[test]
    fn test_empty_track_path_uses_id() {
        let track = Track::new("tr-9", "ogg").with_path("..");
        let paths = ArtifactPaths::for_track(Path::new("/music"), &track);
        assert_eq!(paths.save(), Path::new("/music/tr-9.ogg"));
    }

    #[test]
    fn test_layout_is_stable() {
        let track = Track::new("tr-1", "mp3").with_path("a/b.mp3");
        let root = Path::new("/music");
        assert_eq!(
            ArtifactPaths::for_track(root, &track),
            ArtifactPaths::for_track(root, &track)
        );
    }
}
