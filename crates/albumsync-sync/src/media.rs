//! On-disk media detection
//!
//! Decides which folders are worth an album: a folder qualifies only when
//! its subtree holds at least one photo or video. Scans are plain blocking
//! `std::fs` walks; async callers run them on the blocking pool.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// File extensions (lowercase) counted as media
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "heic", "heif", "arw", "cr2", "cr3", "nef",
    "dng", "rw2", "orf", "raf", "srw", "pef", "mp4", "m4v", "mov", "mkv", "avi", "wmv", "mpg",
    "mpeg", "mts", "m2ts", "3gp", "3g2", "webm",
];

/// Directory names (lowercase) never scanned or turned into albums
pub const RESERVED_NAMES: &[&str] = &[
    "@eadir",
    "#snapshot",
    "@tmp",
    ".ds_store",
    "synologyphotos",
    "screenshots",
];

/// Outcome class of a media scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// At least one qualifying folder was found
    Ok,
    /// The directory exists but holds no media
    Empty,
    /// The directory does not exist
    Missing,
    /// The directory could not be read
    Error,
}

/// Folders below a scan root that should become albums
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaScan {
    /// Absolute paths, sorted
    pub folders: Vec<PathBuf>,
    pub state: ScanState,
}

/// Whether `name` must be skipped: reserved names and dot-names
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with('.') || RESERVED_NAMES.contains(&name.to_lowercase().as_str())
}

/// Whether `path` has a media file extension
pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Subdirectories of `dir` worth scanning, sorted by name
///
/// Symlinks are not followed, so a link back up the tree cannot loop.
/// Entries that cannot be inspected are skipped; only failing to list
/// `dir` itself is an error.
fn scan_subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(dir = %dir.display(), error = %err, "Skipping unreadable entry");
                continue;
            }
        };
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if is_reserved_name(name) {
            continue;
        }
        match entry.file_type() {
            Ok(kind) if kind.is_dir() => dirs.push(entry.path()),
            Ok(_) => {}
            Err(err) => debug!(path = %entry.path().display(), error = %err, "Skipping entry"),
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Whether `dir` holds a media file directly (not in subfolders)
pub fn has_direct_media(dir: &Path) -> io::Result<bool> {
    for entry in fs::read_dir(dir)?.flatten() {
        let is_file = entry.file_type().map(|kind| kind.is_file()).unwrap_or(false);
        if is_file && is_media_file(&entry.path()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Whether `dir` or any folder below it holds a media file
///
/// Fails only when `dir` itself cannot be read; unreadable subfolders are
/// logged and skipped.
pub fn contains_media(dir: &Path) -> io::Result<bool> {
    if has_direct_media(dir)? {
        return Ok(true);
    }
    let mut stack = scan_subdirs(dir)?;
    while let Some(current) = stack.pop() {
        match has_direct_media(&current) {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(err) => {
                warn!(dir = %current.display(), error = %err, "Skipping unreadable folder");
                continue;
            }
        }
        match scan_subdirs(&current) {
            Ok(children) => stack.extend(children),
            Err(err) => warn!(dir = %current.display(), error = %err, "Skipping unreadable folder"),
        }
    }
    Ok(false)
}

/// Finds the folders below `root` that should become albums
///
/// A direct child qualifies when its subtree holds media. It becomes an
/// album folder when it holds media itself or sits at `max_depth`;
/// otherwise the walk descends into it and applies the same rule one level
/// deeper. Depth 1 is a direct child of `root`; `None` means unbounded.
///
/// The scan is [`ScanState::Error`] only when `root` itself cannot be
/// listed. Unreadable folders below it are skipped.
pub fn media_folders(root: &Path, max_depth: Option<usize>) -> MediaScan {
    if !root.is_dir() {
        return MediaScan {
            folders: Vec::new(),
            state: ScanState::Missing,
        };
    }

    let mut folders = Vec::new();
    match collect(root, 1, max_depth, &mut folders) {
        Ok(()) if folders.is_empty() => MediaScan {
            folders,
            state: ScanState::Empty,
        },
        Ok(()) => MediaScan {
            folders,
            state: ScanState::Ok,
        },
        Err(err) => {
            warn!(root = %root.display(), error = %err, "Media scan failed");
            MediaScan {
                folders: Vec::new(),
                state: ScanState::Error,
            }
        }
    }
}

fn collect(
    dir: &Path,
    depth: usize,
    max_depth: Option<usize>,
    out: &mut Vec<PathBuf>,
) -> io::Result<()> {
    for child in scan_subdirs(dir)? {
        let qualifies = contains_media(&child).and_then(|found| {
            if !found {
                return Ok(None);
            }
            Ok(Some(max_depth == Some(depth) || has_direct_media(&child)?))
        });
        let result = match qualifies {
            Ok(None) => Ok(()),
            Ok(Some(true)) => {
                out.push(child.clone());
                Ok(())
            }
            Ok(Some(false)) => collect(&child, depth + 1, max_depth, out),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            warn!(dir = %child.display(), error = %err, "Skipping unreadable folder");
        }
    }
    Ok(())
}
