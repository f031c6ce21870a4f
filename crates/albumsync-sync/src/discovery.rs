//! Qualifying child enumeration
//!
//! Shared roots are enumerated from the folder index: the bind mount makes
//! every child visible to the indexer, so the index is the source of truth.
//! Personal roots are walked on disk first; a folder qualifies only when it
//! holds media and is already present in the folder index snapshot.

use std::path::{Path, PathBuf};

use albumsync_core::domain::{FolderId, IndexPath, PersonalRoot, Root, SharedRoot};
use tracing::{debug, warn};

use crate::folder_index::FolderIndexSnapshot;
use crate::media::{self, MediaScan, ScanState};

/// A child folder that should carry a condition album
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedChild {
    pub folder_id: FolderId,
    /// Folder name, used to derive the album name
    pub name: String,
    pub path: IndexPath,
}

/// Result of enumerating one root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildSet {
    pub children: Vec<QualifiedChild>,
    /// Media folders found on disk that the index has not picked up yet
    pub unindexed: Vec<IndexPath>,
}

/// Capability shared by every root kind: list the children that should
/// carry an album
///
/// `Err` carries the reason the whole root was skipped.
#[async_trait::async_trait]
pub trait EnumerateChildren: Send + Sync {
    async fn enumerate_children(
        &self,
        snapshot: &FolderIndexSnapshot,
        root_folder: FolderId,
    ) -> Result<ChildSet, String>;
}

#[async_trait::async_trait]
impl EnumerateChildren for SharedRoot {
    async fn enumerate_children(
        &self,
        snapshot: &FolderIndexSnapshot,
        root_folder: FolderId,
    ) -> Result<ChildSet, String> {
        let children = snapshot
            .children_of(root_folder)
            .iter()
            .filter_map(|id| snapshot.entry(*id))
            .filter(|entry| !media::is_reserved_name(entry.name()))
            .map(|entry| QualifiedChild {
                folder_id: entry.id,
                name: entry.name().to_string(),
                path: entry.path.clone(),
            })
            .collect();

        Ok(ChildSet {
            children,
            unindexed: Vec::new(),
        })
    }
}

#[async_trait::async_trait]
impl EnumerateChildren for PersonalRoot {
    async fn enumerate_children(
        &self,
        snapshot: &FolderIndexSnapshot,
        _root_folder: FolderId,
    ) -> Result<ChildSet, String> {
        let scan = scan_on_blocking_pool(self.path.clone(), self.max_scan_depth).await;
        match scan.state {
            ScanState::Missing => {
                return Err(format!("{} does not exist on disk", self.path.display()))
            }
            ScanState::Error => {
                return Err(format!("{} could not be scanned", self.path.display()))
            }
            ScanState::Empty => {
                debug!(root = %self.index_path, "No media folders on disk");
                return Ok(ChildSet::default());
            }
            ScanState::Ok => {}
        }

        let mut set = ChildSet::default();
        for folder in &scan.folders {
            let Some(path) = virtual_path(&self.path, &self.index_path, folder) else {
                continue;
            };
            match snapshot.lookup(&path) {
                Some(folder_id) => set.children.push(QualifiedChild {
                    folder_id,
                    name: path.file_name().unwrap_or_default().to_string(),
                    path,
                }),
                None => set.unindexed.push(path),
            }
        }

        if !set.unindexed.is_empty() {
            warn!(
                root = %self.index_path,
                count = set.unindexed.len(),
                first = %set.unindexed[0],
                "Media folders not indexed yet"
            );
        }
        Ok(set)
    }
}

#[async_trait::async_trait]
impl EnumerateChildren for Root {
    async fn enumerate_children(
        &self,
        snapshot: &FolderIndexSnapshot,
        root_folder: FolderId,
    ) -> Result<ChildSet, String> {
        match self {
            Root::Shared(root) => root.enumerate_children(snapshot, root_folder).await,
            Root::Personal(root) => root.enumerate_children(snapshot, root_folder).await,
        }
    }
}

// ============================================================================
// Index wait targets
// ============================================================================

/// Paths the index waiter should see before albums are reconciled
///
/// Each root contributes its own path plus its media folders found on
/// disk. A root whose scan failed contributes only its own path; an empty
/// or missing root contributes nothing.
pub async fn wait_targets(roots: &[Root]) -> Vec<IndexPath> {
    let mut targets = Vec::new();
    for root in roots {
        let (disk_root, index_root) = match root {
            Root::Shared(shared) => (shared.source.clone(), &shared.index_path),
            Root::Personal(personal) => (personal.path.clone(), &personal.index_path),
        };
        let scan = scan_on_blocking_pool(disk_root.clone(), root.max_scan_depth()).await;
        match scan.state {
            ScanState::Ok => {
                targets.push(index_root.clone());
                targets.extend(
                    scan.folders
                        .iter()
                        .filter_map(|folder| virtual_path(&disk_root, index_root, folder)),
                );
            }
            ScanState::Error => targets.push(index_root.clone()),
            ScanState::Empty | ScanState::Missing => {
                debug!(root = %root.display_name(), state = ?scan.state, "No index wait targets");
            }
        }
    }
    targets
}

async fn scan_on_blocking_pool(path: PathBuf, max_depth: Option<usize>) -> MediaScan {
    let root_display = path.display().to_string();
    match tokio::task::spawn_blocking(move || media::media_folders(&path, max_depth)).await {
        Ok(scan) => scan,
        Err(err) => {
            warn!(root = %root_display, error = %err, "Media scan task failed");
            MediaScan {
                folders: Vec::new(),
                state: ScanState::Error,
            }
        }
    }
}

/// Maps an on-disk folder below `disk_root` onto the virtual path below
/// `index_root`
fn virtual_path(disk_root: &Path, index_root: &IndexPath, folder: &Path) -> Option<IndexPath> {
    let relative = folder.strip_prefix(disk_root).ok()?;
    let mut path = index_root.clone();
    for component in relative.components() {
        path = path.join(component.as_os_str().to_str()?);
    }
    (path != *index_root).then_some(path)
}
