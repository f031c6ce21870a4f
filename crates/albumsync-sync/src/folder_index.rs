//! Folder index cache
//!
//! A [`FolderIndexSnapshot`] is a point-in-time copy of the remote
//! path→folder-id table plus a parent→children adjacency map. Snapshots are
//! immutable: callers needing fresher data load a new one through
//! [`FolderIndexCache::load`] and pass it by reference to each phase.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use albumsync_core::domain::errors::RemoteError;
use albumsync_core::domain::{FolderId, FolderIndexEntry, IndexPath};
use albumsync_core::ports::IAlbumService;
use tracing::debug;

use crate::retry::{with_retry, RetryPolicy};

// ============================================================================
// FolderIndexSnapshot
// ============================================================================

/// Immutable snapshot of the remote folder index
#[derive(Debug, Clone, Default)]
pub struct FolderIndexSnapshot {
    /// Every row, including rows whose path differs from another only in case
    entries: HashMap<FolderId, FolderIndexEntry>,
    /// Normalized path → id
    by_exact_path: HashMap<String, FolderId>,
    /// Lowercased normalized path → id
    by_path: HashMap<String, FolderId>,
    /// Parent id → child ids, ordered by name
    children: HashMap<FolderId, Vec<FolderId>>,
}

impl FolderIndexSnapshot {
    /// Builds a snapshot from a complete folder table
    ///
    /// Every row is kept by id and in the children map. Paths that differ
    /// only in case are distinct folders on disk; an exact-case lookup finds
    /// each of them, and a case-insensitive lookup returns the first row.
    pub fn from_entries(entries: Vec<FolderIndexEntry>) -> Self {
        let mut snapshot = Self::default();

        for entry in entries {
            if snapshot.entries.contains_key(&entry.id) {
                debug!(path = %entry.path, id = %entry.id, "Duplicate folder index row");
                continue;
            }
            snapshot
                .by_exact_path
                .entry(entry.path.as_str().to_string())
                .or_insert(entry.id);
            let key = entry.path.lookup_key();
            match snapshot.by_path.get(&key) {
                Some(existing) => debug!(
                    path = %entry.path,
                    first = %existing,
                    id = %entry.id,
                    "Folder index paths differ only in case"
                ),
                None => {
                    snapshot.by_path.insert(key, entry.id);
                }
            }
            if let Some(parent) = entry.parent {
                snapshot.children.entry(parent).or_default().push(entry.id);
            }
            snapshot.entries.insert(entry.id, entry);
        }

        let entries = &snapshot.entries;
        for ids in snapshot.children.values_mut() {
            ids.sort_by_key(|id| {
                entries
                    .get(id)
                    .map(|e| (e.name().to_lowercase(), e.name().to_string()))
                    .unwrap_or_default()
            });
        }

        snapshot
    }

    /// Resolves a path to its folder id, preferring an exact-case match
    pub fn lookup(&self, path: &IndexPath) -> Option<FolderId> {
        self.by_exact_path
            .get(path.as_str())
            .or_else(|| self.by_path.get(&path.lookup_key()))
            .copied()
    }

    pub fn contains_path(&self, path: &IndexPath) -> bool {
        self.lookup(path).is_some()
    }

    pub fn entry(&self, id: FolderId) -> Option<&FolderIndexEntry> {
        self.entries.get(&id)
    }

    /// Direct children of `id`, ordered by name
    pub fn children_of(&self, id: FolderId) -> &[FolderId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Subset of `paths` not present in this snapshot
    pub fn missing<'a, I>(&self, paths: I) -> BTreeSet<IndexPath>
    where
        I: IntoIterator<Item = &'a IndexPath>,
    {
        paths
            .into_iter()
            .filter(|path| !self.contains_path(path))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// FolderIndexCache
// ============================================================================

/// Loads folder index snapshots from the remote service
#[derive(Clone)]
pub struct FolderIndexCache {
    service: Arc<dyn IAlbumService>,
    retry: RetryPolicy,
}

impl FolderIndexCache {
    pub fn new(service: Arc<dyn IAlbumService>, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }

    /// Fetches the whole folder table and builds a snapshot
    ///
    /// Transient failures are retried; any remaining failure fails the load
    /// as a whole. A partial table is never returned because it would make
    /// live folders look orphaned.
    pub async fn load(&self) -> Result<FolderIndexSnapshot, RemoteError> {
        let entries = with_retry(self.retry, "fetch_folder_index", || {
            self.service.fetch_folder_index()
        })
        .await?;
        let snapshot = FolderIndexSnapshot::from_entries(entries);
        debug!(folders = snapshot.len(), "Loaded folder index snapshot");
        Ok(snapshot)
    }
}
