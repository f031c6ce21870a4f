//! Remote album service port (driven/secondary port)
//!
//! This module defines the interface to the photo service's folder index,
//! albums and sharing. The primary implementation targets the Synology
//! Photos web API, but the engine only depends on this trait.
//!
//! ## Design Notes
//!
//! - Methods return [`RemoteError`] rather than `anyhow::Error` because the
//!   engine branches on the error class (transient vs. permanent).
//! - The primary share call returns a tagged [`PrimaryShareOutcome`] so the
//!   one rejection that triggers the fallback path is never conflated with
//!   other failures.
//! - Uses `#[async_trait]` for async trait methods.

use serde::{Deserialize, Serialize};

use crate::domain::errors::RemoteError;
use crate::domain::newtypes::{AlbumId, FolderId, IndexPath};
use crate::domain::root::Permission;
use crate::domain::{Album, FolderIndexEntry};

// ============================================================================
// Supporting types
// ============================================================================

/// Result of the primary per-user/group share call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryShareOutcome {
    /// Sharing was applied to the album
    Applied,
    /// The service refuses per-user sharing on condition albums
    RejectedConditionAlbum {
        /// Error code the service answered with
        code: i64,
    },
}

/// What a reindex request should cover
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReindexScope {
    /// The whole personal library
    Global,
    /// A single folder subtree
    Path(IndexPath),
}

/// Observed state of the service's indexing job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Idle,
    Busy,
    /// The service did not report a recognizable state
    Unknown,
}

// ============================================================================
// IAlbumService trait
// ============================================================================

/// Port trait for the remote photo service
///
/// Implementations must be thread-safe (`Send + Sync`); the engine holds
/// them behind an `Arc`.
#[async_trait::async_trait]
pub trait IAlbumService: Send + Sync {
    /// Fetches the complete folder index in one pass
    ///
    /// # Returns
    /// Every indexed folder with its id and parent id. A failure means no
    /// snapshot at all; partial tables are never returned.
    async fn fetch_folder_index(&self) -> Result<Vec<FolderIndexEntry>, RemoteError>;

    /// Fetches every album visible to the session user, with share state
    async fn fetch_albums(&self) -> Result<Vec<Album>, RemoteError>;

    /// Creates a condition album filtering on exactly `folder_id`
    ///
    /// # Arguments
    /// * `name` - Album display name
    /// * `folder_id` - Folder the album's membership is bound to
    ///
    /// # Returns
    /// The id assigned by the service
    async fn create_album(&self, name: &str, folder_id: FolderId) -> Result<AlbumId, RemoteError>;

    /// Deletes an album; the photos themselves are untouched
    async fn delete_album(&self, album_id: AlbumId) -> Result<(), RemoteError>;

    /// Shares an album with users/groups through the primary mechanism
    ///
    /// # Arguments
    /// * `album_id` - Album to share
    /// * `targets` - User or group names
    /// * `permission` - Access level
    /// * `roles` - Normalized role names (may be empty)
    async fn share_album(
        &self,
        album_id: AlbumId,
        targets: &[String],
        permission: Permission,
        roles: &[String],
    ) -> Result<PrimaryShareOutcome, RemoteError>;

    /// Asks the service to re-scan folders for new content
    async fn trigger_reindex(&self, scope: &ReindexScope) -> Result<(), RemoteError>;

    /// Reports whether the indexing job is currently running
    async fn index_status(&self) -> Result<IndexStatus, RemoteError>;
}
