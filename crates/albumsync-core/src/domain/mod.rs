//! Domain entities and derivation rules
//!
//! This module contains the core domain types for AlbumSync:
//! - Newtypes for remote identifiers and virtual library paths
//! - Roots and share specifications
//! - Albums, folder index entries and observed share state
//! - Structured reports returned by every entry point
//! - Error taxonomy shared with the adapters

pub mod album;
pub mod errors;
pub mod newtypes;
pub mod report;
pub mod root;

// Re-export commonly used types
pub use album::{album_name, Album, AlbumKind, FolderIndexEntry, ShareState, DEFAULT_LABEL_SEPARATOR};
pub use errors::{AuthError, DomainError, MountError, RemoteError, ShareError};
pub use newtypes::{AlbumId, FolderId, IndexPath};
pub use report::{AlbumRef, MountReport, Skipped, SyncReport, UnmountReport};
pub use root::{
    depth_limit, normalize_role, PersonalRoot, Permission, Root, RootKind, ShareSpec, SharedRoot,
};
