//! Albums and folder index entries as seen on the remote service

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::newtypes::{AlbumId, FolderId, IndexPath};
use super::root::ShareSpec;

/// Default separator between a root label and a child folder name
pub const DEFAULT_LABEL_SEPARATOR: &str = " - ";

/// One row of the remote folder index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderIndexEntry {
    pub id: FolderId,
    pub path: IndexPath,
    /// `None` for top-level folders
    pub parent: Option<FolderId>,
}

impl FolderIndexEntry {
    pub fn new(id: i64, path: &str, parent: Option<i64>) -> Self {
        Self {
            id: FolderId::new(id),
            path: IndexPath::new(path),
            parent: parent.map(FolderId::new),
        }
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.path.file_name().unwrap_or("/")
    }
}

/// How album membership is defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumKind {
    /// Membership follows a folder filter
    Condition,
    /// Manually curated
    Normal,
}

/// Sharing observed on an existing album
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ShareState {
    #[default]
    Private,
    /// A passphrase link exists but no member entries are attached
    PublicLinkOnly,
    Members {
        /// Lowercased user/group names
        targets: BTreeSet<String>,
        /// Distinct roles granted to those members
        roles: BTreeSet<String>,
    },
}

impl ShareState {
    /// Whether the observed state already satisfies `spec`
    ///
    /// A private spec is always satisfied: the engine never revokes
    /// sharing, it only grants it.
    pub fn satisfies(&self, spec: &ShareSpec) -> bool {
        if spec.is_private() {
            return true;
        }
        match self {
            ShareState::Private | ShareState::PublicLinkOnly => false,
            ShareState::Members { targets, roles } => {
                *targets == spec.target_set()
                    && roles.len() == 1
                    && roles.contains(&spec.effective_role())
            }
        }
    }
}

/// An album on the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    pub kind: AlbumKind,
    /// Folder filter of a condition album
    pub folder_ids: Vec<FolderId>,
    pub share: ShareState,
}

impl Album {
    /// The folder a managed album is bound to
    ///
    /// Only condition albums filtering on exactly one folder are considered
    /// bound; anything else was not created by this engine.
    pub fn bound_folder(&self) -> Option<FolderId> {
        match (self.kind, self.folder_ids.as_slice()) {
            (AlbumKind::Condition, [folder]) => Some(*folder),
            _ => None,
        }
    }
}

/// Derives an album name from a root label and a child folder name
///
/// An empty (or blank) label yields the child name alone.
pub fn album_name(label: &str, separator: &str, child: &str) -> String {
    let label = label.trim();
    let child = child.trim();
    if label.is_empty() {
        child.to_string()
    } else {
        format!("{label}{separator}{child}")
    }
}
