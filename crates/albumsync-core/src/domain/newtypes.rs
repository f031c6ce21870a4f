//! Domain newtypes
//!
//! Strongly-typed wrappers for remote identifiers and for paths in the photo
//! library's virtual namespace.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Remote identifiers
// ============================================================================

/// Identifier of a folder in the remote folder index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(i64);

impl FolderId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Display for FolderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for FolderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of an album, assigned by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlbumId(i64);

impl AlbumId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Display for AlbumId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AlbumId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// IndexPath
// ============================================================================

/// A path in the photo library's virtual namespace
///
/// The folder index names folders relative to the user's personal photo
/// root, e.g. `/photos-shared/mount_team_family/2024`. Paths are kept in a
/// normalized form: a single leading `/`, no trailing `/`, no empty
/// segments. The library root itself is `/`.
///
/// Comparisons used for lookups are case-insensitive (see
/// [`IndexPath::lookup_key`]) because the service matches paths that way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct IndexPath(String);

impl IndexPath {
    /// Normalizes `raw` into an index path
    pub fn new(raw: &str) -> Self {
        let segments: Vec<&str> = raw
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        if segments.is_empty() {
            Self("/".to_string())
        } else {
            Self(format!("/{}", segments.join("/")))
        }
    }

    /// Parses a user-supplied relative path, rejecting parent traversal
    pub fn parse_relative(raw: &str) -> Result<Self, DomainError> {
        if raw.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(DomainError::InvalidPath(raw.to_string()));
        }
        Ok(Self::new(raw))
    }

    /// The library root, `/`
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Key used for case-insensitive lookups in the folder index
    pub fn lookup_key(&self) -> String {
        self.0.to_lowercase()
    }

    /// Appends one or more segments
    pub fn join(&self, segment: &str) -> Self {
        Self::new(&format!("{}/{}", self.0, segment))
    }

    /// Path segments, root excluded
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment, `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Number of segments below `ancestor`, if this path lives under it
    ///
    /// Returns `Some(0)` when both paths are equal.
    pub fn depth_below(&self, ancestor: &IndexPath) -> Option<usize> {
        let mine: Vec<String> = self.segments().map(str::to_lowercase).collect();
        let theirs: Vec<String> = ancestor.segments().map(str::to_lowercase).collect();
        if theirs.len() > mine.len() || mine[..theirs.len()] != theirs[..] {
            return None;
        }
        Some(mine.len() - theirs.len())
    }

    /// True when this path is strictly inside `ancestor`
    pub fn is_descendant_of(&self, ancestor: &IndexPath) -> bool {
        matches!(self.depth_below(ancestor), Some(depth) if depth > 0)
    }
}

impl Display for IndexPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for IndexPath {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<&str> for IndexPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<IndexPath> for String {
    fn from(path: IndexPath) -> Self {
        path.0
    }
}
