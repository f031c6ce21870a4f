//! Roots and share specifications
//!
//! A [`Root`] is one unit of reconciliation: a shared folder exposed through
//! a bind mount, or a folder inside the user's personal photo library. Roots
//! are built from configuration at the start of a pass and never change
//! during it.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::IndexPath;

// ============================================================================
// Permission and roles
// ============================================================================

/// Access level granted to share targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    #[default]
    View,
    Download,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::View => "view",
            Permission::Download => "download",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "view" | "viewer" => Ok(Permission::View),
            "download" | "downloader" => Ok(Permission::Download),
            other => Err(DomainError::InvalidPermission(other.to_string())),
        }
    }
}

impl TryFrom<String> for Permission {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.as_str().to_string()
    }
}

/// Maps role aliases onto the names the photo service understands
///
/// `viewer`/`view` → `view`, `downloader`/`download` → `download`,
/// `editor`/`manager` → `manager`; an empty role means `view`. Unknown
/// names pass through lowercased.
pub fn normalize_role(raw: &str) -> String {
    match raw.trim().to_lowercase().as_str() {
        "" | "view" | "viewer" => "view".to_string(),
        "download" | "downloader" => "download".to_string(),
        "manager" | "editor" => "manager".to_string(),
        other => other.to_string(),
    }
}

// ============================================================================
// ShareSpec
// ============================================================================

/// Desired sharing for every album derived from a root
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShareSpec {
    /// User or group names, in configuration order, without duplicates
    pub targets: Vec<String>,
    pub permission: Permission,
    /// Normalized role names
    pub roles: Vec<String>,
}

impl ShareSpec {
    /// Builds a spec, trimming and de-duplicating targets (case-insensitive,
    /// first spelling wins) and normalizing roles.
    pub fn new<T, R>(targets: T, permission: Permission, roles: R) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let targets = targets
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
            .collect();

        let mut seen_roles = BTreeSet::new();
        let roles = roles
            .into_iter()
            .filter(|r| !r.as_ref().trim().is_empty())
            .map(|r| normalize_role(r.as_ref()))
            .filter(|r| seen_roles.insert(r.clone()))
            .collect();

        Self {
            targets,
            permission,
            roles,
        }
    }

    /// A spec with no targets leaves albums private
    pub fn is_private(&self) -> bool {
        self.targets.is_empty()
    }

    /// Role attached to every target: the first configured role, or the
    /// permission name when no roles are configured
    pub fn effective_role(&self) -> String {
        self.roles
            .first()
            .cloned()
            .unwrap_or_else(|| self.permission.as_str().to_string())
    }

    /// Same spec without the targets named in `excluded` (case-insensitive)
    pub fn without_targets(&self, excluded: &[String]) -> Self {
        let excluded: BTreeSet<String> = excluded.iter().map(|t| t.trim().to_lowercase()).collect();
        Self {
            targets: self
                .targets
                .iter()
                .filter(|t| !excluded.contains(&t.to_lowercase()))
                .cloned()
                .collect(),
            permission: self.permission,
            roles: self.roles.clone(),
        }
    }

    /// Lowercased target names, for comparison with observed state
    pub fn target_set(&self) -> BTreeSet<String> {
        self.targets.iter().map(|t| t.to_lowercase()).collect()
    }
}

// ============================================================================
// Root
// ============================================================================

/// Discriminant of a [`Root`], used in reports and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootKind {
    Shared,
    Personal,
}

impl Display for RootKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RootKind::Shared => f.write_str("shared"),
            RootKind::Personal => f.write_str("personal"),
        }
    }
}

/// A folder from the shared photo namespace, exposed in the personal
/// library through a bind mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedRoot {
    /// Directory name under the shared photo root, e.g. `team_family`
    pub name: String,
    /// Album name prefix
    pub label: String,
    /// Absolute source directory, e.g. `/volume1/photo/team_family`
    pub source: PathBuf,
    /// Absolute mount target inside the personal library
    pub mount_target: PathBuf,
    /// Virtual path of the mount target, e.g. `/photos-shared/mount_team_family`
    pub index_path: IndexPath,
    pub share: ShareSpec,
    /// Depth limit for on-disk media discovery; `None` is unbounded
    pub max_scan_depth: Option<usize>,
}

/// A folder inside the personal photo library, walked directly on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonalRoot {
    pub label: String,
    /// Absolute directory, e.g. `/volume1/homes/alice/Photos/Family`
    pub path: PathBuf,
    /// Virtual path, e.g. `/Family`
    pub index_path: IndexPath,
    pub share: ShareSpec,
    pub max_scan_depth: Option<usize>,
}

/// One unit of reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Root {
    Shared(SharedRoot),
    Personal(PersonalRoot),
}

impl Root {
    pub fn kind(&self) -> RootKind {
        match self {
            Root::Shared(_) => RootKind::Shared,
            Root::Personal(_) => RootKind::Personal,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Root::Shared(root) => &root.label,
            Root::Personal(root) => &root.label,
        }
    }

    pub fn index_path(&self) -> &IndexPath {
        match self {
            Root::Shared(root) => &root.index_path,
            Root::Personal(root) => &root.index_path,
        }
    }

    pub fn share(&self) -> &ShareSpec {
        match self {
            Root::Shared(root) => &root.share,
            Root::Personal(root) => &root.share,
        }
    }

    pub fn max_scan_depth(&self) -> Option<usize> {
        match self {
            Root::Shared(root) => root.max_scan_depth,
            Root::Personal(root) => root.max_scan_depth,
        }
    }

    /// Human-readable identifier for logs and reports
    pub fn display_name(&self) -> String {
        match self {
            Root::Shared(root) => root.name.clone(),
            Root::Personal(root) => root.index_path.to_string(),
        }
    }

    pub fn as_shared(&self) -> Option<&SharedRoot> {
        match self {
            Root::Shared(root) => Some(root),
            Root::Personal(_) => None,
        }
    }
}

/// Converts a configured depth into a limit; zero or negative means
/// unbounded
pub fn depth_limit(raw: i64) -> Option<usize> {
    usize::try_from(raw).ok().filter(|depth| *depth > 0)
}
