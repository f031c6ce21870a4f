//! Root planning
//!
//! Turns configuration (plus per-invocation overrides) into the immutable
//! [`Root`] list a pass works on.

use std::fs;
use std::path::PathBuf;

use albumsync_core::config::{resolve_personal_path, Config, PersonalRootConfig};
use albumsync_core::domain::{
    depth_limit, IndexPath, Permission, PersonalRoot, Root, ShareSpec, SharedRoot,
    DEFAULT_LABEL_SEPARATOR,
};
use tracing::{debug, warn};

use crate::media;
use crate::PassError;

/// Per-invocation overrides for the personal album commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalOverrides {
    /// Single ad-hoc root replacing the configured list
    pub path: Option<String>,
    /// Album label for the ad-hoc root; may be empty for no prefix
    pub label_prefix: Option<String>,
    pub share_with: Option<Vec<String>>,
    pub roles: Option<Vec<String>>,
    pub permission: Option<Permission>,
    pub max_depth: Option<i64>,
}

impl PersonalOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Builds roots from configuration
pub struct RootPlanner<'a> {
    config: &'a Config,
}

impl<'a> RootPlanner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Shared roots: the configured `managed_roots`, or every directory
    /// under the shared photo root when none are configured
    pub fn shared_roots(&self) -> Vec<SharedRoot> {
        let names = if self.config.sharing.managed_roots.is_empty() {
            self.discover_shared_names()
        } else {
            self.config.sharing.managed_roots.clone()
        };

        names
            .into_iter()
            .map(|name| self.shared_root(&name))
            .collect()
    }

    fn shared_root(&self, name: &str) -> SharedRoot {
        let alias = self.config.mount_alias(name);
        SharedRoot {
            name: name.to_string(),
            label: self.config.shared_root_label(name),
            source: self.config.paths.shared_photo_root.join(name),
            mount_target: self.config.personal_link_root().join(&alias),
            index_path: self.config.virtual_shared_root().join(&alias),
            share: self.config.shared_root_share(name),
            max_scan_depth: depth_limit(self.config.media.scan_max_depth),
        }
    }

    fn discover_shared_names(&self) -> Vec<String> {
        let root = &self.config.paths.shared_photo_root;
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(root = %root.display(), error = %err, "Cannot list shared photo root");
                return Vec::new();
            }
        };

        let prefix = self.config.paths.mount_prefix.to_lowercase();
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| !media::is_reserved_name(name))
            .filter(|name| !name.to_lowercase().starts_with(&prefix))
            .collect();
        names.sort();
        debug!(count = names.len(), "Discovered shared roots");
        names
    }

    /// Personal roots after applying `overrides`
    ///
    /// An ad-hoc `path` replaces the configured list; when it names a
    /// configured root (case-insensitively), that root is used as
    /// configured, its on-disk spelling included, before overrides apply.
    pub fn personal_roots(
        &self,
        overrides: &PersonalOverrides,
    ) -> Result<Vec<PersonalRoot>, PassError> {
        let photos_root = self.config.personal_photos_root();

        let entries: Vec<PersonalRootConfig> = match &overrides.path {
            Some(raw) => {
                let wanted = resolve_personal_path(&photos_root, raw)
                    .map_err(|e| PassError::Config(format!("--path {raw}: {e}")))?;
                let configured = self.config.personal_roots.iter().find(|entry| {
                    resolve_personal_path(&photos_root, &entry.path)
                        .map(|p| p.lookup_key() == wanted.lookup_key())
                        .unwrap_or(false)
                });
                let mut entry = match configured {
                    Some(entry) => entry.clone(),
                    None => PersonalRootConfig {
                        path: raw.clone(),
                        ..Default::default()
                    },
                };
                if let Some(prefix) = &overrides.label_prefix {
                    entry.label = Some(prefix.clone());
                }
                vec![entry]
            }
            None if overrides.label_prefix.is_some() => {
                return Err(PassError::Config(
                    "--label-prefix requires --path".to_string(),
                ));
            }
            None => self.config.personal_roots.clone(),
        };

        entries
            .into_iter()
            .map(|mut entry| {
                if let Some(targets) = &overrides.share_with {
                    entry.share_with = Some(targets.clone());
                }
                if let Some(roles) = &overrides.roles {
                    entry.roles = Some(roles.clone());
                }
                if let Some(permission) = overrides.permission {
                    entry.permission = Some(permission);
                }
                if let Some(depth) = overrides.max_depth {
                    entry.max_depth = Some(depth);
                }
                self.personal_root(&photos_root, &entry)
            })
            .collect()
    }

    fn personal_root(
        &self,
        photos_root: &std::path::Path,
        entry: &PersonalRootConfig,
    ) -> Result<PersonalRoot, PassError> {
        let index_path = resolve_personal_path(photos_root, &entry.path)
            .map_err(|e| PassError::Config(format!("personal root '{}': {e}", entry.path)))?;

        let mut path = PathBuf::from(photos_root);
        path.extend(index_path.segments());

        let label = entry
            .label
            .clone()
            .unwrap_or_else(|| default_label(&index_path));
        let share: ShareSpec = self.config.personal_root_share(entry);
        let max_scan_depth = depth_limit(entry.max_depth.unwrap_or(self.config.media.scan_max_depth));

        Ok(PersonalRoot {
            label,
            path,
            index_path,
            share,
            max_scan_depth,
        })
    }
}

/// Label used when a personal root has none: `Family/Trips` → `Family - Trips`
pub fn default_label(path: &IndexPath) -> String {
    path.segments()
        .collect::<Vec<_>>()
        .join(DEFAULT_LABEL_SEPARATOR)
}

/// Wraps shared roots into the common [`Root`] variant
pub fn as_roots(shared: Vec<SharedRoot>) -> Vec<Root> {
    shared.into_iter().map(Root::Shared).collect()
}

/// Wraps personal roots into the common [`Root`] variant
pub fn as_personal_roots(personal: Vec<PersonalRoot>) -> Vec<Root> {
    personal.into_iter().map(Root::Personal).collect()
}
