//! Mount primitive port
//!
//! Wraps the operating system's bind-mount facility. Filesystem inspection
//! of mount targets (existence, emptiness, symlinks) is done by the engine;
//! this port only covers what needs the mount table or elevated tooling.

use std::path::{Path, PathBuf};

use crate::domain::errors::MountError;

/// Whether bind mounts can be used on this host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountAvailability {
    Available,
    /// Disabled in configuration, non-Linux host, or tooling missing
    Unavailable(String),
}

/// Port trait for bind-mount operations
#[async_trait::async_trait]
pub trait IMountPrimitive: Send + Sync {
    /// Reports whether bind mounts are usable
    fn availability(&self) -> MountAvailability;

    /// Exposes `source` at `target`
    ///
    /// # Arguments
    /// * `source` - Existing directory to expose
    /// * `target` - Existing, empty directory to mount over
    async fn bind_mount(&self, source: &Path, target: &Path) -> Result<(), MountError>;

    /// Removes the mount at `target`
    async fn unmount(&self, target: &Path) -> Result<(), MountError>;

    /// Every active mount point on the host
    async fn mounted_targets(&self) -> Result<Vec<PathBuf>, MountError>;

    /// Whether `target` is an active mount point
    async fn is_mounted(&self, target: &Path) -> Result<bool, MountError> {
        Ok(self.mounted_targets().await?.iter().any(|t| t == target))
    }

    /// Whether `target` is mounted and exposes exactly `source`
    async fn is_bound_to(&self, source: &Path, target: &Path) -> Result<bool, MountError>;
}
