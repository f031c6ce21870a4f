//! Mount reconciler
//!
//! Ensures every shared root is exposed inside the personal library through
//! a bind mount, and tears those mounts down on request. Only the local
//! filesystem is touched here; remote state is never read or written.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use albumsync_core::domain::errors::MountError;
use albumsync_core::domain::{MountReport, Skipped, SharedRoot, UnmountReport};
use albumsync_core::ports::{IMountPrimitive, MountAvailability};
use tracing::{debug, info, warn};

/// What happened to one root's mount point
#[derive(Debug, Clone, PartialEq, Eq)]
enum MountOutcome {
    Changed,
    AlreadyPresent,
    Skipped(String),
}

/// Reconciles bind mounts for shared roots
pub struct MountReconciler {
    primitive: Arc<dyn IMountPrimitive>,
    /// Directory holding the mount points
    link_root: PathBuf,
    mount_prefix: String,
}

impl MountReconciler {
    pub fn new(
        primitive: Arc<dyn IMountPrimitive>,
        link_root: impl Into<PathBuf>,
        mount_prefix: impl Into<String>,
    ) -> Self {
        Self {
            primitive,
            link_root: link_root.into(),
            mount_prefix: mount_prefix.into(),
        }
    }

    /// Makes sure every root's mount target exposes its source
    ///
    /// Failures are recorded per root; the batch always completes.
    pub async fn ensure_mounts(&self, roots: &[SharedRoot]) -> MountReport {
        let mut report = MountReport::default();

        if let MountAvailability::Unavailable(reason) = self.primitive.availability() {
            warn!(reason = %reason, "Skipping bind mounts");
            report.skipped_reason = Some(reason);
            return report;
        }

        for root in roots {
            match self.ensure_one(root).await {
                Ok(MountOutcome::Changed) => report.changed.push(root.mount_target.clone()),
                Ok(MountOutcome::AlreadyPresent) => {
                    debug!(target = %root.mount_target.display(), "Bind mount already present");
                    report.already_present.push(root.mount_target.clone());
                }
                Ok(MountOutcome::Skipped(reason)) => {
                    warn!(root = %root.name, reason = %reason, "Bind mount skipped");
                    report.skipped.push(Skipped::new(&root.name, reason));
                }
                Err(err) => {
                    warn!(root = %root.name, error = %err, "Bind mount failed");
                    report.failed.push(Skipped::new(&root.name, err.to_string()));
                }
            }
        }

        info!(
            changed = report.changed.len(),
            present = report.already_present.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Bind mounts reconciled"
        );
        report
    }

    async fn ensure_one(&self, root: &SharedRoot) -> Result<MountOutcome, MountError> {
        let source = &root.source;
        let target = &root.mount_target;

        if !tokio::fs::metadata(source)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Ok(MountOutcome::Skipped(
                MountError::SourceMissing(source.clone()).to_string(),
            ));
        }
        if is_symlink(target).await {
            return Ok(MountOutcome::Skipped(
                MountError::TargetIsSymlink(target.clone()).to_string(),
            ));
        }

        tokio::fs::create_dir_all(target)
            .await
            .map_err(|e| io_error(target, e))?;

        if self.primitive.is_bound_to(source, target).await? {
            return Ok(MountOutcome::AlreadyPresent);
        }
        if self.primitive.is_mounted(target).await? {
            warn!(
                target = %target.display(),
                expected = %source.display(),
                "Mount point exposes a different source, remounting"
            );
            self.primitive.unmount(target).await?;
        }
        if !is_empty_dir(target).await? {
            return Ok(MountOutcome::Skipped(
                MountError::TargetNotEmpty(target.clone()).to_string(),
            ));
        }

        self.primitive.bind_mount(source, target).await?;
        Ok(MountOutcome::Changed)
    }

    /// Removes the mounts of `roots`, plus stale prefixed mounts under the
    /// link root when `include_stale` is set
    ///
    /// Emptied mount directories and leftover symlinks are deleted. A failed
    /// unmount is reported and the batch continues.
    pub async fn unmount_all(&self, roots: &[SharedRoot], include_stale: bool) -> UnmountReport {
        let mut report = UnmountReport::default();
        let available = match self.primitive.availability() {
            MountAvailability::Available => true,
            MountAvailability::Unavailable(reason) => {
                report.skipped_reason = Some(reason);
                false
            }
        };

        let mut targets: Vec<PathBuf> = roots.iter().map(|r| r.mount_target.clone()).collect();
        if include_stale && available {
            targets.extend(self.stale_targets(&targets).await);
        }

        for target in targets {
            match self.release(&target, available).await {
                Ok(true) => report.removed.push(target),
                Ok(false) => debug!(target = %target.display(), "Nothing to remove"),
                Err(err) => {
                    warn!(target = %target.display(), error = %err, "Unmount failed");
                    report
                        .failed
                        .push(Skipped::new(target.display().to_string(), err.to_string()));
                }
            }
        }
        report
    }

    /// Active mounts under the link root that carry the mount prefix but
    /// belong to no configured root
    async fn stale_targets(&self, configured: &[PathBuf]) -> Vec<PathBuf> {
        let known: BTreeSet<&PathBuf> = configured.iter().collect();
        let mounted = match self.primitive.mounted_targets().await {
            Ok(mounted) => mounted,
            Err(err) => {
                warn!(error = %err, "Cannot read mount table");
                return Vec::new();
            }
        };
        mounted
            .into_iter()
            .filter(|target| target.parent() == Some(self.link_root.as_path()))
            .filter(|target| {
                target
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&self.mount_prefix))
                    .unwrap_or(false)
            })
            .filter(|target| !known.contains(target))
            .collect()
    }

    async fn release(&self, target: &Path, available: bool) -> Result<bool, MountError> {
        if tokio::fs::symlink_metadata(target).await.is_err() {
            return Ok(false);
        }

        let mut changed = false;
        if available && self.primitive.is_mounted(target).await? {
            self.primitive.unmount(target).await?;
            changed = true;
        }

        if is_symlink(target).await {
            tokio::fs::remove_file(target)
                .await
                .map_err(|e| io_error(target, e))?;
            info!(target = %target.display(), "Removed stale link");
            return Ok(true);
        }
        if is_empty_dir(target).await? {
            tokio::fs::remove_dir(target)
                .await
                .map_err(|e| io_error(target, e))?;
            info!(target = %target.display(), "Removed empty mount directory");
            changed = true;
        }
        Ok(changed)
    }
}

async fn is_symlink(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path)
        .await
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

async fn is_empty_dir(path: &Path) -> Result<bool, MountError> {
    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| io_error(path, e))?;
    Ok(entries
        .next_entry()
        .await
        .map_err(|e| io_error(path, e))?
        .is_none())
}

fn io_error(path: &Path, err: io::Error) -> MountError {
    MountError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
