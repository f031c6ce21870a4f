//! Batch entry points
//!
//! [`SyncRunner`] wires the phases together in their fixed order: mount,
//! wait for the index, reconcile albums (sharing per album), prune. Each
//! entry point returns structured reports; only the fatal taxonomy of
//! [`PassError`] aborts a pass.

use std::sync::Arc;

use albumsync_core::config::Config;
use albumsync_core::domain::{IndexPath, MountReport, Root, SharedRoot, SyncReport, UnmountReport};
use albumsync_core::ports::{
    IAlbumService, IAuthSession, IMountPrimitive, IWebSharing, ReindexScope,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::discovery::wait_targets;
use crate::folder_index::{FolderIndexCache, FolderIndexSnapshot};
use crate::mounts::MountReconciler;
use crate::reconciler::{AlbumListing, AlbumReconciler};
use crate::retry::RetryPolicy;
use crate::roots::{as_personal_roots, as_roots, PersonalOverrides, RootPlanner};
use crate::sharing::SharingPolicyResolver;
use crate::waiter::{IndexConvergenceWaiter, Reindexer};
use crate::PassError;

/// Runs reconciliation passes against one configured service
pub struct SyncRunner {
    config: Config,
    auth: Arc<dyn IAuthSession>,
    service: Arc<dyn IAlbumService>,
    web_sharing: Arc<dyn IWebSharing>,
    mounts: Arc<dyn IMountPrimitive>,
}

impl SyncRunner {
    pub fn new(
        config: Config,
        auth: Arc<dyn IAuthSession>,
        service: Arc<dyn IAlbumService>,
        web_sharing: Arc<dyn IWebSharing>,
        mounts: Arc<dyn IMountPrimitive>,
    ) -> Self {
        Self {
            config,
            auth,
            service,
            web_sharing,
            mounts,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ------------------------------------------------------------------
    // Phase builders
    // ------------------------------------------------------------------

    fn retry(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config.retry)
    }

    fn cache(&self) -> FolderIndexCache {
        FolderIndexCache::new(self.service.clone(), self.retry())
    }

    fn waiter(&self) -> IndexConvergenceWaiter {
        let reindexer = Reindexer::new(
            self.service.clone(),
            &self.config.indexing,
            &self.config.dsm.username,
        );
        IndexConvergenceWaiter::new(self.cache(), reindexer, &self.config.indexing)
    }

    fn reconciler(&self) -> AlbumReconciler {
        let sharing = SharingPolicyResolver::new(
            self.service.clone(),
            self.web_sharing.clone(),
            self.config.sharing.enable_public_sharing,
            self.retry(),
        );
        AlbumReconciler::new(
            self.service.clone(),
            sharing,
            self.config.sharing.label_separator.clone(),
            self.retry(),
        )
    }

    fn mount_reconciler(&self) -> MountReconciler {
        MountReconciler::new(
            self.mounts.clone(),
            self.config.personal_link_root(),
            self.config.paths.mount_prefix.clone(),
        )
    }

    fn shared_roots(&self) -> Vec<SharedRoot> {
        RootPlanner::new(&self.config).shared_roots()
    }

    fn personal_roots(&self, overrides: &PersonalOverrides) -> Result<Vec<Root>, PassError> {
        Ok(as_personal_roots(
            RootPlanner::new(&self.config).personal_roots(overrides)?,
        ))
    }

    async fn login(&self) -> Result<(), PassError> {
        self.auth.login().await?;
        Ok(())
    }

    async fn load_index(&self) -> Result<FolderIndexSnapshot, PassError> {
        self.cache().load().await.map_err(PassError::IndexUnavailable)
    }

    /// Waits for `targets`, returning the last snapshot and what is still
    /// missing. `reindexed` skips the waiter's first trigger after a global
    /// reindex was just requested.
    async fn wait_for(
        &self,
        targets: &[IndexPath],
        label: &str,
        reindexed: bool,
    ) -> Result<(FolderIndexSnapshot, Vec<IndexPath>), PassError> {
        let outcome = self
            .waiter()
            .after_reindex(reindexed)
            .wait_for_paths_indexed(targets, label)
            .await
            .map_err(PassError::IndexUnavailable)?;
        debug!(
            label,
            reloads = outcome.reloads,
            triggers = outcome.reindex_triggers,
            "Index wait finished"
        );
        Ok((outcome.snapshot, outcome.missing.into_iter().collect()))
    }

    /// Triggers a global reindex when mounts changed or a forced reindex is
    /// configured
    async fn maybe_reindex(&self, mounts_changed: bool) -> bool {
        let indexing = &self.config.indexing;
        if indexing.force_reindex_on_start || (mounts_changed && indexing.reindex_after_mount) {
            self.waiter().reindexer().trigger(&ReindexScope::Global).await
        } else {
            false
        }
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Ensures bind mounts, then optionally waits for the index to show
    /// every mounted root and its media folders
    pub async fn ensure_mounts(&self, wait: bool) -> Result<MountReport, PassError> {
        let roots = self.shared_roots();
        let (report, _) = self.mount_phase(&roots, wait).await?;
        Ok(report)
    }

    async fn mount_phase(
        &self,
        roots: &[SharedRoot],
        wait: bool,
    ) -> Result<(MountReport, Option<FolderIndexSnapshot>), PassError> {
        let mut report = self.mount_reconciler().ensure_mounts(roots).await;
        if !wait {
            return Ok((report, None));
        }

        self.login().await?;
        report.reindex_triggered = self.maybe_reindex(!report.changed.is_empty()).await;

        let targets = wait_targets(&as_roots(roots.to_vec())).await;
        let (snapshot, missing) = self
            .wait_for(&targets, "mounts", report.reindex_triggered)
            .await?;
        if !missing.is_empty() {
            warn!(pending = missing.len(), "Some mounted folders are not indexed yet");
        }
        report.pending_paths = missing;
        Ok((report, Some(snapshot)))
    }

    /// Full pass: mount, wait for the index, reconcile shared-root albums
    pub async fn sync(&self) -> Result<(MountReport, SyncReport), PassError> {
        let pass_id = Uuid::new_v4();
        info!(pass_id = %pass_id, "Starting sync pass");

        let shared = self.shared_roots();
        let (mount_report, snapshot) = self.mount_phase(&shared, true).await?;
        let snapshot = match snapshot {
            Some(snapshot) => snapshot,
            None => self.load_index().await?,
        };

        let report = self
            .reconciler()
            .run_sync(&as_roots(shared), &snapshot, pass_id)
            .await;
        Ok((mount_report, report))
    }

    /// Reconciles shared-root albums without touching mounts
    pub async fn create_albums(&self) -> Result<SyncReport, PassError> {
        let pass_id = Uuid::new_v4();
        info!(pass_id = %pass_id, "Creating albums for shared roots");
        self.login().await?;

        let roots = as_roots(self.shared_roots());
        let reindexed = self.maybe_reindex(false).await;
        if reindexed {
            debug!("Forced reindex before album creation");
        }
        let targets: Vec<IndexPath> = roots.iter().map(|r| r.index_path().clone()).collect();
        let (snapshot, _) = self.wait_for(&targets, "shared roots", reindexed).await?;
        Ok(self.reconciler().run_sync(&roots, &snapshot, pass_id).await)
    }

    /// Deletes every album of the shared roots
    pub async fn delete_albums(&self) -> Result<SyncReport, PassError> {
        let pass_id = Uuid::new_v4();
        info!(pass_id = %pass_id, "Deleting albums for shared roots");
        self.login().await?;
        let snapshot = self.load_index().await?;
        let roots = as_roots(self.shared_roots());
        Ok(self
            .reconciler()
            .delete_albums_only(&roots, &snapshot, pass_id)
            .await)
    }

    /// Reconciles albums for personal roots, walked on disk
    pub async fn create_personal_albums(
        &self,
        overrides: &PersonalOverrides,
    ) -> Result<SyncReport, PassError> {
        let pass_id = Uuid::new_v4();
        let roots = self.personal_roots(overrides)?;
        info!(pass_id = %pass_id, roots = roots.len(), "Creating personal albums");
        self.login().await?;

        let reindexed = self.maybe_reindex(false).await;
        if reindexed {
            debug!("Forced reindex before personal album creation");
        }
        let targets = wait_targets(&roots).await;
        let (snapshot, _) = self.wait_for(&targets, "personal roots", reindexed).await?;
        Ok(self.reconciler().run_sync(&roots, &snapshot, pass_id).await)
    }

    /// Deletes every album of the personal roots
    pub async fn delete_personal_albums(
        &self,
        overrides: &PersonalOverrides,
    ) -> Result<SyncReport, PassError> {
        let pass_id = Uuid::new_v4();
        let roots = self.personal_roots(overrides)?;
        info!(pass_id = %pass_id, roots = roots.len(), "Deleting personal albums");
        self.login().await?;
        let snapshot = self.load_index().await?;
        Ok(self
            .reconciler()
            .delete_albums_only(&roots, &snapshot, pass_id)
            .await)
    }

    /// Removes the shared roots' bind mounts
    pub async fn unmount(&self, include_stale: bool) -> UnmountReport {
        self.mount_reconciler()
            .unmount_all(&self.shared_roots(), include_stale)
            .await
    }

    /// Deletes shared-root albums, then removes every mount including stale
    /// ones
    ///
    /// Albums go first: once unmounted, their folders leave the index and
    /// could only be matched by name.
    pub async fn unmount_and_delete_all(&self) -> Result<(SyncReport, UnmountReport), PassError> {
        let albums = self.delete_albums().await?;
        let mounts = self.unmount(true).await;
        Ok((albums, mounts))
    }

    /// Lists albums, optionally only those bound inside `path`
    pub async fn list_albums(&self, path: Option<&str>) -> Result<Vec<AlbumListing>, PassError> {
        self.login().await?;
        let snapshot = self.load_index().await?;
        let filter = path.map(IndexPath::new);
        self.reconciler()
            .list_albums(filter.as_ref(), &snapshot)
            .await
            .map_err(PassError::Remote)
    }

    /// Deletes albums by exact name
    pub async fn delete_album_by_name(&self, name: &str) -> Result<SyncReport, PassError> {
        self.login().await?;
        Ok(self
            .reconciler()
            .delete_album_by_name(name, Uuid::new_v4())
            .await)
    }

    /// Ends the remote session; failures are only logged
    pub async fn logout(&self) {
        if !self.auth.is_authenticated() {
            return;
        }
        if let Err(err) = self.auth.logout().await {
            debug!(error = %err, "Logout failed");
        }
    }
}
