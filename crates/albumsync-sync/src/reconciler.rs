//! Album reconciler
//!
//! Diffs the desired condition albums (one per qualifying child folder)
//! against the albums the service reports, then creates, re-shares and
//! prunes. Albums are identified by their bound folder id, never by name,
//! so renamed albums keep their id and links.
//!
//! ## Orphan ownership
//!
//! An album is only ever pruned by a root that was fully processed this
//! pass. A root owns an album when the album's bound folder:
//! - is in the index below the root (direct children for shared roots, any
//!   depth for personal roots), or
//! - is gone from the index and the album name carries the root's label
//!   prefix.
//!
//! An owned album whose folder was not visited this pass is an orphan.

use std::collections::BTreeSet;
use std::sync::Arc;

use albumsync_core::domain::errors::RemoteError;
use albumsync_core::domain::{
    album_name, Album, AlbumId, AlbumKind, AlbumRef, FolderId, IndexPath, Root, RootKind,
    ShareSpec, ShareState, Skipped, SyncReport,
};
use albumsync_core::ports::IAlbumService;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::discovery::{EnumerateChildren, QualifiedChild};
use crate::folder_index::FolderIndexSnapshot;
use crate::retry::{with_retry, RetryPolicy};
use crate::sharing::{ShareResult, SharingPolicyResolver};

/// One album as shown by `list-albums`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumListing {
    pub album_id: AlbumId,
    pub name: String,
    pub folder_id: Option<FolderId>,
    /// Path of the bound folder, when it is still indexed
    pub folder_path: Option<IndexPath>,
    pub share: ShareState,
}

/// Prune scope of one root
#[derive(Debug, Clone)]
struct RootScope {
    path: IndexPath,
    kind: RootKind,
    /// Lowercased `label + separator`; `None` for an empty label
    name_prefix: Option<String>,
}

impl RootScope {
    fn new(root: &Root, separator: &str) -> Self {
        let label = root.label().trim();
        Self {
            path: root.index_path().clone(),
            kind: root.kind(),
            name_prefix: (!label.is_empty()).then(|| format!("{label}{separator}").to_lowercase()),
        }
    }

    /// Whether an indexed folder at `depth` below this root is managed here
    fn owns_depth(&self, depth: usize) -> bool {
        match self.kind {
            RootKind::Shared => depth == 1,
            RootKind::Personal => depth >= 1,
        }
    }

    fn owns_name(&self, name: &str) -> bool {
        self.name_prefix
            .as_deref()
            .map(|prefix| name.to_lowercase().starts_with(prefix))
            .unwrap_or(false)
    }
}

/// Creates, re-shares and prunes condition albums
pub struct AlbumReconciler {
    service: Arc<dyn IAlbumService>,
    sharing: SharingPolicyResolver,
    separator: String,
    retry: RetryPolicy,
}

impl AlbumReconciler {
    pub fn new(
        service: Arc<dyn IAlbumService>,
        sharing: SharingPolicyResolver,
        separator: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            service,
            sharing,
            separator: separator.into(),
            retry,
        }
    }

    async fn fetch_albums(&self) -> Result<Vec<Album>, RemoteError> {
        with_retry(self.retry, "fetch_albums", || self.service.fetch_albums()).await
    }

    /// Reconciles albums for `roots` against one folder index snapshot
    ///
    /// The album catalog is fetched once and kept current in memory for the
    /// rest of the pass. Per-root and per-album failures are recorded in the
    /// report; a failed catalog fetch ends the pass early.
    pub async fn run_sync(
        &self,
        roots: &[Root],
        snapshot: &FolderIndexSnapshot,
        pass_id: Uuid,
    ) -> SyncReport {
        let mut report = SyncReport::new(pass_id);
        let mut catalog = match self.fetch_albums().await {
            Ok(albums) => albums,
            Err(err) => {
                report.errors.push(format!("Cannot fetch albums: {err}"));
                report.finish();
                return report;
            }
        };

        let mut visited = BTreeSet::new();
        let mut scopes = Vec::new();

        for root in roots {
            let Some(root_folder) = snapshot.lookup(root.index_path()) else {
                warn!(root = %root.display_name(), path = %root.index_path(), "Root not indexed, skipping");
                report.skipped.push(Skipped::new(
                    root.display_name(),
                    format!("{} is not indexed", root.index_path()),
                ));
                continue;
            };

            let set = match root.enumerate_children(snapshot, root_folder).await {
                Ok(set) => set,
                Err(reason) => {
                    warn!(root = %root.display_name(), reason = %reason, "Skipping root");
                    report.skipped.push(Skipped::new(root.display_name(), reason));
                    continue;
                }
            };
            scopes.push(RootScope::new(root, &self.separator));

            for path in &set.unindexed {
                report
                    .warnings
                    .push(format!("{}: {path} is not indexed yet", root.display_name()));
            }
            if set.children.is_empty() {
                info!(root = %root.display_name(), "No qualifying folders");
            }

            for child in &set.children {
                visited.insert(child.folder_id);
                self.reconcile_child(root, child, &mut catalog, &mut report)
                    .await;
            }
        }

        self.prune(&scopes, roots, &visited, snapshot, &mut catalog, &mut report)
            .await;

        report.finish();
        info!(
            created = report.created.len(),
            updated = report.updated.len(),
            shared = report.shared.len(),
            pruned = report.pruned.len(),
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "Album reconciliation finished"
        );
        report
    }

    async fn reconcile_child(
        &self,
        root: &Root,
        child: &QualifiedChild,
        catalog: &mut Vec<Album>,
        report: &mut SyncReport,
    ) {
        let name = album_name(root.label(), &self.separator, &child.name);
        let spec = root.share();

        if let Some(existing) = catalog
            .iter_mut()
            .find(|album| album.bound_folder() == Some(child.folder_id))
        {
            if existing.name != name {
                debug!(
                    folder = %child.path,
                    album = %existing.name,
                    "Folder already managed under another name, keeping it"
                );
            }
            if existing.share.satisfies(spec) {
                return;
            }
            if existing
                .share
                .satisfies(&self.sharing.reachable_spec(spec).await)
            {
                debug!(
                    album = %existing.name,
                    "Shared with every resolvable target"
                );
                return;
            }

            info!(album = %existing.name, "Share settings drifted, re-applying");
            let album_ref = AlbumRef {
                album_id: existing.id,
                name: existing.name.clone(),
                folder_id: Some(child.folder_id),
            };
            if let Some(result) = self.share(&album_ref, spec, report).await {
                existing.share = observed_share(spec, &result);
                report.updated.push(album_ref);
            }
            return;
        }

        if let Some(clash) = catalog
            .iter()
            .find(|album| album.name.eq_ignore_ascii_case(&name))
        {
            warn!(
                album = %name,
                existing_id = %clash.id,
                "Album name already used by an album bound elsewhere"
            );
            report.warnings.push(format!(
                "{name}: name already used by album {}",
                clash.id
            ));
        }

        info!(album = %name, folder_id = %child.folder_id, "Creating album");
        let created = with_retry(self.retry, "create_album", || {
            self.service.create_album(&name, child.folder_id)
        })
        .await;
        let album_id = match created {
            Ok(id) => id,
            Err(err) => {
                warn!(album = %name, error = %err, "Album creation failed");
                report.errors.push(format!("{name}: create failed: {err}"));
                return;
            }
        };

        let album_ref = AlbumRef {
            album_id,
            name: name.clone(),
            folder_id: Some(child.folder_id),
        };
        report.created.push(album_ref.clone());

        let mut album = Album {
            id: album_id,
            name,
            kind: AlbumKind::Condition,
            folder_ids: vec![child.folder_id],
            share: ShareState::Private,
        };
        if let Some(result) = self.share(&album_ref, spec, report).await {
            album.share = observed_share(spec, &result);
        }
        catalog.push(album);
    }

    /// Applies sharing and records the outcome; `Some` when a mechanism
    /// applied it
    async fn share(
        &self,
        album: &AlbumRef,
        spec: &ShareSpec,
        report: &mut SyncReport,
    ) -> Option<ShareResult> {
        match self
            .sharing
            .apply_sharing(album.album_id, &album.name, spec)
            .await
        {
            Ok(result) => {
                report.warnings.extend(result.warnings.iter().cloned());
                if result.is_applied() {
                    report.shared.push(album.clone());
                    Some(result)
                } else {
                    None
                }
            }
            Err(err) => {
                warn!(album = %album.name, error = %err, "Sharing failed");
                report
                    .errors
                    .push(format!("{}: sharing failed: {err}", album.name));
                None
            }
        }
    }

    async fn prune(
        &self,
        scopes: &[RootScope],
        roots: &[Root],
        visited: &BTreeSet<FolderId>,
        snapshot: &FolderIndexSnapshot,
        catalog: &mut Vec<Album>,
        report: &mut SyncReport,
    ) {
        if scopes.is_empty() {
            return;
        }
        let orphans: Vec<(AlbumId, String, FolderId)> = catalog
            .iter()
            .filter_map(|album| album.bound_folder().map(|f| (album, f)))
            .filter(|(_, folder)| !visited.contains(folder))
            .filter(|(album, folder)| is_owned(album, *folder, scopes, roots, snapshot))
            .map(|(album, folder)| (album.id, album.name.clone(), folder))
            .collect();

        for (album_id, name, folder_id) in orphans {
            info!(album = %name, album_id = %album_id, folder_id = %folder_id, "Deleting orphan album");
            match with_retry(self.retry, "delete_album", || {
                self.service.delete_album(album_id)
            })
            .await
            {
                Ok(()) => {
                    catalog.retain(|album| album.id != album_id);
                    report.pruned.push(AlbumRef {
                        album_id,
                        name,
                        folder_id: Some(folder_id),
                    });
                }
                Err(err) => {
                    warn!(album = %name, error = %err, "Album deletion failed");
                    report.errors.push(format!("{name}: delete failed: {err}"));
                }
            }
        }
    }

    /// Deletes every album owned by `roots`, keeping none
    pub async fn delete_albums_only(
        &self,
        roots: &[Root],
        snapshot: &FolderIndexSnapshot,
        pass_id: Uuid,
    ) -> SyncReport {
        let mut report = SyncReport::new(pass_id);
        let mut catalog = match self.fetch_albums().await {
            Ok(albums) => albums,
            Err(err) => {
                report.errors.push(format!("Cannot fetch albums: {err}"));
                report.finish();
                return report;
            }
        };

        let scopes: Vec<RootScope> = roots
            .iter()
            .map(|root| RootScope::new(root, &self.separator))
            .collect();
        self.prune(
            &scopes,
            roots,
            &BTreeSet::new(),
            snapshot,
            &mut catalog,
            &mut report,
        )
        .await;

        report.finish();
        info!(pruned = report.pruned.len(), errors = report.errors.len(), "Album deletion finished");
        report
    }

    /// Deletes every album named exactly `name`
    pub async fn delete_album_by_name(&self, name: &str, pass_id: Uuid) -> SyncReport {
        let mut report = SyncReport::new(pass_id);
        let name = name.trim();
        let albums = match self.fetch_albums().await {
            Ok(albums) => albums,
            Err(err) => {
                report.errors.push(format!("Cannot fetch albums: {err}"));
                report.finish();
                return report;
            }
        };

        let matches: Vec<&Album> = albums.iter().filter(|album| album.name == name).collect();
        if matches.is_empty() {
            report.warnings.push(format!("No album named '{name}'"));
        }
        for album in matches {
            match with_retry(self.retry, "delete_album", || {
                self.service.delete_album(album.id)
            })
            .await
            {
                Ok(()) => {
                    info!(album = %album.name, album_id = %album.id, "Album deleted");
                    report.pruned.push(AlbumRef {
                        album_id: album.id,
                        name: album.name.clone(),
                        folder_id: album.bound_folder(),
                    });
                }
                Err(err) => report
                    .errors
                    .push(format!("{}: delete failed: {err}", album.name)),
            }
        }
        report.finish();
        report
    }

    /// Albums sorted by name, optionally limited to those bound inside
    /// `filter` (the folder itself included)
    pub async fn list_albums(
        &self,
        filter: Option<&IndexPath>,
        snapshot: &FolderIndexSnapshot,
    ) -> Result<Vec<AlbumListing>, RemoteError> {
        let mut listings: Vec<AlbumListing> = self
            .fetch_albums()
            .await?
            .into_iter()
            .map(|album| {
                let folder_id = album.bound_folder();
                let folder_path = folder_id
                    .and_then(|id| snapshot.entry(id))
                    .map(|entry| entry.path.clone());
                AlbumListing {
                    album_id: album.id,
                    name: album.name,
                    folder_id,
                    folder_path,
                    share: album.share,
                }
            })
            .filter(|listing| match filter {
                None => true,
                Some(filter) => listing
                    .folder_path
                    .as_ref()
                    .map(|path| path.depth_below(filter).is_some())
                    .unwrap_or(false),
            })
            .collect();
        listings.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(listings)
    }
}

/// Whether a processed root owns the album bound to `folder`
fn is_owned(
    album: &Album,
    folder: FolderId,
    scopes: &[RootScope],
    roots: &[Root],
    snapshot: &FolderIndexSnapshot,
) -> bool {
    if let Some(entry) = snapshot.entry(folder) {
        let under_some_root = roots
            .iter()
            .any(|root| entry.path.is_descendant_of(root.index_path()));
        if under_some_root {
            return scopes.iter().any(|scope| {
                entry
                    .path
                    .depth_below(&scope.path)
                    .map(|depth| scope.owns_depth(depth))
                    .unwrap_or(false)
            });
        }
    }
    scopes.iter().any(|scope| scope.owns_name(&album.name))
}

/// Share state an album is known to have after `result` was applied
fn observed_share(spec: &ShareSpec, result: &ShareResult) -> ShareState {
    ShareState::Members {
        targets: result
            .applied_targets
            .iter()
            .map(|target| target.to_lowercase())
            .collect(),
        roles: [spec.effective_role()].into_iter().collect(),
    }
}
