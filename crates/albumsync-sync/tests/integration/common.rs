//! Shared fakes for engine tests
//!
//! In-memory implementations of every port. Each fake records the calls it
//! receives so tests can assert on exact call counts.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use albumsync_core::config::{Config, ConfigBuilder};
use albumsync_core::domain::errors::{AuthError, MountError, RemoteError, ShareError};
use albumsync_core::domain::{
    Album, AlbumId, AlbumKind, FolderId, FolderIndexEntry, Permission, ShareState,
};
use albumsync_core::ports::{
    FallbackShare, IAlbumService, IAuthSession, IMountPrimitive, IWebSharing, IndexStatus,
    MountAvailability, PrimaryShareOutcome, ReindexScope, SharePolicyRef,
};
use albumsync_sync::runner::SyncRunner;

// ============================================================================
// FakeAlbumService
// ============================================================================

#[derive(Default)]
pub struct ServiceState {
    /// Folder tables served in order; the last one repeats
    pub index_versions: Vec<Vec<FolderIndexEntry>>,
    pub index_loads: u32,
    pub index_error: Option<RemoteError>,
    pub albums: Vec<Album>,
    pub next_album_id: i64,
    pub created: Vec<(String, FolderId)>,
    pub deleted: Vec<AlbumId>,
    pub share_calls: Vec<(AlbumId, Vec<String>)>,
    /// Answer every share call with this rejection code
    pub reject_share_code: Option<i64>,
    /// Fail every share call with this error
    pub share_error: Option<RemoteError>,
    pub reindex_calls: u32,
}

#[derive(Default)]
pub struct FakeAlbumService {
    pub state: Mutex<ServiceState>,
}

impl FakeAlbumService {
    pub fn with_index(entries: Vec<FolderIndexEntry>) -> Arc<Self> {
        let service = Self::default();
        {
            let mut state = service.state.lock().unwrap();
            state.index_versions = vec![entries];
            state.next_album_id = 1000;
        }
        Arc::new(service)
    }

    pub fn add_album(&self, album: Album) {
        self.state.lock().unwrap().albums.push(album);
    }

    pub fn album_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .albums
            .iter()
            .map(|a| a.name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait::async_trait]
impl IAlbumService for FakeAlbumService {
    async fn fetch_folder_index(&self) -> Result<Vec<FolderIndexEntry>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.index_loads += 1;
        if let Some(err) = &state.index_error {
            return Err(err.clone());
        }
        let last = state.index_versions.len().saturating_sub(1);
        let version = (state.index_loads as usize - 1).min(last);
        Ok(state.index_versions.get(version).cloned().unwrap_or_default())
    }

    async fn fetch_albums(&self) -> Result<Vec<Album>, RemoteError> {
        Ok(self.state.lock().unwrap().albums.clone())
    }

    async fn create_album(&self, name: &str, folder_id: FolderId) -> Result<AlbumId, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.next_album_id += 1;
        let id = AlbumId::new(state.next_album_id);
        state.created.push((name.to_string(), folder_id));
        state.albums.push(condition_album(id.get(), name, folder_id.get()));
        Ok(id)
    }

    async fn delete_album(&self, album_id: AlbumId) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.deleted.push(album_id);
        state.albums.retain(|a| a.id != album_id);
        Ok(())
    }

    async fn share_album(
        &self,
        album_id: AlbumId,
        targets: &[String],
        permission: Permission,
        roles: &[String],
    ) -> Result<PrimaryShareOutcome, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.share_calls.push((album_id, targets.to_vec()));
        if let Some(err) = &state.share_error {
            return Err(err.clone());
        }
        if let Some(code) = state.reject_share_code {
            return Ok(PrimaryShareOutcome::RejectedConditionAlbum { code });
        }
        let role = roles
            .first()
            .cloned()
            .unwrap_or_else(|| permission.as_str().to_string());
        if let Some(album) = state.albums.iter_mut().find(|a| a.id == album_id) {
            album.share = ShareState::Members {
                targets: targets.iter().map(|t| t.to_lowercase()).collect(),
                roles: [role].into_iter().collect(),
            };
        }
        Ok(PrimaryShareOutcome::Applied)
    }

    async fn trigger_reindex(&self, _scope: &ReindexScope) -> Result<(), RemoteError> {
        self.state.lock().unwrap().reindex_calls += 1;
        Ok(())
    }

    async fn index_status(&self) -> Result<IndexStatus, RemoteError> {
        Ok(IndexStatus::Idle)
    }
}

pub fn condition_album(id: i64, name: &str, folder: i64) -> Album {
    Album {
        id: AlbumId::new(id),
        name: name.to_string(),
        kind: AlbumKind::Condition,
        folder_ids: vec![FolderId::new(folder)],
        share: ShareState::Private,
    }
}

// ============================================================================
// FakeWebSharing / FakeAuth / FakeMounts
// ============================================================================

#[derive(Default)]
pub struct FakeWebSharing {
    pub calls: AtomicU32,
    pub fail: bool,
    /// Target names with no matching user or group (lowercase)
    pub unknown: Vec<String>,
    /// Service whose albums record the applied members, like the remote
    /// `sharing_info`
    pub service: Option<Arc<FakeAlbumService>>,
}

impl FakeWebSharing {
    fn is_unknown(&self, target: &str) -> bool {
        self.unknown.contains(&target.to_lowercase())
    }
}

#[async_trait::async_trait]
impl IWebSharing for FakeWebSharing {
    async fn apply_private_sharing(
        &self,
        target_label: &str,
        targets: &[String],
        permission: Permission,
        roles: &[String],
        policy_ref: SharePolicyRef,
    ) -> Result<FallbackShare, ShareError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (unresolved, applied): (Vec<String>, Vec<String>) =
            targets.iter().cloned().partition(|t| self.is_unknown(t));
        if self.fail || applied.is_empty() {
            return Err(ShareError::NoResolvableTargets(target_label.to_string()));
        }
        if let Some(service) = &self.service {
            let SharePolicyRef::Album(album_id) = policy_ref;
            let role = roles
                .first()
                .cloned()
                .unwrap_or_else(|| permission.as_str().to_string());
            let mut state = service.state.lock().unwrap();
            if let Some(album) = state.albums.iter_mut().find(|a| a.id == album_id) {
                album.share = ShareState::Members {
                    targets: applied.iter().map(|t| t.to_lowercase()).collect(),
                    roles: [role].into_iter().collect(),
                };
            }
        }
        Ok(FallbackShare {
            passphrase: "AbCdEf123".into(),
            applied_targets: applied,
            unresolved_targets: unresolved,
        })
    }

    async fn unresolved_targets(&self, targets: &[String]) -> Result<Vec<String>, ShareError> {
        Ok(targets
            .iter()
            .filter(|t| self.is_unknown(t))
            .cloned()
            .collect())
    }

    fn format_public_share_url(&self, passphrase: &str) -> String {
        format!("https://nas.local:5001/photo/share/{passphrase}")
    }
}

#[derive(Default)]
pub struct FakeAuth {
    pub logins: AtomicU32,
    pub reject: bool,
}

#[async_trait::async_trait]
impl IAuthSession for FakeAuth {
    async fn login(&self) -> Result<(), AuthError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            Err(AuthError::Rejected { code: 400 })
        } else {
            Ok(())
        }
    }

    fn is_authenticated(&self) -> bool {
        !self.reject && self.logins.load(Ordering::SeqCst) > 0
    }

    async fn logout(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Mount primitive reporting bind mounts as unsupported
pub struct NoMounts;

#[async_trait::async_trait]
impl IMountPrimitive for NoMounts {
    fn availability(&self) -> MountAvailability {
        MountAvailability::Unavailable("test host".into())
    }

    async fn bind_mount(&self, _source: &Path, _target: &Path) -> Result<(), MountError> {
        Err(MountError::Unsupported("test host".into()))
    }

    async fn unmount(&self, _target: &Path) -> Result<(), MountError> {
        Err(MountError::Unsupported("test host".into()))
    }

    async fn mounted_targets(&self) -> Result<Vec<PathBuf>, MountError> {
        Ok(Vec::new())
    }

    async fn is_bound_to(&self, _source: &Path, _target: &Path) -> Result<bool, MountError> {
        Ok(false)
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Configuration pointing every path at `base`, with instant index waits
pub fn test_config(base: &Path) -> ConfigBuilder {
    ConfigBuilder::new()
        .dsm_host("nas.local")
        .dsm_username("alice")
        .personal_homes_root(base.join("homes"))
        .shared_photo_root(base.join("photo"))
        .indexing_wait_attempts(3)
        .indexing_wait_delay_secs(1)
        .indexing_settle_secs(0)
}

pub struct Harness {
    pub runner: SyncRunner,
    pub service: Arc<FakeAlbumService>,
    pub web: Arc<FakeWebSharing>,
    pub auth: Arc<FakeAuth>,
}

pub fn harness(config: Config, service: Arc<FakeAlbumService>) -> Harness {
    harness_with(config, service, FakeWebSharing::default(), FakeAuth::default())
}

pub fn harness_with(
    config: Config,
    service: Arc<FakeAlbumService>,
    web: FakeWebSharing,
    auth: FakeAuth,
) -> Harness {
    let web = Arc::new(web);
    let auth = Arc::new(auth);
    let runner = SyncRunner::new(
        config,
        auth.clone(),
        service.clone(),
        web.clone(),
        Arc::new(NoMounts),
    );
    Harness {
        runner,
        service,
        web,
        auth,
    }
}

/// Folder table for the `team_family` and `team_projects` shared roots
pub fn shared_index() -> Vec<FolderIndexEntry> {
    vec![
        FolderIndexEntry::new(1, "/photos-shared", None),
        FolderIndexEntry::new(100, "/photos-shared/mount_team_family", Some(1)),
        FolderIndexEntry::new(101, "/photos-shared/mount_team_family/2024", Some(100)),
        FolderIndexEntry::new(102, "/photos-shared/mount_team_family/Shared", Some(100)),
        FolderIndexEntry::new(200, "/photos-shared/mount_team_projects", Some(1)),
        FolderIndexEntry::new(201, "/photos-shared/mount_team_projects/Launch", Some(200)),
    ]
}
