//! SynologyPhotos - IAlbumService implementation for the Synology Photos API
//!
//! Wraps the [`DsmClient`] and maps the `SYNO.Foto.*` APIs onto the
//! [`IAlbumService`] port contract.
//!
//! ## Design Notes
//!
//! - The folder index comes from `SYNO.Foto.Search.Filter list`, whose
//!   `folder_filter` rows carry the folder path in `name`.
//! - Condition albums are created through `SYNO.Foto.Browse.ConditionAlbum`
//!   with a condition naming exactly one folder and the session user's id;
//!   the id is fetched once from `SYNO.Foto.UserInfo` and cached.
//! - Share rejections whose code is listed in `fallback_error_codes` come
//!   back as [`PrimaryShareOutcome::RejectedConditionAlbum`]; the engine
//!   never sees raw codes.
//! - No retries happen here; the engine applies its retry policy around
//!   each call.

use std::collections::BTreeSet;
use std::sync::Arc;

use albumsync_core::config::SharingConfig;
use albumsync_core::domain::errors::RemoteError;
use albumsync_core::domain::newtypes::{AlbumId, FolderId};
use albumsync_core::domain::root::Permission;
use albumsync_core::domain::{Album, AlbumKind, FolderIndexEntry, ShareState};
use albumsync_core::ports::{IAlbumService, IndexStatus, PrimaryShareOutcome, ReindexScope};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::client::DsmClient;

/// Albums requested per `Browse.Album list` page
const ALBUM_PAGE_SIZE: usize = 500;

// ============================================================================
// Synology Photos response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct FolderFilterData {
    #[serde(default)]
    folder_filter: Vec<FolderFilterRow>,
}

/// One `folder_filter` row; `name` is the folder's library path
#[derive(Debug, Deserialize)]
struct FolderFilterRow {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    parent: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AlbumListData {
    #[serde(default)]
    list: Vec<AlbumRow>,
}

#[derive(Debug, Deserialize)]
struct AlbumRow {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    condition: Option<ConditionRow>,
    #[serde(default)]
    sharing_info: Option<SharingInfoRow>,
}

#[derive(Debug, Deserialize)]
struct ConditionRow {
    #[serde(default)]
    folder_filter: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct SharingInfoRow {
    #[serde(default)]
    passphrase: Option<String>,
    #[serde(default)]
    permission: Vec<PermissionRow>,
}

#[derive(Debug, Deserialize)]
struct PermissionRow {
    #[serde(default)]
    role: String,
    #[serde(default)]
    member: Option<MemberRow>,
}

#[derive(Debug, Deserialize)]
struct MemberRow {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoData {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CreatedAlbumData {
    album: CreatedAlbum,
}

#[derive(Debug, Deserialize)]
struct CreatedAlbum {
    id: i64,
}

impl From<FolderFilterRow> for FolderIndexEntry {
    fn from(row: FolderFilterRow) -> Self {
        FolderIndexEntry::new(row.id, &row.name, row.parent.filter(|parent| *parent > 0))
    }
}

impl From<AlbumRow> for Album {
    fn from(row: AlbumRow) -> Self {
        let kind = if row.kind.eq_ignore_ascii_case("condition") {
            AlbumKind::Condition
        } else {
            AlbumKind::Normal
        };
        let folder_ids = row
            .condition
            .map(|c| c.folder_filter.into_iter().map(FolderId::new).collect())
            .unwrap_or_default();
        Album {
            id: AlbumId::new(row.id),
            name: row.name,
            kind,
            folder_ids,
            share: observed_share(row.sharing_info),
        }
    }
}

/// Maps the `sharing_info` block onto the observed share state
fn observed_share(info: Option<SharingInfoRow>) -> ShareState {
    let Some(info) = info else {
        return ShareState::Private;
    };
    if info.passphrase.as_deref().map_or(true, str::is_empty) {
        return ShareState::Private;
    }
    let mut targets = BTreeSet::new();
    let mut roles = BTreeSet::new();
    for entry in info.permission {
        if let Some(name) = entry.member.and_then(|m| m.name) {
            targets.insert(name.to_lowercase());
            roles.insert(entry.role.to_lowercase());
        }
    }
    if targets.is_empty() {
        ShareState::PublicLinkOnly
    } else {
        ShareState::Members { targets, roles }
    }
}

/// Reads a running/idle indication from `SYNO.Foto.Index get`
///
/// DSM releases disagree on the field name, so boolean-ish flags and
/// status strings are both accepted.
fn interpret_index_state(data: &Value) -> IndexStatus {
    let busy = |flag: bool| {
        if flag {
            IndexStatus::Busy
        } else {
            IndexStatus::Idle
        }
    };
    for key in ["is_running", "running", "busy"] {
        match data.get(key) {
            Some(Value::Bool(flag)) => return busy(*flag),
            Some(Value::Number(n)) => return busy(n.as_f64().unwrap_or(0.0) != 0.0),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "running" | "busy" => return IndexStatus::Busy,
                "false" | "0" | "idle" | "done" | "finish" | "finished" => {
                    return IndexStatus::Idle
                }
                _ => {}
            },
            _ => {}
        }
    }
    let status = data
        .get("status")
        .or_else(|| data.get("state"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase());
    match status.as_deref() {
        Some("idle" | "ready" | "finish" | "finished" | "done" | "complete") => IndexStatus::Idle,
        Some("busy" | "running" | "processing" | "working") => IndexStatus::Busy,
        _ => IndexStatus::Unknown,
    }
}

// ============================================================================
// SynologyPhotos
// ============================================================================

/// [`IAlbumService`] backed by the Synology Photos web API
pub struct SynologyPhotos {
    client: Arc<DsmClient>,
    /// Share error codes that mean "condition albums cannot be shared"
    fallback_error_codes: Vec<i64>,
    /// Session user's id, needed in album conditions
    user_id: OnceCell<i64>,
}

impl SynologyPhotos {
    /// Creates the adapter over an (eventually) authenticated client
    pub fn new(client: Arc<DsmClient>, sharing: &SharingConfig) -> Self {
        Self {
            client,
            fallback_error_codes: sharing.fallback_error_codes.clone(),
            user_id: OnceCell::new(),
        }
    }

    /// The session user's numeric id
    pub async fn current_user_id(&self) -> Result<i64, RemoteError> {
        self.user_id
            .get_or_try_init(|| async {
                let info: UserInfoData = self
                    .client
                    .call_as("SYNO.Foto.UserInfo", "me", 1, &[])
                    .await?;
                debug!(user_id = info.id, "Resolved Synology Photos user id");
                Ok(info.id)
            })
            .await
            .copied()
    }
}

#[async_trait::async_trait]
impl IAlbumService for SynologyPhotos {
    async fn fetch_folder_index(&self) -> Result<Vec<FolderIndexEntry>, RemoteError> {
        let data: FolderFilterData = self
            .client
            .call_as("SYNO.Foto.Search.Filter", "list", 1, &[])
            .await?;
        let entries: Vec<FolderIndexEntry> = data
            .folder_filter
            .into_iter()
            .filter(|row| !row.name.trim().is_empty())
            .map(FolderIndexEntry::from)
            .collect();
        debug!(entries = entries.len(), "Fetched folder index");
        Ok(entries)
    }

    async fn fetch_albums(&self) -> Result<Vec<Album>, RemoteError> {
        let mut albums = Vec::new();
        let mut offset = 0usize;
        loop {
            let params = [
                ("offset", offset.to_string()),
                ("limit", ALBUM_PAGE_SIZE.to_string()),
                ("additional", json!(["sharing_info"]).to_string()),
            ];
            let page: AlbumListData = self
                .client
                .call_as("SYNO.Foto.Browse.Album", "list", 1, &params)
                .await?;
            let count = page.list.len();
            albums.extend(page.list.into_iter().map(Album::from));
            if count < ALBUM_PAGE_SIZE {
                break;
            }
            offset += count;
        }
        debug!(albums = albums.len(), "Fetched albums");
        Ok(albums)
    }

    async fn create_album(&self, name: &str, folder_id: FolderId) -> Result<AlbumId, RemoteError> {
        let user_id = self.current_user_id().await?;
        let condition = json!({
            "folder_filter": [folder_id.get()],
            "user_id": user_id,
            "item_type": [],
        });
        let params = [
            ("name", name.to_string()),
            ("condition", condition.to_string()),
        ];
        let created: CreatedAlbumData = self
            .client
            .call_as("SYNO.Foto.Browse.ConditionAlbum", "create", 1, &params)
            .await?;
        info!(album = name, album_id = created.album.id, folder_id = %folder_id, "Created album");
        Ok(AlbumId::new(created.album.id))
    }

    async fn delete_album(&self, album_id: AlbumId) -> Result<(), RemoteError> {
        self.client
            .call(
                "SYNO.Foto.Browse.Album",
                "delete",
                1,
                &[("id", json!([album_id.get()]).to_string())],
            )
            .await?;
        info!(album_id = %album_id, "Deleted album");
        Ok(())
    }

    async fn share_album(
        &self,
        album_id: AlbumId,
        targets: &[String],
        permission: Permission,
        roles: &[String],
    ) -> Result<PrimaryShareOutcome, RemoteError> {
        let mut params = vec![
            ("album_id", album_id.get().to_string()),
            ("enabled", "true".to_string()),
            ("privacy_type", "private".to_string()),
            ("users", json!(targets).to_string()),
            ("permission", permission.as_str().to_string()),
        ];
        if !roles.is_empty() {
            params.push(("roles", json!(roles).to_string()));
        }

        match self
            .client
            .call("SYNO.Foto.Sharing.Album", "set_shared", 1, &params)
            .await
        {
            Ok(_) => Ok(PrimaryShareOutcome::Applied),
            Err(RemoteError::Api { code, .. }) if self.fallback_error_codes.contains(&code) => {
                debug!(album_id = %album_id, code, "Primary share rejected for condition album");
                Ok(PrimaryShareOutcome::RejectedConditionAlbum { code })
            }
            Err(err) => Err(err),
        }
    }

    async fn trigger_reindex(&self, scope: &ReindexScope) -> Result<(), RemoteError> {
        if let ReindexScope::Path(path) = scope {
            // The Photos API only reindexes the whole personal space.
            debug!(path = %path, "Targeted reindex requested; using basic reindex");
        }
        self.client
            .call(
                "SYNO.Foto.Index",
                "reindex",
                1,
                &[("type", "basic".to_string())],
            )
            .await?;
        info!("Requested Synology Photos reindex");
        Ok(())
    }

    async fn index_status(&self) -> Result<IndexStatus, RemoteError> {
        let data = self.client.call("SYNO.Foto.Index", "get", 1, &[]).await?;
        let status = interpret_index_state(&data);
        if status == IndexStatus::Unknown {
            warn!("Index status response not recognized");
        }
        Ok(status)
    }
}
