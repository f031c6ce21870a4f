//! Folder index, reindex trigger and index status

use albumsync_core::config::SharingConfig;
use albumsync_core::domain::errors::RemoteError;
use albumsync_core::domain::{FolderIndexEntry, IndexPath};
use albumsync_core::ports::{IAlbumService, IndexStatus, ReindexScope};
use albumsync_dsm::photos::SynologyPhotos;
use serde_json::json;
use wiremock::matchers::body_string_contains;

use crate::common::{api_call, api_error, mount_ok, ok, setup_logged_in};

#[tokio::test]
async fn folder_index_rows_become_entries() {
    let (server, client) = setup_logged_in().await;
    mount_ok(
        &server,
        "SYNO.Foto.Search.Filter",
        "list",
        json!({"folder_filter": [
            {"id": 1, "name": "/photos-shared", "parent": 0},
            {"id": 100, "name": "/photos-shared/mount_team_family", "parent": 1},
            {"id": 101, "name": "/photos-shared/mount_team_family/2024", "parent": 100},
            {"id": 999, "name": "", "parent": 1}
        ]}),
    )
    .await;

    let photos = SynologyPhotos::new(client, &SharingConfig::default());
    let entries = photos.fetch_folder_index().await.unwrap();

    assert_eq!(
        entries,
        vec![
            FolderIndexEntry::new(1, "/photos-shared", None),
            FolderIndexEntry::new(100, "/photos-shared/mount_team_family", Some(1)),
            FolderIndexEntry::new(101, "/photos-shared/mount_team_family/2024", Some(100)),
        ]
    );
    assert_eq!(entries[2].path, IndexPath::new("photos-shared/mount_team_family/2024"));
}

#[tokio::test]
async fn folder_index_failure_surfaces() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.Foto.Search.Filter", "list")
        .respond_with(api_error(117))
        .mount(&server)
        .await;

    let photos = SynologyPhotos::new(client, &SharingConfig::default());
    let err = photos.fetch_folder_index().await.unwrap_err();
    assert!(matches!(err, RemoteError::Api { code: 117, .. }));
}

#[tokio::test]
async fn reindex_requests_basic_scan_for_any_scope() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.Foto.Index", "reindex")
        .and(body_string_contains("type=basic"))
        .respond_with(ok(json!(null)))
        .expect(2)
        .mount(&server)
        .await;

    let photos = SynologyPhotos::new(client, &SharingConfig::default());
    photos.trigger_reindex(&ReindexScope::Global).await.unwrap();
    photos
        .trigger_reindex(&ReindexScope::Path(IndexPath::new("/Family/Trips")))
        .await
        .unwrap();
}

#[tokio::test]
async fn index_status_reports_busy_and_idle() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.Foto.Index", "get")
        .respond_with(ok(json!({"status": "running"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_ok(&server, "SYNO.Foto.Index", "get", json!({"is_running": 0})).await;

    let photos = SynologyPhotos::new(client, &SharingConfig::default());
    assert_eq!(photos.index_status().await.unwrap(), IndexStatus::Busy);
    assert_eq!(photos.index_status().await.unwrap(), IndexStatus::Idle);
}
