//! Album listing, creation, deletion and primary sharing

use albumsync_core::config::SharingConfig;
use albumsync_core::domain::errors::RemoteError;
use albumsync_core::domain::{AlbumId, AlbumKind, FolderId, Permission, ShareState};
use albumsync_core::ports::{IAlbumService, PrimaryShareOutcome};
use albumsync_dsm::photos::SynologyPhotos;
use serde_json::{json, Value};
use wiremock::matchers::body_string_contains;

use crate::common::{api_call, api_error, ok, setup_logged_in};

fn album_row(id: i64, name: &str, folder: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": "condition",
        "condition": {"folder_filter": [folder], "user_id": 3, "item_type": []}
    })
}

#[tokio::test]
async fn albums_are_fetched_across_pages() {
    let (server, client) = setup_logged_in().await;
    let first: Vec<Value> = (0..500)
        .map(|i| album_row(i, &format!("album {i}"), 1000 + i))
        .collect();
    api_call("SYNO.Foto.Browse.Album", "list")
        .and(body_string_contains("offset=0&"))
        .respond_with(ok(json!({"list": first})))
        .expect(1)
        .mount(&server)
        .await;
    api_call("SYNO.Foto.Browse.Album", "list")
        .and(body_string_contains("offset=500&"))
        .respond_with(ok(json!({"list": [{
            "id": 900,
            "name": "team_family - 2024",
            "type": "condition",
            "condition": {"folder_filter": [101]},
            "sharing_info": {
                "passphrase": "AbCd",
                "permission": [{"role": "view", "member": {"id": 2, "type": "group", "name": "family"}}]
            }
        }]})))
        .expect(1)
        .mount(&server)
        .await;

    let photos = SynologyPhotos::new(client, &SharingConfig::default());
    let albums = photos.fetch_albums().await.unwrap();

    assert_eq!(albums.len(), 501);
    let last = &albums[500];
    assert_eq!(last.id, AlbumId::new(900));
    assert_eq!(last.kind, AlbumKind::Condition);
    assert_eq!(last.bound_folder(), Some(FolderId::new(101)));
    assert!(matches!(last.share, ShareState::Members { .. }));
}

#[tokio::test]
async fn create_album_binds_folder_and_user_once() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.Foto.UserInfo", "me")
        .respond_with(ok(json!({"id": 3, "name": "alice"})))
        .expect(1)
        .mount(&server)
        .await;
    api_call("SYNO.Foto.Browse.ConditionAlbum", "create")
        .and(body_string_contains("%22folder_filter%22%3A%5B101%5D"))
        .and(body_string_contains("%22user_id%22%3A3"))
        .respond_with(ok(json!({"album": {"id": 77}})))
        .expect(1)
        .mount(&server)
        .await;
    api_call("SYNO.Foto.Browse.ConditionAlbum", "create")
        .and(body_string_contains("%22folder_filter%22%3A%5B102%5D"))
        .respond_with(ok(json!({"album": {"id": 78}})))
        .expect(1)
        .mount(&server)
        .await;

    let photos = SynologyPhotos::new(client, &SharingConfig::default());
    let first = photos
        .create_album("team_family - 2024", FolderId::new(101))
        .await
        .unwrap();
    let second = photos
        .create_album("team_family - Shared", FolderId::new(102))
        .await
        .unwrap();

    assert_eq!(first, AlbumId::new(77));
    assert_eq!(second, AlbumId::new(78));
}

#[tokio::test]
async fn delete_album_sends_id_list() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.Foto.Browse.Album", "delete")
        .and(body_string_contains("id=%5B7%5D"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let photos = SynologyPhotos::new(client, &SharingConfig::default());
    photos.delete_album(AlbumId::new(7)).await.unwrap();
}

#[tokio::test]
async fn primary_share_applies() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.Foto.Sharing.Album", "set_shared")
        .and(body_string_contains("album_id=5&"))
        .and(body_string_contains("permission=download"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let photos = SynologyPhotos::new(client, &SharingConfig::default());
    let outcome = photos
        .share_album(
            AlbumId::new(5),
            &["family".to_string()],
            Permission::Download,
            &[],
        )
        .await
        .unwrap();
    assert_eq!(outcome, PrimaryShareOutcome::Applied);
}

#[tokio::test]
async fn configured_rejection_code_is_tagged() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.Foto.Sharing.Album", "set_shared")
        .respond_with(api_error(120))
        .mount(&server)
        .await;

    let photos = SynologyPhotos::new(client, &SharingConfig::default());
    let outcome = photos
        .share_album(AlbumId::new(5), &["family".to_string()], Permission::View, &[])
        .await
        .unwrap();
    assert_eq!(outcome, PrimaryShareOutcome::RejectedConditionAlbum { code: 120 });
}

#[tokio::test]
async fn other_share_errors_are_not_tagged() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.Foto.Sharing.Album", "set_shared")
        .respond_with(api_error(105))
        .mount(&server)
        .await;

    let photos = SynologyPhotos::new(client, &SharingConfig::default());
    let err = photos
        .share_album(AlbumId::new(5), &["family".to_string()], Permission::View, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Api { code: 105, .. }));
}
