//! Passphrase fallback: identity resolution, link creation, invites

use std::sync::Arc;

use albumsync_core::config::{DsmConfig, SharingConfig};
use albumsync_core::domain::errors::ShareError;
use albumsync_core::domain::{AlbumId, Permission};
use albumsync_core::ports::{IWebSharing, SharePolicyRef};
use albumsync_dsm::sharing::SynologyWebSharing;
use albumsync_dsm::DsmClient;
use serde_json::json;
use wiremock::matchers::body_string_contains;
use wiremock::MockServer;

use crate::common::{api_call, api_error, ok, setup_logged_in};

fn web_sharing(client: Arc<DsmClient>) -> SynologyWebSharing {
    let dsm = DsmConfig {
        host: "nas.local".to_string(),
        port: 5001,
        ..Default::default()
    };
    SynologyWebSharing::new(client, &dsm, &SharingConfig::default())
}

async fn mount_identities(server: &MockServer, expected_calls: u64) {
    api_call("SYNO.Foto.Sharing.Misc", "list_user_group")
        .respond_with(ok(json!({"list": [
            {"id": 1001, "type": "user", "name": "Grandma"},
            {"id": 2, "type": "group", "name": "family"}
        ]})))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn fallback_creates_link_and_one_invite_per_member() {
    let (server, client) = setup_logged_in().await;
    mount_identities(&server, 1).await;
    api_call("SYNO.Foto.Sharing.Passphrase", "set_shared")
        .and(body_string_contains("policy=album&"))
        .and(body_string_contains("album_id=42&"))
        .and(body_string_contains("privacy_type=private&"))
        .respond_with(ok(json!({"passphrase": "AbCdEf123"})))
        .expect(1)
        .mount(&server)
        .await;
    api_call("SYNO.Foto.Sharing.Passphrase", "update")
        .and(body_string_contains("passphrase=AbCdEf123&"))
        .respond_with(ok(json!(null)))
        .expect(2)
        .mount(&server)
        .await;

    let web = web_sharing(client);
    let share = web
        .apply_private_sharing(
            "team_family - 2024",
            &targets(&["family", "GRANDMA", "ghost"]),
            Permission::View,
            &[],
            SharePolicyRef::Album(AlbumId::new(42)),
        )
        .await
        .unwrap();

    assert_eq!(share.passphrase, "AbCdEf123");
    assert_eq!(share.applied_targets, vec!["family", "Grandma"]);
    assert_eq!(share.unresolved_targets, vec!["ghost"]);
    assert_eq!(
        web.format_public_share_url(&share.passphrase),
        "https://nas.local:5001/photo/share/AbCdEf123"
    );
}

#[tokio::test]
async fn identities_are_resolved_once_per_instance() {
    let (server, client) = setup_logged_in().await;
    mount_identities(&server, 1).await;
    api_call("SYNO.Foto.Sharing.Passphrase", "set_shared")
        .respond_with(ok(json!({"passphrase": "p1"})))
        .mount(&server)
        .await;
    api_call("SYNO.Foto.Sharing.Passphrase", "update")
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;

    let web = web_sharing(client);
    for id in [1, 2] {
        web.apply_private_sharing(
            "album",
            &targets(&["family"]),
            Permission::Download,
            &["viewer".to_string()],
            SharePolicyRef::Album(AlbumId::new(id)),
        )
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn no_resolvable_target_skips_link_creation() {
    let (server, client) = setup_logged_in().await;
    mount_identities(&server, 1).await;
    api_call("SYNO.Foto.Sharing.Passphrase", "set_shared")
        .respond_with(ok(json!({"passphrase": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let err = web_sharing(client)
        .apply_private_sharing(
            "album",
            &targets(&["ghost"]),
            Permission::View,
            &[],
            SharePolicyRef::Album(AlbumId::new(1)),
        )
        .await
        .unwrap_err();

    assert_eq!(err, ShareError::NoResolvableTargets("album".to_string()));
}

#[tokio::test]
async fn missing_passphrase_is_an_error() {
    let (server, client) = setup_logged_in().await;
    mount_identities(&server, 1).await;
    api_call("SYNO.Foto.Sharing.Passphrase", "set_shared")
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;

    let err = web_sharing(client)
        .apply_private_sharing(
            "album",
            &targets(&["family"]),
            Permission::View,
            &[],
            SharePolicyRef::Album(AlbumId::new(1)),
        )
        .await
        .unwrap_err();

    assert_eq!(err, ShareError::MissingPassphrase("album".to_string()));
}

#[tokio::test]
async fn rejected_invite_update_does_not_fail_the_share() {
    let (server, client) = setup_logged_in().await;
    mount_identities(&server, 1).await;
    api_call("SYNO.Foto.Sharing.Passphrase", "set_shared")
        .respond_with(ok(json!({"passphrase": "p2"})))
        .mount(&server)
        .await;
    api_call("SYNO.Foto.Sharing.Passphrase", "update")
        .respond_with(api_error(641))
        .expect(1)
        .mount(&server)
        .await;

    let share = web_sharing(client)
        .apply_private_sharing(
            "album",
            &targets(&["family"]),
            Permission::View,
            &[],
            SharePolicyRef::Album(AlbumId::new(1)),
        )
        .await
        .unwrap();
    assert_eq!(share.applied_targets, vec!["family"]);
}

#[tokio::test]
async fn unresolved_targets_lists_unknown_names_without_sharing() {
    let (server, client) = setup_logged_in().await;
    mount_identities(&server, 1).await;
    api_call("SYNO.Foto.Sharing.Passphrase", "set_shared")
        .respond_with(ok(json!({"passphrase": "unused"})))
        .expect(0)
        .mount(&server)
        .await;

    let web = web_sharing(client);
    let unresolved = web
        .unresolved_targets(&targets(&["Family", "ghost", "grandma"]))
        .await
        .unwrap();
    assert_eq!(unresolved, vec!["ghost"]);

    let again = web.unresolved_targets(&targets(&["nobody"])).await.unwrap();
    assert_eq!(again, vec!["nobody"]);
}
