//! Session login, logout and error classification

use std::sync::Arc;

use albumsync_core::domain::errors::{AuthError, RemoteError};
use albumsync_core::ports::IAuthSession;
use albumsync_dsm::auth::{Credentials, DsmAuthSession};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header};
use wiremock::ResponseTemplate;

use crate::common::{api_call, api_error, mount_ok, ok, setup_dsm_mock, setup_logged_in};

fn session(client: Arc<albumsync_dsm::DsmClient>) -> DsmAuthSession {
    DsmAuthSession::new(client, Credentials::new("alice", "s3cret"))
}

#[tokio::test]
async fn login_installs_sid_and_token_for_later_calls() {
    let (server, client) = setup_dsm_mock().await;
    api_call("SYNO.API.Auth", "login")
        .and(body_string_contains("account=alice"))
        .and(body_string_contains("enable_syno_token=yes"))
        .respond_with(ok(json!({"sid": "sid-1", "synotoken": "tok-1"})))
        .expect(1)
        .mount(&server)
        .await;
    api_call("SYNO.Foto.Index", "get")
        .and(body_string_contains("_sid=sid-1"))
        .and(header("X-SYNO-TOKEN", "tok-1"))
        .respond_with(ok(json!({"is_running": false})))
        .expect(1)
        .mount(&server)
        .await;

    let auth = session(client.clone());
    auth.login().await.expect("login failed");
    assert!(auth.is_authenticated());

    // Second login is a no-op.
    auth.login().await.unwrap();

    client.call("SYNO.Foto.Index", "get", 1, &[]).await.unwrap();
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (server, client) = setup_dsm_mock().await;
    api_call("SYNO.API.Auth", "login")
        .respond_with(api_error(400))
        .mount(&server)
        .await;

    let auth = session(client);
    let err = auth.login().await.unwrap_err();

    assert_eq!(err, AuthError::Rejected { code: 400 });
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn two_factor_account_without_secret_needs_otp() {
    let (server, client) = setup_dsm_mock().await;
    api_call("SYNO.API.Auth", "login")
        .respond_with(api_error(403))
        .mount(&server)
        .await;

    let err = session(client).login().await.unwrap_err();
    assert_eq!(err, AuthError::OtpRequired);
}

#[tokio::test]
async fn otp_secret_sends_one_time_code() {
    let (server, client) = setup_dsm_mock().await;
    api_call("SYNO.API.Auth", "login")
        .and(body_string_contains("otp_code="))
        .respond_with(ok(json!({"sid": "sid-2", "synotoken": "tok-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials::new("alice", "s3cret").with_otp_secret("JBSWY3DPEHPK3PXP");
    let auth = DsmAuthSession::new(client, credentials);
    auth.login().await.expect("login with otp failed");
    assert!(auth.is_authenticated());
}

#[tokio::test]
async fn login_without_sid_is_a_transport_error() {
    let (server, client) = setup_dsm_mock().await;
    mount_ok(&server, "SYNO.API.Auth", "login", json!({})).await;

    let err = session(client).login().await.unwrap_err();
    assert!(matches!(err, AuthError::Transport(_)));
}

#[tokio::test]
async fn logout_clears_session() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.API.Auth", "logout")
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let auth = session(client.clone());
    assert!(auth.is_authenticated());
    auth.logout().await.unwrap();
    assert!(!auth.is_authenticated());
    assert!(client.session().is_none());
}

#[tokio::test]
async fn expired_session_code_is_classified() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.Foto.Browse.Album", "list")
        .respond_with(api_error(119))
        .mount(&server)
        .await;

    let err = client
        .call("SYNO.Foto.Browse.Album", "list", 1, &[])
        .await
        .unwrap_err();
    assert_eq!(err, RemoteError::SessionExpired { code: 119 });
}

#[tokio::test]
async fn http_failures_are_transient() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.Foto.Index", "get")
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    api_call("SYNO.Foto.Index", "reindex")
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = client.call("SYNO.Foto.Index", "get", 1, &[]).await.unwrap_err();
    assert!(matches!(err, RemoteError::Server { status: 503, .. }));
    assert!(err.is_transient());

    let err = client
        .call("SYNO.Foto.Index", "reindex", 1, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::RateLimited(ref m) if m.contains('7')));
    assert!(err.is_transient());
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let (server, client) = setup_logged_in().await;
    api_call("SYNO.Foto.Index", "get")
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client.call("SYNO.Foto.Index", "get", 1, &[]).await.unwrap_err();
    assert!(matches!(err, RemoteError::InvalidResponse(_)));
    assert!(!err.is_transient());
}
