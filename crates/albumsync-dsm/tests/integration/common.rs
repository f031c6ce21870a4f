//! Shared test helpers for DSM adapter integration tests
//!
//! Provides a wiremock server emulating `/webapi/entry.cgi`. Requests are
//! told apart by the `api` and `method` form fields in the POST body.

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use albumsync_dsm::client::{DsmClient, Session, ENTRY_PATH};

/// Starts a mock server and returns a client pointing at it
pub async fn setup_dsm_mock() -> (MockServer, Arc<DsmClient>) {
    let server = MockServer::start().await;
    let client = Arc::new(DsmClient::with_base_url(&server.uri()).unwrap());
    (server, client)
}

/// Same as [`setup_dsm_mock`] with a session already installed
pub async fn setup_logged_in() -> (MockServer, Arc<DsmClient>) {
    let (server, client) = setup_dsm_mock().await;
    client.set_session(Some(Session {
        sid: "sid-test".to_string(),
        synotoken: Some("token-test".to_string()),
    }));
    (server, client)
}

/// Matcher for one `api`/`method` pair on the entry point
pub fn api_call(api: &str, api_method: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path(ENTRY_PATH))
        .and(body_string_contains(format!("api={api}&")))
        .and(body_string_contains(format!("method={api_method}&")))
}

/// Successful envelope around `data`
pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": data}))
}

/// Failed envelope with `code`
pub fn api_error(code: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": false, "error": {"code": code}}))
}

/// Mounts a successful response for `api`/`method`
pub async fn mount_ok(server: &MockServer, api: &str, api_method: &str, data: Value) {
    api_call(api, api_method)
        .respond_with(ok(data))
        .mount(server)
        .await;
}
