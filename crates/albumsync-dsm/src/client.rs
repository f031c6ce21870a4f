//! DSM web API client
//!
//! Every Synology API call is a form-encoded POST to `/webapi/entry.cgi`
//! carrying `api`, `method` and `version`, answered by a JSON envelope
//! `{"success": bool, "data": {...}, "error": {"code": n}}`. This module
//! owns the HTTP client, the session id and SynoToken, and the mapping of
//! transport and envelope failures onto [`RemoteError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use albumsync_dsm::client::DsmClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DsmClient::with_base_url("https://nas.local:5001")?;
//! let data = client
//!     .call("SYNO.Foto.Index", "get", 1, &[])
//!     .await?;
//! println!("{data}");
//! # Ok(())
//! # }
//! ```

use std::sync::RwLock;
use std::time::Duration;

use albumsync_core::config::DsmConfig;
use albumsync_core::domain::errors::RemoteError;
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

/// Path of the unified API endpoint
pub const ENTRY_PATH: &str = "/webapi/entry.cgi";

/// Envelope codes meaning the session id is no longer valid
const SESSION_ERROR_CODES: &[i64] = &[106, 107, 119];

// ============================================================================
// Envelope types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    code: i64,
}

/// An authenticated DSM session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Value sent as `_sid`
    pub sid: String,
    /// CSRF token sent as `X-SYNO-TOKEN`, when the login returned one
    pub synotoken: Option<String>,
}

// ============================================================================
// DsmClient
// ============================================================================

/// HTTP client for the DSM web API
///
/// The session is held behind a lock so adapters sharing one client through
/// an `Arc` all see a login or logout immediately.
pub struct DsmClient {
    /// The underlying HTTP client
    client: Client,
    /// Entry point URL, e.g. `https://nas.local:5001/webapi/entry.cgi`
    endpoint: Url,
    /// Current session, if logged in
    session: RwLock<Option<Session>>,
}

impl DsmClient {
    /// Creates a client from the `dsm` configuration section
    ///
    /// Honors `timeout_secs` and `verify_tls`; DSM boxes commonly serve a
    /// self-signed certificate.
    pub fn new(config: &DsmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .context("Failed to build HTTP client")?;
        Self::from_parts(client, &config.base_url())
    }

    /// Creates a client against a custom base URL (useful for testing)
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::from_parts(Client::new(), base_url)
    }

    fn from_parts(client: Client, base_url: &str) -> Result<Self> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(ENTRY_PATH))
            .with_context(|| format!("Invalid DSM base URL: {base_url}"))?;
        Ok(Self {
            client,
            endpoint,
            session: RwLock::new(None),
        })
    }

    /// Full URL of the API endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns a copy of the current session
    pub fn session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|guard| guard.clone())
    }

    /// Installs (or clears) the session used by subsequent calls
    pub fn set_session(&self, session: Option<Session>) {
        if let Ok(mut guard) = self.session.write() {
            *guard = session;
        }
    }

    /// Calls one API method and returns the envelope's `data` member
    ///
    /// # Arguments
    /// * `api` - API name, e.g. `SYNO.Foto.Browse.Album`
    /// * `method` - Method name, e.g. `list`
    /// * `version` - API version
    /// * `params` - Additional form fields (JSON-valued fields pre-encoded)
    ///
    /// # Returns
    /// `Value::Null` when a successful envelope carries no data.
    pub async fn call(
        &self,
        api: &str,
        method: &str,
        version: u32,
        params: &[(&str, String)],
    ) -> Result<Value, RemoteError> {
        let mut form: Vec<(&str, String)> = Vec::with_capacity(params.len() + 4);
        form.push(("api", api.to_string()));
        form.push(("method", method.to_string()));
        form.push(("version", version.to_string()));
        form.extend(params.iter().cloned());

        let session = self.session();
        let mut request = self.client.post(self.endpoint.clone());
        if let Some(session) = &session {
            form.push(("_sid", session.sid.clone()));
            if let Some(token) = &session.synotoken {
                request = request.header("X-SYNO-TOKEN", token);
            }
        }

        debug!(api, method, version, "DSM request");
        let response = request
            .form(&form)
            .send()
            .await
            .map_err(|err| map_transport_error(api, method, err))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unspecified")
                .to_string();
            return Err(RemoteError::RateLimited(format!(
                "{api} {method}: retry after {retry_after}"
            )));
        }
        if status.is_server_error() {
            return Err(RemoteError::Server {
                status: status.as_u16(),
                message: format!("{api} {method}"),
            });
        }
        if !status.is_success() {
            return Err(RemoteError::InvalidResponse(format!(
                "{api} {method}: HTTP {status}"
            )));
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|err| RemoteError::InvalidResponse(format!("{api} {method}: {err}")))?;
        trace!(api, method, success = envelope.success, "DSM response");

        if envelope.success {
            return Ok(envelope.data.unwrap_or(Value::Null));
        }

        let code = envelope.error.map(|e| e.code).unwrap_or(100);
        if session.is_some() && SESSION_ERROR_CODES.contains(&code) {
            return Err(RemoteError::SessionExpired { code });
        }
        Err(RemoteError::Api {
            code,
            message: format!("{api} {method}"),
        })
    }

    /// Calls one API method and deserializes `data` into `T`
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        api: &str,
        method: &str,
        version: u32,
        params: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let data = self.call(api, method, version, params).await?;
        serde_json::from_value(data)
            .map_err(|err| RemoteError::InvalidResponse(format!("{api} {method}: {err}")))
    }
}

fn map_transport_error(api: &str, method: &str, err: reqwest::Error) -> RemoteError {
    let detail = format!("{api} {method}: {err}");
    if err.is_timeout() {
        RemoteError::Timeout(detail)
    } else {
        RemoteError::Network(detail)
    }
}
