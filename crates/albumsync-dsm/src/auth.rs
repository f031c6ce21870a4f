//! DSM session authentication
//!
//! Logs in through `SYNO.API.Auth` with `format=sid` and
//! `enable_syno_token=yes`, then installs the returned session id and
//! SynoToken on the shared [`DsmClient`]. Accounts with two-factor
//! authentication are supported through a base32 TOTP secret from which a
//! fresh one-time code is derived at login.
//!
//! ## Components
//!
//! - [`Credentials`] - Account name, password and optional OTP secret
//! - [`totp_code`] - One-time code generation
//! - [`DsmAuthSession`] - [`IAuthSession`] implementation

use std::fmt;
use std::sync::Arc;

use albumsync_core::domain::errors::{AuthError, RemoteError};
use albumsync_core::ports::IAuthSession;
use serde::Deserialize;
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::{debug, info, warn};

use crate::client::{DsmClient, Session};

/// Environment variable holding the account password
pub const PASSWORD_ENV: &str = "SYNOLOGY_PASSWORD";

/// Environment variable holding the base32 TOTP secret
pub const OTP_SECRET_ENV: &str = "SYNOLOGY_OTP_SECRET";

const AUTH_API: &str = "SYNO.API.Auth";
const AUTH_VERSION: u32 = 6;
const SESSION_NAME: &str = "SynologyPhotos";

/// Login error code asking for a one-time password
const OTP_REQUIRED_CODE: i64 = 403;

// ============================================================================
// Credentials
// ============================================================================

/// Login credentials for the DSM account
#[derive(Clone)]
pub struct Credentials {
    /// DSM account name
    pub username: String,
    password: String,
    otp_secret: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("otp_secret", &self.otp_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Creates credentials without a one-time password secret
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            otp_secret: None,
        }
    }

    /// Adds a base32 TOTP secret
    pub fn with_otp_secret(mut self, secret: impl Into<String>) -> Self {
        self.otp_secret = Some(secret.into());
        self
    }

    /// Reads the password and OTP secret from the process environment
    pub fn from_env(username: &str) -> Result<Self, AuthError> {
        Self::from_lookup(username, |key| std::env::var(key).ok())
    }

    /// Reads the password and OTP secret through `lookup`
    ///
    /// Blank values count as absent.
    pub fn from_lookup(
        username: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::MissingCredentials("dsm.username".to_string()));
        }
        let password = lookup(PASSWORD_ENV)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AuthError::MissingCredentials(PASSWORD_ENV.to_string()))?;
        let otp_secret = lookup(OTP_SECRET_ENV).filter(|value| !value.trim().is_empty());
        Ok(Self {
            username: username.trim().to_string(),
            password,
            otp_secret,
        })
    }

    /// Whether a one-time code will be sent at login
    pub fn has_otp(&self) -> bool {
        self.otp_secret.is_some()
    }

    fn one_time_code(&self) -> Result<Option<String>, AuthError> {
        self.otp_secret.as_deref().map(totp_code).transpose()
    }
}

/// Derives the current six-digit TOTP code (SHA-1, 30 s step)
///
/// Whitespace and lowercase in the secret are tolerated, as authenticator
/// apps often display it grouped.
pub fn totp_code(secret_base32: &str) -> Result<String, AuthError> {
    let normalized: String = secret_base32
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    let bytes = Secret::Encoded(normalized)
        .to_bytes()
        .map_err(|e| AuthError::InvalidOtpSecret(format!("{e:?}")))?;
    let totp = TOTP::new_unchecked(Algorithm::SHA1, 6, 1, 30, bytes);
    totp.generate_current()
        .map_err(|e| AuthError::InvalidOtpSecret(e.to_string()))
}

// ============================================================================
// DsmAuthSession
// ============================================================================

#[derive(Debug, Deserialize)]
struct LoginData {
    sid: Option<String>,
    synotoken: Option<String>,
}

/// [`IAuthSession`] backed by `SYNO.API.Auth`
pub struct DsmAuthSession {
    client: Arc<DsmClient>,
    credentials: Credentials,
}

impl DsmAuthSession {
    /// Creates an auth session that installs its session on `client`
    pub fn new(client: Arc<DsmClient>, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    fn login_params(&self) -> Result<Vec<(&'static str, String)>, AuthError> {
        let mut params = vec![
            ("account", self.credentials.username.clone()),
            ("passwd", self.credentials.password.clone()),
            ("session", SESSION_NAME.to_string()),
            ("format", "sid".to_string()),
            ("enable_syno_token", "yes".to_string()),
        ];
        if let Some(code) = self.credentials.one_time_code()? {
            params.push(("otp_code", code));
        }
        Ok(params)
    }
}

#[async_trait::async_trait]
impl IAuthSession for DsmAuthSession {
    async fn login(&self) -> Result<(), AuthError> {
        if self.client.session().is_some() {
            debug!("DSM session already established");
            return Ok(());
        }

        let params = self.login_params()?;
        let data: LoginData = self
            .client
            .call_as(AUTH_API, "login", AUTH_VERSION, &params)
            .await
            .map_err(|err| match err {
                RemoteError::Api { code, .. } if code == OTP_REQUIRED_CODE => {
                    AuthError::OtpRequired
                }
                RemoteError::Api { code, .. } => AuthError::Rejected { code },
                other => AuthError::Transport(other.to_string()),
            })?;

        let sid = data
            .sid
            .filter(|sid| !sid.is_empty())
            .ok_or_else(|| AuthError::Transport("login response carried no sid".to_string()))?;
        if data.synotoken.is_none() {
            warn!("DSM login returned no SynoToken; continuing with sid only");
        }

        self.client.set_session(Some(Session {
            sid,
            synotoken: data.synotoken,
        }));
        info!(
            username = %self.credentials.username,
            otp = self.credentials.has_otp(),
            "Logged in to DSM"
        );
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.client.session().is_some()
    }

    async fn logout(&self) -> Result<(), AuthError> {
        if self.client.session().is_none() {
            return Ok(());
        }
        let result = self
            .client
            .call(
                AUTH_API,
                "logout",
                AUTH_VERSION,
                &[("session", SESSION_NAME.to_string())],
            )
            .await;
        self.client.set_session(None);
        match result {
            Ok(_) => {
                info!("Logged out of DSM");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "DSM logout failed; session dropped locally");
                Err(AuthError::Transport(err.to_string()))
            }
        }
    }
}
