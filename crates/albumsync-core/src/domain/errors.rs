//! Domain error types
//!
//! This module defines the error taxonomy shared by the engine and its
//! adapters: validation failures on domain values, authentication failures,
//! remote API failures (classified as transient or not), mount failures and
//! sharing failures.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building or validating domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path does not lie strictly inside the expected root
    #[error("Path {path} is not inside {root}")]
    PathOutsideRoot {
        /// The offending path
        path: String,
        /// The root it was expected to live under
        root: String,
    },

    /// Unknown permission name
    #[error("Invalid permission: {0}")]
    InvalidPermission(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors raised while establishing a session with the photo service
///
/// Every variant is fatal to a pass: nothing else can proceed without a
/// session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// A required credential is not configured
    #[error("Missing credential: {0}")]
    MissingCredentials(String),

    /// The service refused the credentials
    #[error("Login rejected (code {code})")]
    Rejected {
        /// Service error code
        code: i64,
    },

    /// The account requires a one-time code and none could be produced
    #[error("Account requires a one-time password")]
    OtpRequired,

    /// The configured OTP secret is not valid base32
    #[error("Invalid OTP secret: {0}")]
    InvalidOtpSecret(String),

    /// The login request could not be delivered
    #[error("Login transport failure: {0}")]
    Transport(String),
}

/// Errors returned by a single remote API call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The service asked us to slow down
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 5xx from the web server
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response excerpt or reason
        message: String,
    },

    /// The session id was rejected mid-pass
    #[error("Session expired (code {code})")]
    SessionExpired {
        /// Service error code
        code: i64,
    },

    /// The API answered with `success: false`
    #[error("API error {code}: {message}")]
    Api {
        /// Service error code
        code: i64,
        /// API and method that failed
        message: String,
    },

    /// The response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Whether the call may succeed if simply repeated after a delay
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::RateLimited(_)
                | RemoteError::Timeout(_)
                | RemoteError::Network(_)
                | RemoteError::Server { .. }
        )
    }

    /// Service error code, when the failure carried one
    pub fn code(&self) -> Option<i64> {
        match self {
            RemoteError::SessionExpired { code } | RemoteError::Api { code, .. } => Some(*code),
            RemoteError::Server { status, .. } => Some(i64::from(*status)),
            _ => None,
        }
    }
}

/// Errors raised by bind-mount handling
///
/// A `MountError` skips the affected root; it never aborts a pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MountError {
    /// Bind mounts cannot be used on this host
    #[error("Bind mounts unsupported: {0}")]
    Unsupported(String),

    /// The shared folder to expose does not exist
    #[error("Mount source missing: {0}")]
    SourceMissing(PathBuf),

    /// The target already holds files and is not a mount point
    #[error("Mount target is not empty: {0}")]
    TargetNotEmpty(PathBuf),

    /// The target path is a symbolic link
    #[error("Mount target is a symlink: {0}")]
    TargetIsSymlink(PathBuf),

    /// The mount table could not be read or a target inspected
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path being inspected
        path: PathBuf,
        /// Underlying error text
        message: String,
    },

    /// `mount` or `umount` exited unsuccessfully
    #[error("{command} failed (status {status:?}): {stderr}")]
    CommandFailed {
        /// Command line that was run
        command: String,
        /// Exit status, if the process exited normally
        status: Option<i32>,
        /// Captured standard error
        stderr: String,
    },
}

/// Errors raised by the fallback web-sharing path
///
/// A `ShareError` is reported as a warning and never fails a pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// Public/passphrase sharing is disabled in configuration
    #[error("Public sharing is disabled")]
    PublicSharingDisabled,

    /// None of the requested users or groups exist on the service
    #[error("No share targets could be resolved for {0}")]
    NoResolvableTargets(String),

    /// The service created a share but returned no passphrase
    #[error("Share link for {0} has no passphrase")]
    MissingPassphrase(String),

    /// A remote call inside the fallback sequence failed
    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteError),
}
