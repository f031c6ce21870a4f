//! Authentication session port
//!
//! A session must exist before any other remote call. Implementations keep
//! the session token internally and attach it to subsequent requests.

use crate::domain::errors::AuthError;

/// Port trait for establishing a session with the photo service
#[async_trait::async_trait]
pub trait IAuthSession: Send + Sync {
    /// Logs in with the configured credentials
    ///
    /// Idempotent: calling it while already authenticated is a no-op.
    async fn login(&self) -> Result<(), AuthError>;

    /// Whether a session token is currently held
    fn is_authenticated(&self) -> bool;

    /// Ends the session; best effort
    async fn logout(&self) -> Result<(), AuthError>;
}
