//! Fallback web-sharing port
//!
//! Replays the photo web UI's manual invite sequence: resolve user/group
//! identities, create a private passphrase link on the album, then attach
//! one permission entry per member. Used only when the primary share call
//! rejects an album.

use serde::Serialize;

use crate::domain::errors::ShareError;
use crate::domain::newtypes::AlbumId;
use crate::domain::root::Permission;

/// What a fallback share is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharePolicyRef {
    Album(AlbumId),
}

/// Outcome of a successful fallback share
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackShare {
    pub passphrase: String,
    /// Targets that received a permission entry
    pub applied_targets: Vec<String>,
    /// Targets with no matching user or group on the service
    pub unresolved_targets: Vec<String>,
}

/// Port trait for passphrase-based private sharing
#[async_trait::async_trait]
pub trait IWebSharing: Send + Sync {
    /// Shares `policy_ref` privately with `targets`
    ///
    /// # Arguments
    /// * `target_label` - Album name, for logs and errors
    /// * `targets` - User or group names
    /// * `permission` - Access level used when `roles` is empty
    /// * `roles` - Normalized role names; the first one is applied
    /// * `policy_ref` - Object the share link is created for
    async fn apply_private_sharing(
        &self,
        target_label: &str,
        targets: &[String],
        permission: Permission,
        roles: &[String],
        policy_ref: SharePolicyRef,
    ) -> Result<FallbackShare, ShareError>;

    /// Names in `targets` with no matching user or group on the service
    ///
    /// Such names can never appear in an album's observed share state, so
    /// drift checks leave them out.
    async fn unresolved_targets(&self, targets: &[String]) -> Result<Vec<String>, ShareError>;

    /// Public URL of a share link
    fn format_public_share_url(&self, passphrase: &str) -> String;
}
