//! Sharing policy resolver
//!
//! Applies a [`ShareSpec`] to one album. The primary per-user call is tried
//! first; when the service rejects it for a condition album, the fallback
//! passphrase sequence runs exactly once. Sharing never fails a pass: the
//! only error surfaced is a primary-call failure other than that rejection.

use std::sync::Arc;

use albumsync_core::domain::errors::{RemoteError, ShareError};
use albumsync_core::domain::{AlbumId, ShareSpec};
use albumsync_core::ports::{IAlbumService, IWebSharing, PrimaryShareOutcome, SharePolicyRef};
use serde::Serialize;
use tracing::{info, warn};

use crate::retry::{with_retry, RetryPolicy};

/// Which mechanism ended up applying the share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMechanism {
    Primary,
    Fallback,
    /// Nothing was applied (private share spec, or degraded)
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareResult {
    pub mechanism: ShareMechanism,
    pub applied_targets: Vec<String>,
    pub warnings: Vec<String>,
    /// Link created by the fallback mechanism
    pub share_url: Option<String>,
}

impl ShareResult {
    fn none() -> Self {
        Self {
            mechanism: ShareMechanism::None,
            applied_targets: Vec::new(),
            warnings: Vec::new(),
            share_url: None,
        }
    }

    fn degraded(warning: String) -> Self {
        Self {
            warnings: vec![warning],
            ..Self::none()
        }
    }

    /// True when some mechanism applied the share spec
    pub fn is_applied(&self) -> bool {
        self.mechanism != ShareMechanism::None
    }
}

/// Applies share specs through the primary or fallback mechanism
pub struct SharingPolicyResolver {
    service: Arc<dyn IAlbumService>,
    web_sharing: Arc<dyn IWebSharing>,
    public_sharing_enabled: bool,
    retry: RetryPolicy,
}

impl SharingPolicyResolver {
    pub fn new(
        service: Arc<dyn IAlbumService>,
        web_sharing: Arc<dyn IWebSharing>,
        public_sharing_enabled: bool,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            service,
            web_sharing,
            public_sharing_enabled,
            retry,
        }
    }

    /// Shares `album_id` according to `spec`
    ///
    /// # Errors
    /// Returns the primary call's error when it failed for any reason other
    /// than the condition-album rejection. Fallback failures are warnings.
    pub async fn apply_sharing(
        &self,
        album_id: AlbumId,
        album_name: &str,
        spec: &ShareSpec,
    ) -> Result<ShareResult, RemoteError> {
        if spec.is_private() {
            return Ok(ShareResult::none());
        }

        let outcome = with_retry(self.retry, "share_album", || {
            self.service
                .share_album(album_id, &spec.targets, spec.permission, &spec.roles)
        })
        .await?;

        match outcome {
            PrimaryShareOutcome::Applied => {
                info!(
                    album = album_name,
                    targets = ?spec.targets,
                    role = %spec.effective_role(),
                    "Album shared"
                );
                Ok(ShareResult {
                    mechanism: ShareMechanism::Primary,
                    applied_targets: spec.targets.clone(),
                    warnings: Vec::new(),
                    share_url: None,
                })
            }
            PrimaryShareOutcome::RejectedConditionAlbum { code } => {
                info!(album = album_name, code, "Primary sharing rejected, using web sharing");
                Ok(self.fallback(album_id, album_name, spec).await)
            }
        }
    }

    /// `spec` narrowed to the targets the service can resolve
    ///
    /// Unknown names never show up in an album's observed share state. When
    /// the lookup fails the full spec is returned, so drift is still
    /// reported.
    pub async fn reachable_spec(&self, spec: &ShareSpec) -> ShareSpec {
        if spec.is_private() {
            return spec.clone();
        }
        match self.web_sharing.unresolved_targets(&spec.targets).await {
            Ok(unresolved) if !unresolved.is_empty() => spec.without_targets(&unresolved),
            Ok(_) => spec.clone(),
            Err(err) => {
                warn!(error = %err, "Cannot resolve share targets");
                spec.clone()
            }
        }
    }

    async fn fallback(&self, album_id: AlbumId, album_name: &str, spec: &ShareSpec) -> ShareResult {
        if !self.public_sharing_enabled {
            let warning = format!(
                "{album_name}: {}; album left unshared",
                ShareError::PublicSharingDisabled
            );
            warn!(album = album_name, "Public sharing disabled, album left unshared");
            return ShareResult::degraded(warning);
        }

        match self
            .web_sharing
            .apply_private_sharing(
                album_name,
                &spec.targets,
                spec.permission,
                &spec.roles,
                SharePolicyRef::Album(album_id),
            )
            .await
        {
            Ok(share) => {
                let url = self.web_sharing.format_public_share_url(&share.passphrase);
                let warnings = share
                    .unresolved_targets
                    .iter()
                    .map(|target| format!("{album_name}: no user or group named '{target}'"))
                    .collect();
                info!(
                    album = album_name,
                    targets = ?share.applied_targets,
                    url = %url,
                    "Album shared through web sharing"
                );
                ShareResult {
                    mechanism: ShareMechanism::Fallback,
                    applied_targets: share.applied_targets,
                    warnings,
                    share_url: Some(url),
                }
            }
            Err(err) => {
                warn!(album = album_name, error = %err, "Web sharing failed");
                ShareResult::degraded(format!("{album_name}: web sharing failed: {err}"))
            }
        }
    }
}
