//! Passphrase-based fallback sharing
//!
//! Replays the Synology Photos web UI invite flow for albums the primary
//! share call refuses:
//!
//! 1. Resolve user and group names through `SYNO.Foto.Sharing.Misc`
//!    (`list_user_group`), once per adapter instance.
//! 2. Create a private passphrase link with one permission entry per member
//!    through `SYNO.Foto.Sharing.Passphrase set_shared`.
//! 3. Push one `update` invite per member so the per-user role sticks.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use albumsync_core::config::{DsmConfig, SharingConfig};
use albumsync_core::domain::errors::ShareError;
use albumsync_core::domain::root::Permission;
use albumsync_core::ports::{FallbackShare, IWebSharing, SharePolicyRef};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::client::DsmClient;

const PASSPHRASE_API: &str = "SYNO.Foto.Sharing.Passphrase";

#[derive(Debug, Deserialize)]
struct UserGroupData {
    #[serde(default)]
    list: Vec<IdentityRow>,
}

#[derive(Debug, Clone, Deserialize)]
struct IdentityRow {
    id: i64,
    #[serde(default = "default_identity_type", rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
}

fn default_identity_type() -> String {
    "user".to_string()
}

#[derive(Debug, Deserialize)]
struct PassphraseData {
    #[serde(default)]
    passphrase: Option<String>,
}

/// A share target resolved to a service identity
#[derive(Debug, Clone)]
struct Member {
    label: String,
    id: i64,
    kind: String,
}

impl Member {
    fn payload(&self) -> serde_json::Value {
        json!({"id": self.id, "type": self.kind})
    }
}

/// [`IWebSharing`] implementation for Synology Photos
pub struct SynologyWebSharing {
    client: Arc<DsmClient>,
    host: String,
    port: u16,
    https: bool,
    share_link_base: Option<String>,
    /// Lowercased name → identity; loaded on first use
    identities: tokio::sync::Mutex<Option<HashMap<String, IdentityRow>>>,
    /// Names already reported as unknown
    warned_missing: Mutex<HashSet<String>>,
}

impl SynologyWebSharing {
    pub fn new(client: Arc<DsmClient>, dsm: &DsmConfig, sharing: &SharingConfig) -> Self {
        Self {
            client,
            host: dsm.url_host(),
            port: dsm.port,
            https: dsm.use_https(),
            share_link_base: sharing
                .share_link_base
                .as_deref()
                .map(|base| base.trim().trim_end_matches('/').to_string())
                .filter(|base| !base.is_empty()),
            identities: tokio::sync::Mutex::new(None),
            warned_missing: Mutex::new(HashSet::new()),
        }
    }

    /// Resolves `targets` against the shareable user/group list
    ///
    /// Returns the resolved members and the names left unresolved.
    async fn resolve(&self, targets: &[String]) -> Result<(Vec<Member>, Vec<String>), ShareError> {
        let mut guard = self.identities.lock().await;
        if guard.is_none() {
            let data: UserGroupData = self
                .client
                .call_as(
                    "SYNO.Foto.Sharing.Misc",
                    "list_user_group",
                    1,
                    &[("team_space_sharable_list", "false".to_string())],
                )
                .await?;
            let cache: HashMap<String, IdentityRow> = data
                .list
                .into_iter()
                .filter(|row| !row.name.trim().is_empty())
                .map(|row| (row.name.trim().to_lowercase(), row))
                .collect();
            debug!(identities = cache.len(), "Cached shareable users and groups");
            *guard = Some(cache);
        }
        let cache = guard.as_ref();

        let mut members = Vec::new();
        let mut unresolved = Vec::new();
        for raw in targets {
            let key = raw.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            match cache.and_then(|c| c.get(&key)) {
                Some(identity) => members.push(Member {
                    label: identity.name.clone(),
                    id: identity.id,
                    kind: identity.kind.clone(),
                }),
                None => {
                    let first_time = self
                        .warned_missing
                        .lock()
                        .map(|mut warned| warned.insert(key.clone()))
                        .unwrap_or(true);
                    if first_time {
                        warn!(target_name = %raw, "Share target not found in user/group list");
                    }
                    unresolved.push(raw.clone());
                }
            }
        }
        Ok((members, unresolved))
    }

    /// Pushes one invite update per member; failures are logged only
    async fn sync_invites(&self, passphrase: &str, members: &[Member], role: &str, label: &str) {
        for member in members {
            let permission = json!([{
                "role": role,
                "action": "update",
                "member": member.payload(),
            }]);
            let params = [
                ("passphrase", passphrase.to_string()),
                ("expiration", "0".to_string()),
                ("permission", permission.to_string()),
            ];
            match self.client.call(PASSPHRASE_API, "update", 1, &params).await {
                Ok(_) => debug!(album = label, member = %member.label, "Synced invite"),
                Err(err) => warn!(
                    album = label,
                    member = %member.label,
                    error = %err,
                    "Invite update rejected"
                ),
            }
        }
    }
}

#[async_trait::async_trait]
impl IWebSharing for SynologyWebSharing {
    async fn apply_private_sharing(
        &self,
        target_label: &str,
        targets: &[String],
        permission: Permission,
        roles: &[String],
        policy_ref: SharePolicyRef,
    ) -> Result<FallbackShare, ShareError> {
        let role = roles
            .first()
            .cloned()
            .unwrap_or_else(|| permission.as_str().to_string());
        let (members, unresolved) = self.resolve(targets).await?;
        if members.is_empty() {
            return Err(ShareError::NoResolvableTargets(target_label.to_string()));
        }

        let entries: Vec<serde_json::Value> = members
            .iter()
            .map(|m| json!({"role": role, "member": m.payload()}))
            .collect();
        let SharePolicyRef::Album(album_id) = policy_ref;
        let params = [
            ("policy", "album".to_string()),
            ("album_id", album_id.get().to_string()),
            ("enabled", "true".to_string()),
            ("privacy_type", "private".to_string()),
            ("permission", serde_json::Value::Array(entries).to_string()),
            ("enable_password", "false".to_string()),
            ("expiration", "0".to_string()),
        ];
        let data: PassphraseData = self
            .client
            .call_as(PASSPHRASE_API, "set_shared", 1, &params)
            .await?;
        let passphrase = data
            .passphrase
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ShareError::MissingPassphrase(target_label.to_string()))?;

        info!(
            album = target_label,
            role = %role,
            url = %self.format_public_share_url(&passphrase),
            "Enabled private share link"
        );
        self.sync_invites(&passphrase, &members, &role, target_label)
            .await;

        Ok(FallbackShare {
            passphrase,
            applied_targets: members.into_iter().map(|m| m.label).collect(),
            unresolved_targets: unresolved,
        })
    }

    async fn unresolved_targets(&self, targets: &[String]) -> Result<Vec<String>, ShareError> {
        let (_, unresolved) = self.resolve(targets).await?;
        Ok(unresolved)
    }

    fn format_public_share_url(&self, passphrase: &str) -> String {
        if passphrase.is_empty() {
            return String::new();
        }
        if let Some(base) = &self.share_link_base {
            return format!("{base}/{passphrase}");
        }
        let (scheme, default_port) = if self.https {
            ("https", 443)
        } else {
            ("http", 80)
        };
        let port = if self.port == default_port {
            String::new()
        } else {
            format!(":{}", self.port)
        };
        format!("{scheme}://{}{port}/photo/share/{passphrase}", self.host)
    }
}
