//! Index convergence waiter
//!
//! The remote indexing job runs asynchronously and cannot be driven
//! directly. Bounded polling is the only way to know it has caught up: the
//! waiter reloads the folder index until every wanted path is visible or
//! the attempts run out, optionally nudging the indexer in between.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use albumsync_core::config::{IndexingConfig, ReindexPolicy};
use albumsync_core::domain::errors::RemoteError;
use albumsync_core::domain::IndexPath;
use albumsync_core::ports::{IAlbumService, IndexStatus, ReindexScope};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::folder_index::{FolderIndexCache, FolderIndexSnapshot};

// ============================================================================
// Reindexer
// ============================================================================

/// Asks the service to re-scan folders
///
/// The API call is tried first; when it fails and a host command is
/// configured, the command runs instead. After a successful trigger the
/// reindexer waits up to `settle` for the indexing job to report idle.
pub struct Reindexer {
    service: Arc<dyn IAlbumService>,
    command: Option<String>,
    username: String,
    settle: Duration,
    poll_interval: Duration,
}

impl Reindexer {
    pub fn new(service: Arc<dyn IAlbumService>, config: &IndexingConfig, username: &str) -> Self {
        Self {
            service,
            command: config.reindex_command.clone(),
            username: username.to_string(),
            settle: Duration::from_secs(config.settle_secs),
            poll_interval: Duration::from_secs(2),
        }
    }

    /// Triggers a reindex; returns whether any mechanism accepted it
    pub async fn trigger(&self, scope: &ReindexScope) -> bool {
        let triggered = match self.service.trigger_reindex(scope).await {
            Ok(()) => {
                info!(scope = ?scope, "Reindex requested");
                true
            }
            Err(err) => {
                warn!(scope = ?scope, error = %err, "Reindex API call failed");
                self.run_command(scope).await
            }
        };

        if triggered {
            self.settle().await;
        }
        triggered
    }

    async fn run_command(&self, scope: &ReindexScope) -> bool {
        let Some(template) = &self.command else {
            return false;
        };
        let path = match scope {
            ReindexScope::Global => String::new(),
            ReindexScope::Path(path) => path.to_string(),
        };
        let command_line = template
            .replace("{user}", &self.username)
            .replace("{path}", &path);

        match Command::new("sh").arg("-c").arg(&command_line).output().await {
            Ok(output) if output.status.success() => {
                info!(command = %command_line, "Reindex command succeeded");
                true
            }
            Ok(output) => {
                warn!(
                    command = %command_line,
                    status = ?output.status.code(),
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "Reindex command failed"
                );
                false
            }
            Err(err) => {
                warn!(command = %command_line, error = %err, "Reindex command could not start");
                false
            }
        }
    }

    /// Polls the indexing job until it is idle or `settle` elapses
    async fn settle(&self) {
        if self.settle.is_zero() {
            return;
        }
        let deadline = Instant::now() + self.settle;
        loop {
            match self.service.index_status().await {
                Ok(IndexStatus::Idle) => {
                    debug!("Indexer idle");
                    return;
                }
                Ok(status) => debug!(status = ?status, "Indexer still working"),
                Err(err) => debug!(error = %err, "Index status unavailable"),
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("Settle time elapsed");
                return;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

// ============================================================================
// IndexConvergenceWaiter
// ============================================================================

/// Result of waiting for paths to appear in the index
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    /// Last snapshot loaded; reused by the phases that follow
    pub snapshot: FolderIndexSnapshot,
    /// Paths still absent when the wait ended
    pub missing: BTreeSet<IndexPath>,
    pub reloads: u32,
    pub reindex_triggers: u32,
}

impl WaitOutcome {
    pub fn converged(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Polls the folder index until a set of paths is visible
pub struct IndexConvergenceWaiter {
    cache: FolderIndexCache,
    reindexer: Reindexer,
    policy: ReindexPolicy,
    attempts: u32,
    delay: Duration,
    reindexed: bool,
}

impl IndexConvergenceWaiter {
    pub fn new(cache: FolderIndexCache, reindexer: Reindexer, config: &IndexingConfig) -> Self {
        Self {
            cache,
            reindexer,
            policy: config.reindex_policy,
            attempts: config.wait_attempts.max(1),
            delay: Duration::from_secs(config.wait_delay_secs),
            reindexed: false,
        }
    }

    /// Marks that a reindex was requested right before this wait, so the
    /// first attempt does not request another one
    pub fn after_reindex(mut self, reindexed: bool) -> Self {
        self.reindexed = reindexed;
        self
    }

    pub fn reindexer(&self) -> &Reindexer {
        &self.reindexer
    }

    /// Reloads the index until `paths` are all present or attempts run out
    ///
    /// Running out of attempts is not an error: the residual set is
    /// returned so callers proceed with whatever is indexed. Only a failed
    /// index load is.
    pub async fn wait_for_paths_indexed(
        &self,
        paths: &[IndexPath],
        label: &str,
    ) -> Result<WaitOutcome, RemoteError> {
        let mut reindex_triggers = 0;
        let mut attempt = 1;

        loop {
            let snapshot = self.cache.load().await?;
            let missing = snapshot.missing(paths);

            if missing.is_empty() || attempt >= self.attempts {
                if missing.is_empty() {
                    debug!(label, attempt, "Index converged");
                } else {
                    warn!(
                        label,
                        missing = missing.len(),
                        first = %missing.iter().next().map(ToString::to_string).unwrap_or_default(),
                        "Index did not converge, continuing with indexed folders"
                    );
                }
                return Ok(WaitOutcome {
                    snapshot,
                    missing,
                    reloads: attempt,
                    reindex_triggers,
                });
            }

            debug!(
                label,
                attempt,
                attempts = self.attempts,
                missing = missing.len(),
                "Waiting for folder index"
            );

            if self.should_trigger(attempt) {
                let scope = match missing.iter().collect::<Vec<_>>().as_slice() {
                    [only] => ReindexScope::Path((*only).clone()),
                    _ => ReindexScope::Global,
                };
                if self.reindexer.trigger(&scope).await {
                    reindex_triggers += 1;
                }
            }

            tokio::time::sleep(self.delay).await;
            attempt += 1;
        }
    }

    fn should_trigger(&self, attempt: u32) -> bool {
        if attempt == 1 && self.reindexed {
            return false;
        }
        match self.policy {
            ReindexPolicy::FirstAttempt => attempt == 1,
            ReindexPolicy::EveryAttempt => true,
            ReindexPolicy::Never => false,
        }
    }
}
