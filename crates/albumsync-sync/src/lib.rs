//! AlbumSync Sync - Reconciliation engine
//!
//! Provides:
//! - Bind-mount reconciliation for shared photo folders
//! - Bounded polling until the remote folder index catches up
//! - Condition album create/share/prune against the folder index
//! - Primary and fallback sharing resolution
//!
//! ## Modules
//!
//! - [`bind_mount`] - System mount primitive (`mount --bind`, `/proc/mounts`)
//! - [`discovery`] - Qualifying child enumeration per root kind
//! - [`folder_index`] - Immutable per-pass folder index snapshot
//! - [`media`] - On-disk media detection
//! - [`mounts`] - Mount reconciler
//! - [`reconciler`] - Album reconciler and orphan pruning
//! - [`retry`] - Retry discipline for transient remote errors
//! - [`roots`] - Root planning from configuration and overrides
//! - [`runner`] - Batch entry points wiring the phases together
//! - [`sharing`] - Sharing policy resolver
//! - [`waiter`] - Index convergence waiter and reindex trigger

pub mod bind_mount;
pub mod discovery;
pub mod folder_index;
pub mod media;
pub mod mounts;
pub mod reconciler;
pub mod retry;
pub mod roots;
pub mod runner;
pub mod sharing;
pub mod waiter;

use albumsync_core::domain::errors::{AuthError, RemoteError};
use thiserror::Error;

/// Errors that abort a whole pass
///
/// Mutations already applied are never rolled back; every operation is
/// idempotent, so re-running after fixing the cause converges.
#[derive(Debug, Error)]
pub enum PassError {
    /// No session could be established
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The folder index could not be loaded; no later phase can trust it
    #[error("Folder index unavailable: {0}")]
    IndexUnavailable(#[source] RemoteError),

    /// Configuration or per-invocation overrides are unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// A read-only remote query needed by the entry point failed
    #[error("Remote service error: {0}")]
    Remote(#[source] RemoteError),
}
