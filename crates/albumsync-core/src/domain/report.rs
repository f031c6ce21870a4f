//! Structured results of each batch entry point
//!
//! Every phase returns a report, even on partial failure, so operators can
//! see which roots and albums succeeded and which were skipped.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::newtypes::{AlbumId, FolderId, IndexPath};

/// Reference to an album touched during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumRef {
    pub album_id: AlbumId,
    pub name: String,
    pub folder_id: Option<FolderId>,
}

/// Something that was deliberately not acted upon, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub subject: String,
    pub reason: String,
}

impl Skipped {
    pub fn new(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SyncReport
// ============================================================================

/// Result of an album reconciliation or album deletion pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Correlation id shared with the pass's log events
    pub pass_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub created: Vec<AlbumRef>,
    /// Existing albums whose sharing was re-applied
    pub updated: Vec<AlbumRef>,
    /// Albums that received sharing this pass
    pub shared: Vec<AlbumRef>,
    /// Albums deleted as orphans or by explicit request
    pub pruned: Vec<AlbumRef>,
    pub skipped: Vec<Skipped>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn new(pass_id: Uuid) -> Self {
        Self {
            pass_id,
            started_at: Utc::now(),
            created: Vec::new(),
            updated: Vec::new(),
            shared: Vec::new(),
            pruned: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    /// True when the pass changed nothing on the remote service
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.shared.is_empty()
            && self.pruned.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Stamps `duration_ms` from `started_at`
    pub fn finish(&mut self) {
        let elapsed = Utc::now() - self.started_at;
        self.duration_ms = u64::try_from(elapsed.num_milliseconds()).unwrap_or(0);
    }
}

// ============================================================================
// MountReport / UnmountReport
// ============================================================================

/// Result of ensuring bind mounts, optionally followed by an index wait
#[derive(Debug, Clone, Default, Serialize)]
pub struct MountReport {
    /// Targets mounted (or remounted) this pass
    pub changed: Vec<PathBuf>,
    pub already_present: Vec<PathBuf>,
    /// Roots left alone, with the reason
    pub skipped: Vec<Skipped>,
    /// Roots whose mount attempt failed
    pub failed: Vec<Skipped>,
    /// Set when bind mounts are unsupported or disabled for the whole pass
    pub skipped_reason: Option<String>,
    pub reindex_triggered: bool,
    /// Paths still missing from the index after waiting
    pub pending_paths: Vec<IndexPath>,
}

impl MountReport {
    pub fn has_errors(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Result of an unmount request
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnmountReport {
    /// Targets unmounted or cleaned up
    pub removed: Vec<PathBuf>,
    pub failed: Vec<Skipped>,
    pub skipped_reason: Option<String>,
}

impl UnmountReport {
    pub fn has_errors(&self) -> bool {
        !self.failed.is_empty()
    }
}
