use albumsync_core::domain::{MountReport, SyncReport, UnmountReport};
use albumsync_sync::reconciler::AlbumListing;
use serde::Serialize;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {
        // Human formatter doesn't print JSON
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

/// Serializes `value` and prints it through the JSON formatter
pub fn print_serialized<T: Serialize>(formatter: &dyn OutputFormatter, value: &T) {
    match serde_json::to_value(value) {
        Ok(json) => formatter.print_json(&json),
        Err(err) => formatter.error(&format!("Failed to serialize output: {err}")),
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Human rendering of an album pass
pub fn print_sync_report(formatter: &dyn OutputFormatter, title: &str, report: &SyncReport) {
    if report.is_noop() && !report.has_errors() {
        formatter.success(&format!("{title}: already up to date"));
    } else {
        formatter.success(&format!("{title} completed in {}ms", report.duration_ms));
    }

    for (label, albums) in [
        ("Created", &report.created),
        ("Updated", &report.updated),
        ("Shared", &report.shared),
        ("Deleted", &report.pruned),
    ] {
        if albums.is_empty() {
            continue;
        }
        formatter.info(&format!(
            "{label}: {} album{}",
            albums.len(),
            plural(albums.len())
        ));
        for album in albums {
            formatter.info(&format!("  - {} (id {})", album.name, album.album_id));
        }
    }
    for skipped in &report.skipped {
        formatter.warn(&format!("Skipped {}: {}", skipped.subject, skipped.reason));
    }
    for warning in &report.warnings {
        formatter.warn(warning);
    }
    if !report.errors.is_empty() {
        formatter.error(&format!(
            "{} error{} occurred:",
            report.errors.len(),
            plural(report.errors.len())
        ));
        for err in &report.errors {
            formatter.info(&format!("  - {}", err));
        }
    }
}

/// Human rendering of a mount pass
pub fn print_mount_report(formatter: &dyn OutputFormatter, report: &MountReport) {
    if let Some(reason) = &report.skipped_reason {
        formatter.warn(&format!("Bind mounts skipped: {reason}"));
    } else {
        formatter.success(&format!(
            "Mounts: {} new, {} already present",
            report.changed.len(),
            report.already_present.len()
        ));
    }
    for path in &report.changed {
        formatter.info(&format!("  + {}", path.display()));
    }
    for skipped in &report.skipped {
        formatter.warn(&format!("Skipped {}: {}", skipped.subject, skipped.reason));
    }
    for failed in &report.failed {
        formatter.error(&format!("{}: {}", failed.subject, failed.reason));
    }
    if report.reindex_triggered {
        formatter.info("Reindex requested");
    }
    if !report.pending_paths.is_empty() {
        formatter.warn(&format!(
            "{} folder{} not indexed yet:",
            report.pending_paths.len(),
            plural(report.pending_paths.len())
        ));
        for path in &report.pending_paths {
            formatter.info(&format!("  - {path}"));
        }
    }
}

/// Human rendering of an unmount pass
pub fn print_unmount_report(formatter: &dyn OutputFormatter, report: &UnmountReport) {
    if let Some(reason) = &report.skipped_reason {
        formatter.warn(&format!("Unmount skipped: {reason}"));
    }
    formatter.success(&format!(
        "Removed {} mount point{}",
        report.removed.len(),
        plural(report.removed.len())
    ));
    for path in &report.removed {
        formatter.info(&format!("  - {}", path.display()));
    }
    for failed in &report.failed {
        formatter.error(&format!("{}: {}", failed.subject, failed.reason));
    }
}

/// Human rendering of an album listing
pub fn print_listing(formatter: &dyn OutputFormatter, albums: &[AlbumListing]) {
    formatter.success(&format!("{} album{}", albums.len(), plural(albums.len())));
    for album in albums {
        let folder = match (&album.folder_path, album.folder_id) {
            (Some(path), _) => path.to_string(),
            (None, Some(id)) => format!("folder {id} (not indexed)"),
            (None, None) => "-".to_string(),
        };
        formatter.info(&format!("{:>8}  {}  [{}]", album.album_id, album.name, folder));
    }
}
