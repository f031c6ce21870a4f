//! Personal roots: on-disk discovery, depth limits and label overrides

use std::fs;
use std::path::Path;

use albumsync_core::domain::{FolderId, FolderIndexEntry};
use albumsync_sync::roots::PersonalOverrides;

use crate::common::*;

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"x").unwrap();
}

/// Photos library with `Family/Trips/2023/Summer/beach.jpg` on disk and in
/// the index
fn family_library(base: &Path) -> Vec<FolderIndexEntry> {
    let photos = base.join("homes/alice/Photos");
    touch(&photos.join("Family/Trips/2023/Summer/beach.jpg"));
    fs::create_dir_all(photos.join("Family/Empty")).unwrap();
    vec![
        FolderIndexEntry::new(10, "/Family", None),
        FolderIndexEntry::new(11, "/Family/Trips", Some(10)),
        FolderIndexEntry::new(12, "/Family/Trips/2023", Some(11)),
        FolderIndexEntry::new(13, "/Family/Trips/2023/Summer", Some(12)),
        FolderIndexEntry::new(14, "/Family/Empty", Some(10)),
    ]
}

#[tokio::test(start_paused = true)]
async fn max_depth_one_creates_album_for_trips_only() {
    let dir = tempfile::tempdir().unwrap();
    let index = family_library(dir.path());
    let h = harness(test_config(dir.path()).build(), FakeAlbumService::with_index(index));

    let overrides = PersonalOverrides {
        path: Some("Family".into()),
        max_depth: Some(1),
        ..Default::default()
    };
    let report = h.runner.create_personal_albums(&overrides).await.unwrap();

    assert!(!report.has_errors(), "errors: {:?}", report.errors);
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.created[0].name, "Family - Trips");
    assert_eq!(report.created[0].folder_id, Some(FolderId::new(11)));
}

#[tokio::test(start_paused = true)]
async fn unbounded_walk_reaches_the_media_folder() {
    let dir = tempfile::tempdir().unwrap();
    let index = family_library(dir.path());
    let h = harness(test_config(dir.path()).build(), FakeAlbumService::with_index(index));

    let overrides = PersonalOverrides {
        path: Some("Family".into()),
        ..Default::default()
    };
    let report = h.runner.create_personal_albums(&overrides).await.unwrap();

    let names: Vec<&str> = report.created.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Family - Summer"]);
}

#[tokio::test(start_paused = true)]
async fn empty_label_prefix_yields_bare_folder_names() {
    let dir = tempfile::tempdir().unwrap();
    let index = family_library(dir.path());
    let h = harness(test_config(dir.path()).build(), FakeAlbumService::with_index(index));

    let overrides = PersonalOverrides {
        path: Some("Family".into()),
        label_prefix: Some(String::new()),
        max_depth: Some(1),
        ..Default::default()
    };
    let report = h.runner.create_personal_albums(&overrides).await.unwrap();

    assert_eq!(report.created[0].name, "Trips");
}

#[tokio::test(start_paused = true)]
async fn shrinking_depth_prunes_deeper_albums() {
    let dir = tempfile::tempdir().unwrap();
    let index = family_library(dir.path());
    let service = FakeAlbumService::with_index(index);
    service.add_album(condition_album(50, "Family - Summer", 13));
    let h = harness(test_config(dir.path()).build(), service);

    let overrides = PersonalOverrides {
        path: Some("Family".into()),
        max_depth: Some(1),
        ..Default::default()
    };
    let report = h.runner.create_personal_albums(&overrides).await.unwrap();

    assert_eq!(report.created.len(), 1);
    assert_eq!(report.pruned.len(), 1);
    assert_eq!(report.pruned[0].name, "Family - Summer");
}

#[tokio::test(start_paused = true)]
async fn unindexed_media_folder_is_reported_not_created() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = family_library(dir.path());
    index.retain(|entry| entry.id != FolderId::new(11));
    let config = test_config(dir.path()).indexing_wait_attempts(2).build();
    let h = harness(config, FakeAlbumService::with_index(index));

    let overrides = PersonalOverrides {
        path: Some("Family".into()),
        max_depth: Some(1),
        ..Default::default()
    };
    let report = h.runner.create_personal_albums(&overrides).await.unwrap();

    assert!(report.created.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(h.service.state.lock().unwrap().index_loads, 2);
}

#[tokio::test(start_paused = true)]
async fn forced_reindex_is_not_repeated_by_the_wait() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = family_library(dir.path());
    index.retain(|entry| entry.id != FolderId::new(11));
    let config = test_config(dir.path())
        .indexing_wait_attempts(2)
        .indexing_force_reindex_on_start(true)
        .build();
    let h = harness(config, FakeAlbumService::with_index(index));

    let overrides = PersonalOverrides {
        path: Some("Family".into()),
        max_depth: Some(1),
        ..Default::default()
    };
    h.runner.create_personal_albums(&overrides).await.unwrap();

    let state = h.service.state.lock().unwrap();
    assert_eq!(state.index_loads, 2);
    assert_eq!(state.reindex_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn delete_personal_albums_removes_root_albums() {
    let dir = tempfile::tempdir().unwrap();
    let index = family_library(dir.path());
    let service = FakeAlbumService::with_index(index);
    service.add_album(condition_album(60, "Family - Trips", 11));
    service.add_album(condition_album(61, "Holiday", 999));
    let h = harness(test_config(dir.path()).build(), service);

    let overrides = PersonalOverrides {
        path: Some("Family".into()),
        ..Default::default()
    };
    let report = h.runner.delete_personal_albums(&overrides).await.unwrap();

    assert_eq!(report.pruned.len(), 1);
    assert_eq!(h.service.album_names(), vec!["Holiday".to_string()]);
}
