//! Index convergence: reload and reindex-trigger counts

use std::sync::Arc;

use albumsync_core::config::{IndexingConfig, ReindexPolicy};
use albumsync_core::domain::{FolderIndexEntry, IndexPath, RemoteError};
use albumsync_sync::folder_index::FolderIndexCache;
use albumsync_sync::retry::RetryPolicy;
use albumsync_sync::waiter::{IndexConvergenceWaiter, Reindexer};

use crate::common::FakeAlbumService;

/// Index that gains `/Family/2024` on the `k`-th load
fn service_converging_after(k: usize) -> Arc<FakeAlbumService> {
    let before = vec![FolderIndexEntry::new(10, "/Family", None)];
    let after = vec![
        FolderIndexEntry::new(10, "/Family", None),
        FolderIndexEntry::new(11, "/Family/2024", Some(10)),
    ];
    let service = FakeAlbumService::with_index(Vec::new());
    {
        let mut state = service.state.lock().unwrap();
        state.index_versions = std::iter::repeat(before)
            .take(k - 1)
            .chain(std::iter::once(after))
            .collect();
    }
    service
}

fn waiter(service: Arc<FakeAlbumService>, attempts: u32, policy: ReindexPolicy) -> IndexConvergenceWaiter {
    let config = IndexingConfig {
        wait_attempts: attempts,
        wait_delay_secs: 5,
        reindex_policy: policy,
        settle_secs: 0,
        ..Default::default()
    };
    let cache = FolderIndexCache::new(service.clone(), RetryPolicy::once());
    let reindexer = Reindexer::new(service, &config, "alice");
    IndexConvergenceWaiter::new(cache, reindexer, &config)
}

fn wanted() -> Vec<IndexPath> {
    vec![IndexPath::new("/Family"), IndexPath::new("/Family/2024")]
}

#[tokio::test(start_paused = true)]
async fn converges_after_k_reloads_with_every_attempt_triggers() {
    let service = service_converging_after(3);
    let outcome = waiter(service.clone(), 5, ReindexPolicy::EveryAttempt)
        .wait_for_paths_indexed(&wanted(), "family")
        .await
        .unwrap();

    assert!(outcome.converged());
    assert_eq!(outcome.reloads, 3);
    assert_eq!(outcome.reindex_triggers, 2);
    let state = service.state.lock().unwrap();
    assert_eq!(state.index_loads, 3);
    assert_eq!(state.reindex_calls, 2);
}

#[tokio::test(start_paused = true)]
async fn first_attempt_policy_triggers_once() {
    let service = service_converging_after(4);
    let outcome = waiter(service.clone(), 5, ReindexPolicy::FirstAttempt)
        .wait_for_paths_indexed(&wanted(), "family")
        .await
        .unwrap();

    assert!(outcome.converged());
    assert_eq!(outcome.reloads, 4);
    assert_eq!(outcome.reindex_triggers, 1);
    assert_eq!(service.state.lock().unwrap().reindex_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn recent_reindex_skips_first_attempt_trigger() {
    let service = service_converging_after(3);
    let outcome = waiter(service.clone(), 5, ReindexPolicy::FirstAttempt)
        .after_reindex(true)
        .wait_for_paths_indexed(&wanted(), "family")
        .await
        .unwrap();

    assert!(outcome.converged());
    assert_eq!(outcome.reloads, 3);
    assert_eq!(outcome.reindex_triggers, 0);
    assert_eq!(service.state.lock().unwrap().reindex_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn recent_reindex_only_spares_the_first_attempt() {
    let service = service_converging_after(3);
    let outcome = waiter(service.clone(), 5, ReindexPolicy::EveryAttempt)
        .after_reindex(true)
        .wait_for_paths_indexed(&wanted(), "family")
        .await
        .unwrap();

    assert_eq!(outcome.reindex_triggers, 1);
    assert_eq!(service.state.lock().unwrap().reindex_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn already_indexed_paths_need_one_load_and_no_trigger() {
    let service = service_converging_after(1);
    let outcome = waiter(service.clone(), 5, ReindexPolicy::EveryAttempt)
        .wait_for_paths_indexed(&wanted(), "family")
        .await
        .unwrap();

    assert_eq!(outcome.reloads, 1);
    assert_eq!(outcome.reindex_triggers, 0);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_returns_residual_missing_set() {
    let service = service_converging_after(10);
    let outcome = waiter(service.clone(), 3, ReindexPolicy::Never)
        .wait_for_paths_indexed(&wanted(), "family")
        .await
        .unwrap();

    assert!(!outcome.converged());
    assert_eq!(
        outcome.missing.into_iter().collect::<Vec<_>>(),
        vec![IndexPath::new("/Family/2024")]
    );
    assert_eq!(outcome.reloads, 3);
    assert_eq!(service.state.lock().unwrap().reindex_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_index_load_is_an_error() {
    let service = service_converging_after(1);
    service.state.lock().unwrap().index_error = Some(RemoteError::Timeout("slow".into()));
    let result = waiter(service, 3, ReindexPolicy::FirstAttempt)
        .wait_for_paths_indexed(&wanted(), "family")
        .await;
    assert!(matches!(result, Err(RemoteError::Timeout(_))));
}
