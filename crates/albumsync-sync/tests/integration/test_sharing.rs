//! Sharing policy resolver: primary, fallback and degraded paths

use std::sync::atomic::Ordering;
use std::sync::Arc;

use albumsync_core::domain::{AlbumId, Permission, RemoteError, ShareSpec};
use albumsync_sync::retry::RetryPolicy;
use albumsync_sync::sharing::{ShareMechanism, SharingPolicyResolver};

use crate::common::{condition_album, FakeAlbumService, FakeWebSharing};

fn spec() -> ShareSpec {
    ShareSpec::new(["family"], Permission::View, ["viewer"])
}

fn setup(
    configure: impl FnOnce(&mut crate::common::ServiceState),
    web: FakeWebSharing,
    public_sharing: bool,
) -> (SharingPolicyResolver, Arc<FakeAlbumService>, Arc<FakeWebSharing>) {
    let service = FakeAlbumService::with_index(Vec::new());
    service.add_album(condition_album(1, "team_family - 2024", 101));
    configure(&mut *service.state.lock().unwrap());
    let web = Arc::new(web);
    let resolver = SharingPolicyResolver::new(
        service.clone(),
        web.clone(),
        public_sharing,
        RetryPolicy::once(),
    );
    (resolver, service, web)
}

#[tokio::test]
async fn primary_share_applies_targets() {
    let (resolver, service, web) = setup(|_| {}, FakeWebSharing::default(), true);

    let result = resolver
        .apply_sharing(AlbumId::new(1), "team_family - 2024", &spec())
        .await
        .unwrap();

    assert_eq!(result.mechanism, ShareMechanism::Primary);
    assert_eq!(result.applied_targets, vec!["family"]);
    assert_eq!(service.state.lock().unwrap().share_calls.len(), 1);
    assert_eq!(web.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn condition_album_rejection_uses_fallback_exactly_once() {
    let (resolver, service, web) = setup(
        |state| state.reject_share_code = Some(120),
        FakeWebSharing::default(),
        true,
    );

    let result = resolver
        .apply_sharing(AlbumId::new(1), "team_family - 2024", &spec())
        .await
        .unwrap();

    assert_eq!(result.mechanism, ShareMechanism::Fallback);
    assert_eq!(
        result.share_url.as_deref(),
        Some("https://nas.local:5001/photo/share/AbCdEf123")
    );
    assert_eq!(service.state.lock().unwrap().share_calls.len(), 1);
    assert_eq!(web.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn other_primary_errors_surface_without_fallback() {
    let (resolver, service, web) = setup(
        |state| {
            state.share_error = Some(RemoteError::Api {
                code: 105,
                message: "permission denied".into(),
            })
        },
        FakeWebSharing::default(),
        true,
    );

    let result = resolver
        .apply_sharing(AlbumId::new(1), "team_family - 2024", &spec())
        .await;

    assert!(matches!(result, Err(RemoteError::Api { code: 105, .. })));
    assert_eq!(service.state.lock().unwrap().share_calls.len(), 1);
    assert_eq!(web.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn disabled_public_sharing_degrades_to_warning() {
    let (resolver, _service, web) = setup(
        |state| state.reject_share_code = Some(120),
        FakeWebSharing::default(),
        false,
    );

    let result = resolver
        .apply_sharing(AlbumId::new(1), "team_family - 2024", &spec())
        .await
        .unwrap();

    assert_eq!(result.mechanism, ShareMechanism::None);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(web.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fallback_failure_is_a_warning() {
    let (resolver, _service, web) = setup(
        |state| state.reject_share_code = Some(120),
        FakeWebSharing {
            fail: true,
            ..Default::default()
        },
        true,
    );

    let result = resolver
        .apply_sharing(AlbumId::new(1), "team_family - 2024", &spec())
        .await
        .unwrap();

    assert!(!result.is_applied());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(web.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn private_spec_makes_no_calls() {
    let (resolver, service, web) = setup(|_| {}, FakeWebSharing::default(), true);

    let result = resolver
        .apply_sharing(AlbumId::new(1), "team_family - 2024", &ShareSpec::default())
        .await
        .unwrap();

    assert_eq!(result.mechanism, ShareMechanism::None);
    assert!(service.state.lock().unwrap().share_calls.is_empty());
    assert_eq!(web.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reachable_spec_leaves_out_unknown_targets() {
    let (resolver, service, web) = setup(
        |_| {},
        FakeWebSharing {
            unknown: vec!["ghost".to_string()],
            ..Default::default()
        },
        true,
    );
    let wanted = ShareSpec::new(["family", "Ghost"], Permission::View, ["viewer"]);

    let reachable = resolver.reachable_spec(&wanted).await;

    assert_eq!(reachable.targets, vec!["family"]);
    assert_eq!(reachable.effective_role(), "view");
    assert!(service.state.lock().unwrap().share_calls.is_empty());
    assert_eq!(web.calls.load(Ordering::SeqCst), 0);
}
