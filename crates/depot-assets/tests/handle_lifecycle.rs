//! Handle lifecycle: issue, poll, cancel, dispose and pooling.

mod common;

use std::sync::Arc;
use std::thread;

use common::{Prefab, bundle_package, catalog_package, module, module_with_capacity};
use depot_assets::*;
use depot_test_utils::{BackendCall, MockBackend, poll_now, run_ticked, run_ticked_with};

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_and_dispose_returns_wrapper_to_pool() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);

    let idle_before = module.context().idle_wrappers::<AssetHandle<Prefab>>();
    let handle = package.load_asset_async::<Prefab>("hero.prefab").unwrap();

    assert_eq!(handle.status(), HandleStatus::Succeeded);
    assert_eq!(handle.asset().unwrap().name, "hero");
    assert_eq!(handle.location(), "hero.prefab");
    assert_eq!(handle.package(), "main");

    handle.dispose();
    assert_eq!(module.context().idle_wrappers::<AssetHandle<Prefab>>(), idle_before + 1);
    assert_eq!(backend.last_operation().unwrap().release_count(), 1);
}

#[test]
fn test_completion_resolves_on_a_later_tick() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let handle = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    assert_eq!(handle.status(), HandleStatus::Loading);
    assert!(!handle.is_done());
    assert!(handle.asset().is_none());

    let probe = backend.last_operation().unwrap();
    probe.set_progress(0.25);
    assert!((handle.progress() - 0.25).abs() < f32::EPSILON);

    let result = run_ticked_with(module.context(), handle.completion(), |tick| {
        if tick == 2 {
            probe.complete();
        }
    });
    assert_eq!(result, Ok(()));
    assert_eq!(handle.progress(), 1.0);
    assert!(handle.asset().is_some());
}

#[test]
fn test_native_failure_is_reported_on_the_handle() {
    let mut module = module();
    let backend = MockBackend::bundle();
    let package = bundle_package(&mut module, "main", &backend);

    let handle = package.load_asset_async::<Prefab>("missing.prefab").unwrap();
    assert_eq!(handle.status(), HandleStatus::Failed);
    assert_eq!(handle.error(), "no asset at 'missing.prefab'");
    assert!(handle.asset().is_none());
    assert_eq!(
        run_ticked(module.context(), handle.completion()),
        Err(HandleError::Failed("no asset at 'missing.prefab'".into()))
    );
}

#[test]
fn test_wrong_asset_type_fails_the_handle() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", String::from("not a prefab"));
    let package = bundle_package(&mut module, "main", &backend);

    let handle = package.load_asset_sync::<Prefab>("hero.prefab").unwrap();
    assert_eq!(handle.status(), HandleStatus::Failed);
    assert_eq!(handle.error(), "loaded object is not a Prefab");
}

#[test]
fn test_sync_load_forces_completion() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let handle = package.load_asset_sync::<Prefab>("hero.prefab").unwrap();
    assert_eq!(handle.status(), HandleStatus::Succeeded);
    assert_eq!(backend.last_operation().unwrap().wait_count(), 1);
}

#[test]
fn test_load_all_keeps_only_requested_type() {
    let mut module = module();
    let backend = MockBackend::bundle().with_collection(
        "characters",
        vec![
            Arc::new(Prefab::new("knight")) as AssetObject,
            Arc::new(String::from("readme")) as AssetObject,
            Arc::new(Prefab::new("archer")) as AssetObject,
        ],
    );
    let package = bundle_package(&mut module, "main", &backend);

    let handle = package.load_all_assets_async::<Prefab>("characters").unwrap();
    let list = handle.assets().unwrap();
    assert_eq!(list.len(), 2);
    let names: Vec<&str> = list.iter().map(|prefab| prefab.name.as_str()).collect();
    assert_eq!(names, ["knight", "archer"]);
    assert_eq!(list.get_arc(1).unwrap().name, "archer");
    assert!(list.get(2).is_none());

    // The view reads the provider's collection as returned
    assert_eq!(list.objects().len(), 3);
    assert_eq!(list.objects()[1].downcast_ref::<String>().unwrap(), "readme");
    assert!(Arc::ptr_eq(handle.assets().unwrap().objects(), list.objects()));
}

#[test]
fn test_ids_are_unique_per_package() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);

    let a = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    let b = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    assert_ne!(a.id(), b.id());
    assert!(a.id() >= 1);
}

// ============================================================================
// Dispose
// ============================================================================

#[test]
fn test_dispose_is_idempotent() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);

    let handle = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    let probe = backend.last_operation().unwrap();
    handle.dispose();
    handle.dispose();
    drop(handle);

    assert_eq!(probe.release_count(), 1);
    assert_eq!(module.context().idle_wrappers::<AssetHandle<Prefab>>(), 1);
}

#[test]
fn test_disposed_handle_returns_defaults() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let handle = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    handle.dispose();

    assert!(handle.is_disposed());
    assert_eq!(handle.status(), HandleStatus::Disposed);
    assert!(handle.is_done());
    assert_eq!(handle.progress(), 1.0);
    assert_eq!(handle.error(), "");
    assert_eq!(handle.location(), "");
    assert!(handle.asset().is_none());
    assert_eq!(
        run_ticked(module.context(), handle.completion()),
        Err(HandleError::Disposed)
    );
}

#[test]
fn test_concurrent_dispose_releases_once() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    for _ in 0..16 {
        let handle = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
        let probe = backend.last_operation().unwrap();
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| handle.dispose());
            }
        });
        assert_eq!(probe.release_count(), 1);
    }
}

#[test]
fn test_pool_never_exceeds_capacity() {
    let mut module = module_with_capacity(2);
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);

    let handles: Vec<_> = (0..5)
        .map(|_| package.load_asset_async::<Prefab>("hero.prefab").unwrap())
        .collect();
    for handle in &handles {
        handle.dispose();
    }

    assert_eq!(module.context().idle_wrappers::<AssetHandle<Prefab>>(), 2);
    assert_eq!(backend.total_releases(), 6);
}

#[test]
fn test_tracker_follows_live_handles() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);

    let handle = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    let tracker = module.context().tracker();
    assert!(tracker.is_registered("main", handle.id()));
    assert_eq!(tracker.len(), 1);

    drop(handle);
    assert!(tracker.is_empty());
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_pre_canceled_token_never_reaches_provider() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);
    let calls_before = backend.call_count();

    let token = CancellationToken::new();
    token.cancel();
    let handle = package
        .load_asset_async_with::<Prefab>("hero.prefab", LoadSettings::new().cancel_on(token))
        .unwrap();

    assert_eq!(handle.status(), HandleStatus::Canceled);
    assert_eq!(handle.error(), "operation was canceled");
    assert_eq!(backend.call_count(), calls_before);
    assert_eq!(
        run_ticked(module.context(), handle.completion()),
        Err(HandleError::Canceled)
    );
}

#[test]
fn test_cancel_while_loading_releases_once() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let token = CancellationToken::new();
    let handle = package
        .load_asset_async_with::<Prefab>("hero.prefab", LoadSettings::new().cancel_on(token.clone()))
        .unwrap();
    let probe = backend.last_operation().unwrap();

    let mut completion = Box::pin(handle.completion());
    assert!(poll_now(&mut completion).is_none());

    token.cancel();
    module.tick();
    assert_eq!(poll_now(&mut completion), Some(Err(HandleError::Canceled)));
    assert_eq!(probe.release_count(), 1);

    // Finishing natively afterwards changes nothing
    probe.complete();
    assert_eq!(handle.status(), HandleStatus::Canceled);
    drop(completion);
    handle.dispose();
    assert_eq!(probe.release_count(), 1);
}

#[test]
fn test_cancel_after_completion_keeps_result() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);

    let token = CancellationToken::new();
    let handle = package
        .load_asset_async_with::<Prefab>("hero.prefab", LoadSettings::new().cancel_on(token.clone()))
        .unwrap();
    assert_eq!(handle.status(), HandleStatus::Succeeded);

    token.cancel();
    assert_eq!(handle.status(), HandleStatus::Succeeded);
    assert!(handle.asset().is_some());
}

#[test]
fn test_cancel_token_forwarded_only_to_native_cancel_providers() {
    let mut module = module();
    let bundle = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let catalog = MockBackend::catalog().with_asset("hero.prefab", Prefab::new("hero"));
    let bundle_pkg = bundle_package(&mut module, "bundle", &bundle);
    let catalog_pkg = catalog_package(&mut module, "catalog", &catalog);

    let token = CancellationToken::new();
    let _a = bundle_pkg
        .load_asset_async_with::<Prefab>("hero.prefab", LoadSettings::new().cancel_on(token.clone()))
        .unwrap();
    let _b = catalog_pkg
        .load_asset_async_with::<Prefab>("hero.prefab", LoadSettings::new().cancel_on(token))
        .unwrap();

    let forwarded = |backend: &MockBackend| {
        backend.calls().into_iter().find_map(|call| match call {
            BackendCall::LoadAsset { native_cancel, .. } => Some(native_cancel),
            _ => None,
        })
    };
    assert_eq!(forwarded(&bundle), Some(true));
    assert_eq!(forwarded(&catalog), Some(false));
}
