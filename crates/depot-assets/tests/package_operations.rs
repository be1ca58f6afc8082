//! Managed provider packages: manifests, cache, downloads, raw files,
//! instantiation and scenes.

mod common;

use common::{Prefab, bundle_package, catalog_package, module};
use depot_assets::settings::DownloadScope;
use depot_assets::*;
use depot_test_utils::{
    BackendCall, JobState, MockBackend, MockInstance, MockScene, RemoteFile, run_ticked, run_ticked_with,
};

fn remote_backend(backend: MockBackend) -> MockBackend {
    backend
        .with_remote_file(RemoteFile::new("ui.bundle", 100).tagged("ui"))
        .with_remote_file(RemoteFile::new("level1.bundle", 300).tagged("levels"))
        .with_remote_file(RemoteFile::new("level2.bundle", 200).tagged("levels"))
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_initialize_with_mismatched_options_fails() {
    let mut module = module();
    let package = module
        .create_package("main", Provider::bundle(MockBackend::bundle()))
        .unwrap();

    let options = InitOptions::ManagedCatalog(CatalogOptions::default());
    assert!(!run_ticked(module.context(), package.initialize_async(options)));
    assert!(!package.is_initialized());
}

#[test]
fn test_initialize_failure_leaves_package_uninitialized() {
    let mut module = module();
    let backend = MockBackend::catalog().fail_initialize("catalog unreachable");
    let package = module
        .create_package("main", Provider::managed_catalog(backend.clone()))
        .unwrap();

    let options = InitOptions::ManagedCatalog(CatalogOptions::default());
    assert!(!run_ticked(module.context(), package.initialize_async(options)));
    assert!(matches!(
        package.load_asset_async::<Prefab>("hero.prefab"),
        Err(AssetError::NotInitialized { .. })
    ));
    assert_eq!(backend.total_releases(), 1);
}

#[test]
fn test_initialize_twice_is_a_no_op() {
    let mut module = module();
    let backend = MockBackend::bundle();
    let package = bundle_package(&mut module, "main", &backend);

    let options = InitOptions::Bundle(BundleOptions::default());
    assert!(run_ticked(module.context(), package.initialize_async(options)));
    let inits = backend
        .calls()
        .iter()
        .filter(|call| **call == BackendCall::Initialize)
        .count();
    assert_eq!(inits, 1);
}

#[test]
fn test_destroy_requires_initialization() {
    let mut module = module();
    let backend = MockBackend::bundle();
    let package = bundle_package(&mut module, "main", &backend);

    assert!(run_ticked(module.context(), package.destroy_async()));
    assert!(!package.is_initialized());
    assert!(!run_ticked(module.context(), package.destroy_async()));
}

// ============================================================================
// Capabilities
// ============================================================================

#[test]
fn test_catalog_rejects_bundle_only_operations() {
    let mut module = module();
    let backend = MockBackend::catalog();
    let package = catalog_package(&mut module, "main", &backend);

    assert!(matches!(
        package.load_raw_file_async("config.json"),
        Err(AssetError::Unsupported {
            operation: "load_raw_file",
            provider: ProviderKind::ManagedCatalog,
        })
    ));
    let by_tags = ClearCacheMode::ByTags(vec!["ui".into()]);
    assert!(matches!(
        run_ticked(module.context(), package.clear_cache_files_async(by_tags)),
        Err(AssetError::Unsupported { .. })
    ));
    assert!(run_ticked(module.context(), package.clear_cache_files_async(ClearCacheMode::All)).unwrap());
}

#[test]
fn test_capability_checked_before_initialization() {
    let mut module = module();
    let package = module
        .create_package("main", Provider::managed_catalog(MockBackend::catalog()))
        .unwrap();

    assert!(matches!(
        package.load_raw_file_async("config.json"),
        Err(AssetError::Unsupported { .. })
    ));
    assert!(matches!(
        package.create_downloader_for_all(4, 1),
        Err(AssetError::NotInitialized { .. })
    ));
}

// ============================================================================
// Manifest & cache
// ============================================================================

#[test]
fn test_request_and_update_manifest() {
    let mut module = module();
    let backend = MockBackend::bundle().with_latest_version("2.0.0");
    let package = bundle_package(&mut module, "main", &backend);

    let latest = run_ticked(module.context(), package.request_version_async(VersionRequest::default())).unwrap();
    assert_eq!(latest, "2.0.0");
    assert_eq!(package.active_version(), None);

    assert!(run_ticked(module.context(), package.update_manifest_async(&latest)).unwrap());
    assert_eq!(package.active_version().as_deref(), Some("2.0.0"));

    assert!(!run_ticked(module.context(), package.update_manifest_async("9.9.9")).unwrap());
    assert_eq!(package.active_version().as_deref(), Some("2.0.0"));

    assert!(matches!(
        run_ticked(module.context(), package.update_manifest_async("")),
        Err(AssetError::InvalidArgument { .. })
    ));
}

#[test]
fn test_clear_cache_by_tags_on_bundle() {
    let mut module = module();
    let backend = MockBackend::bundle();
    let package = bundle_package(&mut module, "main", &backend);

    let mode = ClearCacheMode::ByTags(vec!["levels".into()]);
    assert!(run_ticked(module.context(), package.clear_cache_files_async(mode.clone())).unwrap());
    assert!(backend.calls().contains(&BackendCall::ClearCache(mode)));
}

#[test]
fn test_unload_unused_assets_reaches_provider() {
    let mut module = module();
    let backend = MockBackend::catalog();
    let package = catalog_package(&mut module, "main", &backend);

    run_ticked(module.context(), package.unload_unused_assets_async()).unwrap();
    assert_eq!(backend.calls().last(), Some(&BackendCall::UnloadUnused));
}

// ============================================================================
// Downloads
// ============================================================================

#[test]
fn test_catalog_downloader_reports_no_telemetry() {
    let mut module = module();
    let backend = remote_backend(MockBackend::catalog());
    let package = catalog_package(&mut module, "main", &backend);

    let downloader = package.create_downloader_for_all(4, 2).unwrap();
    assert_eq!(downloader.download_status(), DownloadStatus::NotStarted);
    assert_eq!(downloader.total_download_count(), 0);
    assert_eq!(downloader.total_download_bytes(), 0);
    assert!(matches!(downloader.pause(), Err(AssetError::Unsupported { .. })));

    assert_eq!(run_ticked(module.context(), downloader.start_async(None)), Ok(()));
    assert_eq!(downloader.download_status(), DownloadStatus::Succeeded);
    assert_eq!(downloader.current_download_bytes(), 0);
}

#[test]
fn test_catalog_package_limits_download_features() {
    let mut module = module();
    // A backend whose downloads report every optional feature
    let backend = remote_backend(MockBackend::bundle());
    let package = catalog_package(&mut module, "main", &backend);
    assert_eq!(package.kind(), ProviderKind::ManagedCatalog);
    backend.set_manual(true);

    let ui = package.create_downloader_for_tags(["ui"], 1, 0).unwrap();
    let levels = package.create_downloader_for_tags(["levels"], 1, 0).unwrap();
    assert!(ui.capabilities().is_empty());

    ui.begin();
    backend.pump_downloads(50);
    assert_eq!(ui.total_download_bytes(), 0);
    assert_eq!(ui.current_download_bytes(), 0);
    assert_eq!(ui.total_download_count(), 0);

    let unsupported = |result: AssetResult<()>| matches!(result, Err(AssetError::Unsupported { .. }));
    assert!(unsupported(ui.pause()));
    assert!(unsupported(ui.resume()));
    assert!(unsupported(ui.combine(&levels)));
}

#[test]
fn test_bundle_downloader_reports_progress() {
    let mut module = module();
    let backend = remote_backend(MockBackend::bundle());
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let downloader = package.create_downloader_for_tags(["levels"], 2, 0).unwrap();
    assert_eq!(downloader.total_download_count(), 2);
    assert_eq!(downloader.total_download_bytes(), 500);

    downloader.begin();
    assert_eq!(downloader.download_status(), DownloadStatus::InProgress);
    backend.pump_downloads(350);
    assert_eq!(downloader.current_download_bytes(), 350);
    assert_eq!(downloader.current_download_count(), 1);
    assert!((downloader.progress() - 0.7).abs() < 1e-6);

    downloader.pause().unwrap();
    backend.pump_downloads(1_000);
    assert_eq!(downloader.current_download_bytes(), 350);
    downloader.resume().unwrap();

    let result = run_ticked_with(module.context(), downloader.completion(), |_| backend.finish_downloads());
    assert_eq!(result, Ok(()));
    assert_eq!(downloader.download_status(), DownloadStatus::Succeeded);
    assert_eq!(downloader.current_download_count(), 2);
}

#[test]
fn test_download_scope_reaches_provider() {
    let mut module = module();
    let backend = remote_backend(MockBackend::bundle());
    let package = bundle_package(&mut module, "main", &backend);

    let downloader = package
        .create_downloader_for_locations(["ui.bundle"], 1, 3)
        .unwrap();
    assert_eq!(downloader.total_download_bytes(), 100);
    assert_eq!(downloader.location(), "locations:ui.bundle");

    let request = backend.calls().into_iter().find_map(|call| match call {
        BackendCall::CreateDownloader(request) => Some(request),
        _ => None,
    });
    let request = request.unwrap();
    assert_eq!(request.scope, DownloadScope::Locations(vec!["ui.bundle".into()]));
    assert_eq!(request.max_concurrent, 1);
    assert_eq!(request.retry_count, 3);
    assert_eq!(request.version, None);
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let mut module = module();
    let backend = MockBackend::bundle();
    let package = bundle_package(&mut module, "main", &backend);

    assert!(matches!(
        package.create_downloader_for_all(0, 1),
        Err(AssetError::InvalidArgument { .. })
    ));
}

#[test]
fn test_pre_downloader_prepares_version_first() {
    let mut module = module();
    let backend = remote_backend(MockBackend::bundle()).with_latest_version("2.0.0");
    let package = bundle_package(&mut module, "main", &backend);

    let downloader = run_ticked(
        module.context(),
        package.create_pre_downloader_for_tags_async("2.0.0", ["ui"], 2, 1),
    )
    .unwrap();
    assert_eq!(downloader.total_download_bytes(), 100);

    let calls = backend.calls();
    let prepared = calls
        .iter()
        .position(|call| *call == BackendCall::PrepareVersion { version: "2.0.0".into() })
        .unwrap();
    let created = calls
        .iter()
        .position(|call| matches!(call, BackendCall::CreateDownloader(request) if request.version.as_deref() == Some("2.0.0")))
        .unwrap();
    assert!(prepared < created);

    assert!(matches!(
        run_ticked(module.context(), package.create_pre_downloader_for_all_async("7.0.0", 2, 1)),
        Err(AssetError::Operation { .. })
    ));
}

#[test]
fn test_cancel_downloader_stops_native_download() {
    let mut module = module();
    let backend = remote_backend(MockBackend::bundle());
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let downloader = package.create_downloader_for_all(4, 0).unwrap();
    downloader.begin();
    downloader.cancel();

    let probe = backend.downloads().pop().unwrap();
    assert!(probe.was_canceled());
    assert_eq!(probe.state(), JobState::Canceled);
    assert_eq!(probe.release_count(), 1);
    assert_eq!(downloader.download_status(), DownloadStatus::Canceled);

    downloader.dispose();
    assert_eq!(probe.release_count(), 1);
}

#[test]
fn test_start_with_fired_token_cancels() {
    let mut module = module();
    let backend = remote_backend(MockBackend::bundle());
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let downloader = package.create_downloader_for_all(4, 0).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    assert_eq!(
        run_ticked(module.context(), downloader.start_async(Some(token))),
        Err(HandleError::Canceled)
    );
    assert_eq!(backend.downloads()[0].state(), JobState::Canceled);
}

#[test]
fn test_token_fired_mid_download_cancels_natively() {
    let mut module = module();
    let backend = remote_backend(MockBackend::bundle());
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let downloader = package.create_downloader_for_all(4, 0).unwrap();
    let token = CancellationToken::new();
    let result = run_ticked_with(module.context(), downloader.start_async(Some(token.clone())), |tick| {
        backend.pump_downloads(10);
        if tick == 3 {
            token.cancel();
        }
    });
    assert_eq!(result, Err(HandleError::Canceled));

    let probe = backend.downloads().remove(0);
    assert!(probe.was_canceled());
    assert_eq!(probe.release_count(), 1);
}

#[test]
fn test_disposed_downloader_reports_canceled() {
    let mut module = module();
    let backend = remote_backend(MockBackend::bundle());
    let package = bundle_package(&mut module, "main", &backend);

    let downloader = package.create_downloader_for_all(4, 0).unwrap();
    downloader.dispose();
    assert_eq!(downloader.download_status(), DownloadStatus::Canceled);
    assert_eq!(downloader.telemetry(), DownloadTelemetry::default());
    assert!(downloader.capabilities().is_empty());
}

#[test]
fn test_combine_sums_counters_and_completes_both() {
    let mut module = module();
    let backend = remote_backend(MockBackend::bundle());
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let a = package.create_downloader_for_tags(["ui"], 2, 0).unwrap();
    let b = package.create_downloader_for_tags(["levels"], 2, 0).unwrap();
    let expected = a.total_download_bytes() + b.total_download_bytes();

    a.combine(&b).unwrap();
    assert_eq!(a.total_download_bytes(), expected);
    assert_eq!(a.total_download_count(), 3);

    let result = run_ticked_with(module.context(), a.start_async(None), |_| backend.pump_downloads(250));
    assert_eq!(result, Ok(()));
    assert!(b.is_done());
    assert_eq!(b.download_status(), DownloadStatus::Succeeded);
}

#[test]
fn test_combine_rejects_invalid_pairs() {
    let mut module = module();
    let bundle = remote_backend(MockBackend::bundle());
    let catalog = remote_backend(MockBackend::catalog());
    let main = bundle_package(&mut module, "main", &bundle);
    let dlc = bundle_package(&mut module, "dlc", &bundle);
    let managed = catalog_package(&mut module, "managed", &catalog);
    bundle.set_manual(true);

    let a = main.create_downloader_for_all(1, 0).unwrap();
    assert!(matches!(a.combine(&a), Err(AssetError::InvalidArgument { .. })));

    let other_package = dlc.create_downloader_for_all(1, 0).unwrap();
    assert!(matches!(a.combine(&other_package), Err(AssetError::InvalidArgument { .. })));

    let c = managed.create_downloader_for_all(1, 0).unwrap();
    let d = managed.create_downloader_for_all(1, 0).unwrap();
    assert!(matches!(c.combine(&d), Err(AssetError::Unsupported { .. })));

    let canceled = main.create_downloader_for_all(1, 0).unwrap();
    canceled.cancel();
    assert!(matches!(a.combine(&canceled), Err(AssetError::InvalidArgument { .. })));
}

// ============================================================================
// Raw files
// ============================================================================

#[test]
fn test_raw_file_sync_load() {
    let mut module = module();
    let backend = MockBackend::bundle().with_raw_file("config/game.json", r#"{"lives":3}"#);
    let package = bundle_package(&mut module, "main", &backend);

    let handle = package.load_raw_file_sync("config/game.json").unwrap();
    assert_eq!(handle.status(), HandleStatus::Succeeded);
    assert_eq!(handle.text().as_deref(), Some(r#"{"lives":3}"#));
    assert_eq!(handle.data().unwrap().len(), 11);
    assert_eq!(
        handle.file_path(),
        Some(std::path::PathBuf::from("cache").join("config/game.json"))
    );

    let missing = package.load_raw_file_async("config/none.json").unwrap();
    assert_eq!(missing.status(), HandleStatus::Failed);
    assert!(missing.data().is_none());
}

#[test]
fn test_raw_file_cancel_token_is_forwarded() {
    let mut module = module();
    let backend = MockBackend::bundle().with_raw_file("a.bin", vec![1u8, 2, 3]);
    let package = bundle_package(&mut module, "main", &backend);

    let token = CancellationToken::new();
    let _handle = package
        .load_raw_file_async_with("a.bin", LoadSettings::new().cancel_on(token))
        .unwrap();
    assert!(backend.calls().contains(&BackendCall::LoadRawFile {
        location: "a.bin".into(),
        native_cancel: true,
    }));
}

#[test]
fn test_raw_file_cancel_while_loading_releases_once() {
    let mut module = module();
    let backend = MockBackend::bundle().with_raw_file("a.bin", vec![1u8, 2, 3]);
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let token = CancellationToken::new();
    let handle = package
        .load_raw_file_async_with("a.bin", LoadSettings::new().cancel_on(token.clone()))
        .unwrap();
    let probe = backend.last_operation().unwrap();

    token.cancel();
    assert_eq!(
        run_ticked(module.context(), handle.completion()),
        Err(HandleError::Canceled)
    );
    assert_eq!(probe.release_count(), 1);
    assert!(handle.data().is_none());

    probe.complete();
    handle.dispose();
    assert_eq!(probe.release_count(), 1);
}

// ============================================================================
// Instantiation
// ============================================================================

#[test]
fn test_instantiate_loaded_prefab() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);

    let prefab = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    let parent: AssetObject = std::sync::Arc::new(String::from("world"));
    let params = InstantiateParams::new().parent(parent).activate(true);

    let handle = package.instantiate_async(&prefab, &params).unwrap();
    let instance = handle.instance_as::<MockInstance>().unwrap();
    assert!(instance.has_parent);
    assert!(instance.active);
    assert_eq!(instance.prefab_as::<Prefab>().unwrap().name, "hero");
    assert_eq!(handle.location(), "hero.prefab");

    let object = package.instantiate_sync(&prefab, &InstantiateParams::new()).unwrap();
    assert!(!object.downcast_ref::<MockInstance>().unwrap().has_parent);
}

#[test]
fn test_instantiate_rejects_foreign_or_disposed_prefab() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let main = bundle_package(&mut module, "main", &backend);
    let dlc = bundle_package(&mut module, "dlc", &backend);

    let foreign = dlc.load_asset_async::<Prefab>("hero.prefab").unwrap();
    assert!(matches!(
        main.instantiate_async(&foreign, &InstantiateParams::new()),
        Err(AssetError::InvalidArgument { .. })
    ));

    let disposed = main.load_asset_async::<Prefab>("hero.prefab").unwrap();
    disposed.dispose();
    assert!(matches!(
        main.instantiate_async(&disposed, &InstantiateParams::new()),
        Err(AssetError::InvalidArgument { .. })
    ));
}

fn instantiate_calls(backend: &MockBackend) -> usize {
    backend
        .calls()
        .iter()
        .filter(|call| matches!(call, BackendCall::Instantiate { .. }))
        .count()
}

#[test]
fn test_instantiate_waits_for_a_loading_prefab() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let prefab = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    let prefab_op = backend.last_operation().unwrap();
    let handle = package.instantiate_async(&prefab, &InstantiateParams::new()).unwrap();
    assert_eq!(handle.status(), HandleStatus::Loading);
    assert_eq!(handle.progress(), 0.0);
    assert_eq!(instantiate_calls(&backend), 0);

    backend.set_manual(false);
    let result = run_ticked_with(module.context(), handle.completion(), |tick| {
        if tick == 1 {
            prefab_op.complete();
        }
    });
    assert_eq!(result, Ok(()));
    assert_eq!(instantiate_calls(&backend), 1);
    let instance = handle.instance_as::<MockInstance>().unwrap();
    assert_eq!(instance.prefab_as::<Prefab>().unwrap().name, "hero");
    assert_eq!(prefab.status(), HandleStatus::Succeeded);
}

#[test]
fn test_instantiate_fails_with_the_prefab_error() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let prefab = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    let prefab_op = backend.last_operation().unwrap();
    let handle = package.instantiate_async(&prefab, &InstantiateParams::new()).unwrap();

    prefab_op.fail("corrupt prefab");
    assert_eq!(
        run_ticked(module.context(), handle.completion()),
        Err(HandleError::Failed("corrupt prefab".into()))
    );
    assert_eq!(handle.error(), "corrupt prefab");
    assert!(handle.instance().is_none());
    assert_eq!(instantiate_calls(&backend), 0);
}

#[test]
fn test_instantiate_fails_when_prefab_is_disposed_first() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let prefab = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    let prefab_op = backend.last_operation().unwrap();
    let handle = package.instantiate_async(&prefab, &InstantiateParams::new()).unwrap();

    prefab.dispose();
    assert_eq!(handle.status(), HandleStatus::Failed);
    assert_eq!(handle.error(), "prefab handle was disposed");
    assert_eq!(prefab_op.release_count(), 1);
}

#[test]
fn test_cancel_instantiate_while_prefab_loads() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let prefab = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    let token = CancellationToken::new();
    let handle = package
        .instantiate_async(&prefab, &InstantiateParams::new().cancel_on(token.clone()))
        .unwrap();

    token.cancel();
    assert_eq!(
        run_ticked(module.context(), handle.completion()),
        Err(HandleError::Canceled)
    );
    assert_eq!(prefab.status(), HandleStatus::Loading);
    assert_eq!(instantiate_calls(&backend), 0);
}

#[test]
fn test_instantiate_sync_forces_a_loading_prefab() {
    let mut module = module();
    let backend = MockBackend::bundle().with_asset("hero.prefab", Prefab::new("hero"));
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let prefab = package.load_asset_async::<Prefab>("hero.prefab").unwrap();
    let prefab_op = backend.last_operation().unwrap();
    let object = package.instantiate_sync(&prefab, &InstantiateParams::new()).unwrap();

    assert!(object.downcast_ref::<MockInstance>().is_some());
    assert_eq!(prefab_op.wait_count(), 1);
    assert_eq!(prefab.status(), HandleStatus::Succeeded);
}

// ============================================================================
// Scenes
// ============================================================================

#[test]
fn test_scene_load_activate_and_unload() {
    let mut module = module();
    let backend = MockBackend::bundle();
    let package = bundle_package(&mut module, "main", &backend);

    let params = SceneParams::new(SceneLoadMode::Additive).activate_on_load(false);
    let handle = package.load_scene_async("levels/one", &params).unwrap();
    let scene = handle.scene_as::<MockScene>().unwrap();
    assert!(!scene.is_active());

    assert!(handle.activate());
    assert!(scene.is_active());

    assert!(run_ticked(module.context(), package.unload_scene_async(&handle)).unwrap());
    assert!(backend.calls().contains(&BackendCall::UnloadScene {
        location: "levels/one".into(),
    }));
    handle.dispose();
    assert!(!handle.activate());
}

#[test]
fn test_load_scene_sync_ignores_cancellation() {
    let mut module = module();
    let backend = MockBackend::bundle();
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let token = CancellationToken::new();
    token.cancel();
    let params = SceneParams::new(SceneLoadMode::Single).cancel_on(token);
    let handle = package.load_scene_sync("levels/two", &params).unwrap();

    assert_eq!(handle.status(), HandleStatus::Succeeded);
    assert_eq!(backend.last_operation().unwrap().wait_count(), 1);
    assert!(handle.scene_as::<MockScene>().unwrap().is_active());
}

#[test]
fn test_unload_scene_requires_loaded_scene() {
    let mut module = module();
    let backend = MockBackend::bundle();
    let package = bundle_package(&mut module, "main", &backend);
    backend.set_manual(true);

    let handle = package
        .load_scene_async("levels/one", &SceneParams::default())
        .unwrap();
    assert!(!handle.activate());
    assert!(matches!(
        run_ticked(module.context(), package.unload_scene_async(&handle)),
        Err(AssetError::NotReady { .. })
    ));
}
