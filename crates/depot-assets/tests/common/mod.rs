//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use depot_assets::*;
use depot_test_utils::{MockBackend, run_ticked};

/// A module with handle tracking on and the given pool capacity.
pub fn module_with_capacity(capacity: usize) -> AssetModule {
    depot_core::logging::init_for_tests();
    let mut module = AssetModule::new();
    module.initialize(
        ModuleConfig::new()
            .pool_capacity(capacity)
            .track_handles(true)
            .report_leaks_on_destroy(false),
    );
    module
}

pub fn module() -> AssetModule {
    module_with_capacity(DEFAULT_POOL_CAPACITY)
}

/// Create and initialize a bundle package named `name` backed by `backend`.
pub fn bundle_package(module: &mut AssetModule, name: &str, backend: &MockBackend) -> Arc<Package> {
    let package = module
        .create_package(name, Provider::bundle(backend.clone()))
        .expect("create bundle package");
    let options = InitOptions::Bundle(BundleOptions::default());
    assert!(run_ticked(module.context(), package.initialize_async(options)));
    package
}

/// Create and initialize a catalog package named `name` backed by `backend`.
pub fn catalog_package(module: &mut AssetModule, name: &str, backend: &MockBackend) -> Arc<Package> {
    let package = module
        .create_package(name, Provider::managed_catalog(backend.clone()))
        .expect("create catalog package");
    let options = InitOptions::ManagedCatalog(CatalogOptions::default());
    assert!(run_ticked(module.context(), package.initialize_async(options)));
    package
}

/// An asset type no loader or backend produces unless a test registers it.
#[derive(Debug, Clone, PartialEq)]
pub struct Prefab {
    pub name: String,
}

impl Prefab {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

impl Asset for Prefab {
    fn type_name() -> &'static str {
        "Prefab"
    }
}
