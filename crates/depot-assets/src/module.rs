//! The module: owner of every package and of the shared handle context.

use std::sync::Arc;

use depot_core::alloc::HashMap;
use parking_lot::Mutex;

use crate::context::AssetContext;
use crate::error::{AssetError, AssetResult};
use crate::package::Package;
use crate::pool::DEFAULT_POOL_CAPACITY;
use crate::provider::Provider;

/// Settings applied by [`AssetModule::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Maximum idle wrappers kept per handle type.
    pub pool_capacity: usize,
    /// Record live handles for leak diagnostics.
    pub track_handles: bool,
    /// Log every handle still live when the module is destroyed.
    pub report_leaks_on_destroy: bool,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            track_handles: cfg!(debug_assertions),
            report_leaks_on_destroy: true,
        }
    }
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    pub fn track_handles(mut self, enabled: bool) -> Self {
        self.track_handles = enabled;
        self
    }

    pub fn report_leaks_on_destroy(mut self, enabled: bool) -> Self {
        self.report_leaks_on_destroy = enabled;
        self
    }
}

/// Registry of packages.
///
/// # Example
///
/// ```ignore
/// let mut module = AssetModule::new();
/// module.initialize(ModuleConfig::default());
///
/// let package = module.create_package("ui", StaticProvider::new().with_root("assets/ui").into())?;
/// package.initialize_async(InitOptions::Static(StaticOptions::default())).await;
///
/// // Once per frame
/// module.tick();
/// ```
pub struct AssetModule {
    context: Arc<AssetContext>,
    config: ModuleConfig,
    initialized: bool,
    packages: HashMap<String, Arc<Package>>,
    default_package: Option<String>,
    names: Mutex<Option<Arc<[String]>>>,
}

impl Default for AssetModule {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetModule {
    /// Create an uninitialized module.
    pub fn new() -> Self {
        let config = ModuleConfig::default();
        Self {
            context: AssetContext::new(config.pool_capacity, config.track_handles),
            config,
            initialized: false,
            packages: HashMap::new(),
            default_package: None,
            names: Mutex::new(None),
        }
    }

    /// Apply `config` and allow packages to be created.
    ///
    /// Calling it again once initialized does nothing.
    pub fn initialize(&mut self, config: ModuleConfig) {
        if self.initialized {
            tracing::debug!("Asset module already initialized");
            return;
        }
        self.context.pools().set_capacity(config.pool_capacity);
        self.context.tracker().set_enabled(config.track_handles);
        tracing::info!(
            "Asset module initialized (pool capacity {}, tracking {})",
            config.pool_capacity,
            config.track_handles
        );
        self.config = config;
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Pools, tracker and scheduler shared with every package.
    pub fn context(&self) -> &Arc<AssetContext> {
        &self.context
    }

    /// Wake every asset future waiting on a native operation. Call once per
    /// frame.
    pub fn tick(&self) -> usize {
        self.context.scheduler().tick()
    }

    /// Create a package backed by `provider`.
    ///
    /// Fails if the module is not initialized, `name` is empty or a package
    /// with that name exists.
    pub fn create_package(&mut self, name: &str, provider: Provider) -> AssetResult<Arc<Package>> {
        if !self.initialized {
            return Err(AssetError::ModuleNotInitialized);
        }
        if name.is_empty() {
            return Err(AssetError::InvalidPackageName);
        }
        if self.packages.contains_key(name) {
            return Err(AssetError::DuplicatePackage { name: name.to_string() });
        }

        let kind = provider.kind();
        let package = Arc::new(Package::new(name, provider, Arc::clone(&self.context)));
        self.packages.insert(name.to_string(), Arc::clone(&package));
        self.invalidate_names();
        tracing::info!("Created package '{}' ({} provider)", name, kind);
        Ok(package)
    }

    /// The package named `name`, if any.
    pub fn get_package(&self, name: &str) -> Option<Arc<Package>> {
        self.packages.get(name).cloned()
    }

    pub fn contains_package(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Remove and destroy the package named `name`.
    ///
    /// Returns `false` if there was none.
    pub fn remove_package(&mut self, name: &str) -> bool {
        let Some(package) = self.detach(name) else {
            return false;
        };
        package.destroy_sync();
        true
    }

    /// Like [`remove_package`](Self::remove_package), but waits for the
    /// provider's teardown instead of forcing it.
    pub async fn remove_package_async(&mut self, name: &str) -> bool {
        let Some(package) = self.detach(name) else {
            return false;
        };
        package.destroy_async().await;
        true
    }

    fn detach(&mut self, name: &str) -> Option<Arc<Package>> {
        let package = self.packages.remove(name)?;
        if self.default_package.as_deref() == Some(name) {
            self.default_package = None;
        }
        self.invalidate_names();
        tracing::info!("Removed package '{}'", name);
        Some(package)
    }

    /// Names of every package, in no particular order.
    ///
    /// The snapshot is cached until the package set changes.
    pub fn package_names(&self) -> Arc<[String]> {
        let mut cached = self.names.lock();
        if let Some(names) = cached.as_ref() {
            return Arc::clone(names);
        }
        let names: Arc<[String]> = self.packages.keys().cloned().collect();
        *cached = Some(Arc::clone(&names));
        names
    }

    fn invalidate_names(&self) {
        *self.names.lock() = None;
    }

    /// Make `name` the package returned by [`default_package`](Self::default_package).
    pub fn set_default_package(&mut self, name: &str) -> AssetResult<()> {
        if !self.packages.contains_key(name) {
            return Err(AssetError::NotFound { path: name.to_string() });
        }
        self.default_package = Some(name.to_string());
        Ok(())
    }

    pub fn default_package(&self) -> Option<Arc<Package>> {
        self.default_package
            .as_deref()
            .and_then(|name| self.get_package(name))
    }

    /// Destroy every package and return to the uninitialized state.
    ///
    /// Handles still alive keep working against their destroyed package's
    /// provider state and must still be disposed.
    pub fn destroy(&mut self) {
        if !self.initialized {
            return;
        }
        for (_, package) in self.packages.drain() {
            package.destroy_sync();
        }
        self.default_package = None;
        self.invalidate_names();

        if self.config.report_leaks_on_destroy {
            let leaked = self.context.tracker().report_leaks();
            if leaked > 0 {
                tracing::warn!("Asset module destroyed with {} live handle(s)", leaked);
            }
        }
        self.context.pools().clear();
        self.initialized = false;
        tracing::info!("Asset module destroyed");
    }
}

impl Drop for AssetModule {
    fn drop(&mut self) {
        self.destroy();
    }
}
