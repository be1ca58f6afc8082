//! Packages: named content namespaces bound to one provider.

use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use depot_core::profiling::profile_function;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::Asset;
use crate::context::AssetContext;
use crate::error::{AssetError, AssetResult};
use crate::handle::wrapper::Ticket;
use crate::handle::{
    AfterPrefab, AllAssetsHandle, AssetHandle, Downloader, InstantiateHandle, RawFileHandle, SceneHandle,
};
use crate::native::{AssetObject, AssetRequest, InstantiateOperation, ManifestBackend};
use crate::provider::{Provider, ProviderCaps, ProviderKind};
use crate::scheduler::{OpGuard, drive};
use crate::settings::{
    ClearCacheMode, DownloadRequest, DownloadScope, InitOptions, InstantiateParams, LoadSettings, SceneParams,
    VersionRequest,
};
use crate::state::HandleStatus;

/// A named content namespace backed by one provider.
///
/// Packages are created by [`AssetModule::create_package`](crate::AssetModule::create_package)
/// and shared as `Arc<Package>`. Every operation of the common contract is
/// available on every package; operations the provider does not support
/// return [`AssetError::Unsupported`] before touching the provider.
///
/// Load failures are not errors here: they are reported on the returned
/// handle. `Err` means the call itself was invalid.
pub struct Package {
    name: Arc<str>,
    provider: Arc<Provider>,
    context: Arc<AssetContext>,
    initialized: AtomicBool,
    next_id: AtomicU64,
    active_version: Mutex<Option<String>>,
}

impl Package {
    pub(crate) fn new(name: &str, provider: Provider, context: Arc<AssetContext>) -> Self {
        Self {
            name: Arc::from(name),
            provider: Arc::new(provider),
            context,
            initialized: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            active_version: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    pub fn capabilities(&self) -> ProviderCaps {
        self.provider.capabilities()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// The manifest version installed by the last successful
    /// [`update_manifest_async`](Self::update_manifest_async).
    pub fn active_version(&self) -> Option<String> {
        self.active_version.lock().clone()
    }

    // ==================== Lifecycle ====================

    /// Initialize the provider.
    ///
    /// Returns `false` if the options are meant for another provider or the
    /// provider reported a failure. Initializing twice is a no-op.
    pub async fn initialize_async(&self, options: InitOptions) -> bool {
        if self.is_initialized() {
            tracing::debug!("Package '{}' already initialized", self.name);
            return true;
        }

        let Some(op) = self.provider.initialize(&options) else {
            tracing::warn!(
                "Package '{}' uses the {} provider but got {} options",
                self.name,
                self.kind(),
                options.provider_name()
            );
            return false;
        };

        let guard = OpGuard::new(op);
        match drive(self.context.scheduler(), &*guard).await {
            Ok(()) => {
                self.initialized.store(true, Ordering::Release);
                tracing::info!("Package '{}' initialized ({} provider)", self.name, self.kind());
                true
            }
            Err(error) => {
                tracing::warn!("Package '{}' failed to initialize: {}", self.name, error);
                false
            }
        }
    }

    /// Tear down the provider's state. Returns `false` if the package was not
    /// initialized or the provider reported a failure.
    pub async fn destroy_async(&self) -> bool {
        if !self.initialized.swap(false, Ordering::AcqRel) {
            return false;
        }

        let guard = OpGuard::new(self.provider.content().destroy());
        match drive(self.context.scheduler(), &*guard).await {
            Ok(()) => {
                tracing::info!("Package '{}' destroyed", self.name);
                true
            }
            Err(error) => {
                tracing::warn!("Package '{}' failed to destroy cleanly: {}", self.name, error);
                false
            }
        }
    }

    /// Destroy without suspending, forcing the native teardown to finish.
    pub(crate) fn destroy_sync(&self) {
        if !self.initialized.swap(false, Ordering::AcqRel) {
            return;
        }
        let guard = OpGuard::new(self.provider.content().destroy());
        guard.wait_for_completion();
        match guard.error() {
            Some(error) if guard.is_done() => {
                tracing::warn!("Package '{}' failed to destroy cleanly: {}", self.name, error)
            }
            _ => tracing::info!("Package '{}' destroyed", self.name),
        }
    }

    // ==================== Manifest & cache ====================

    /// Ask the provider for the newest available version.
    pub async fn request_version_async(&self, request: VersionRequest) -> AssetResult<String> {
        let backend = self.manifest_backend(ProviderCaps::MANIFEST, "request_version")?;
        let guard = OpGuard::new(backend.request_version(&request));
        drive(self.context.scheduler(), &*guard)
            .await
            .map_err(|message| AssetError::Operation { message })?;
        guard.version().ok_or_else(|| AssetError::Operation {
            message: "provider returned no version".into(),
        })
    }

    /// Switch the active manifest to `version`.
    ///
    /// Returns `false` if the provider could not install the manifest.
    pub async fn update_manifest_async(&self, version: &str) -> AssetResult<bool> {
        let backend = self.manifest_backend(ProviderCaps::MANIFEST, "update_manifest")?;
        if version.is_empty() {
            return Err(AssetError::InvalidArgument {
                message: "manifest version must not be empty".into(),
            });
        }

        let guard = OpGuard::new(backend.update_manifest(version));
        match drive(self.context.scheduler(), &*guard).await {
            Ok(()) => {
                *self.active_version.lock() = Some(version.to_string());
                tracing::info!("Package '{}' now on manifest {}", self.name, version);
                Ok(true)
            }
            Err(error) => {
                tracing::warn!("Package '{}' failed to update manifest to {}: {}", self.name, version, error);
                Ok(false)
            }
        }
    }

    /// Remove cached files.
    ///
    /// The static provider keeps no cache files, so this always succeeds there.
    pub async fn clear_cache_files_async(&self, mode: ClearCacheMode) -> AssetResult<bool> {
        if self.kind() == ProviderKind::Static {
            tracing::debug!("Package '{}' has no cache files to clear", self.name);
            return Ok(true);
        }

        let required = match mode {
            ClearCacheMode::ByTags(_) => ProviderCaps::CLEAR_CACHE_BY_TAG,
            ClearCacheMode::All | ClearCacheMode::Unused => ProviderCaps::CLEAR_CACHE,
        };
        let backend = self.manifest_backend(required, "clear_cache_files")?;

        let guard = OpGuard::new(backend.clear_cache(&mode));
        match drive(self.context.scheduler(), &*guard).await {
            Ok(()) => Ok(true),
            Err(error) => {
                tracing::warn!("Package '{}' failed to clear cache ({:?}): {}", self.name, mode, error);
                Ok(false)
            }
        }
    }

    // ==================== Downloads ====================

    /// Download every file of the active version that is not cached yet.
    pub fn create_downloader_for_all(&self, max_concurrent: u32, retry_count: u32) -> AssetResult<Downloader> {
        self.create_downloader(DownloadRequest {
            scope: DownloadScope::All,
            max_concurrent,
            retry_count,
            version: None,
        })
    }

    /// Download the files carrying any of `tags`.
    pub fn create_downloader_for_tags<S: Into<String>>(
        &self,
        tags: impl IntoIterator<Item = S>,
        max_concurrent: u32,
        retry_count: u32,
    ) -> AssetResult<Downloader> {
        self.create_downloader(DownloadRequest {
            scope: DownloadScope::Tags(tags.into_iter().map(Into::into).collect()),
            max_concurrent,
            retry_count,
            version: None,
        })
    }

    /// Download the files needed to load `locations`.
    pub fn create_downloader_for_locations<S: Into<String>>(
        &self,
        locations: impl IntoIterator<Item = S>,
        max_concurrent: u32,
        retry_count: u32,
    ) -> AssetResult<Downloader> {
        self.create_downloader(DownloadRequest {
            scope: DownloadScope::Locations(locations.into_iter().map(Into::into).collect()),
            max_concurrent,
            retry_count,
            version: None,
        })
    }

    /// Download everything `version` needs without switching to it.
    pub async fn create_pre_downloader_for_all_async(
        &self,
        version: &str,
        max_concurrent: u32,
        retry_count: u32,
    ) -> AssetResult<Downloader> {
        self.create_pre_downloader(version, DownloadScope::All, max_concurrent, retry_count)
            .await
    }

    pub async fn create_pre_downloader_for_tags_async<S: Into<String>>(
        &self,
        version: &str,
        tags: impl IntoIterator<Item = S>,
        max_concurrent: u32,
        retry_count: u32,
    ) -> AssetResult<Downloader> {
        let scope = DownloadScope::Tags(tags.into_iter().map(Into::into).collect());
        self.create_pre_downloader(version, scope, max_concurrent, retry_count)
            .await
    }

    pub async fn create_pre_downloader_for_locations_async<S: Into<String>>(
        &self,
        version: &str,
        locations: impl IntoIterator<Item = S>,
        max_concurrent: u32,
        retry_count: u32,
    ) -> AssetResult<Downloader> {
        let scope = DownloadScope::Locations(locations.into_iter().map(Into::into).collect());
        self.create_pre_downloader(version, scope, max_concurrent, retry_count)
            .await
    }

    async fn create_pre_downloader(
        &self,
        version: &str,
        scope: DownloadScope,
        max_concurrent: u32,
        retry_count: u32,
    ) -> AssetResult<Downloader> {
        let backend = self.manifest_backend(ProviderCaps::PRE_DOWNLOAD, "create_pre_downloader")?;
        if version.is_empty() {
            return Err(AssetError::InvalidArgument {
                message: "pre-download version must not be empty".into(),
            });
        }

        let guard = OpGuard::new(backend.prepare_version(version));
        drive(self.context.scheduler(), &*guard)
            .await
            .map_err(|message| AssetError::Operation { message })?;
        drop(guard);

        self.create_downloader(DownloadRequest {
            scope,
            max_concurrent,
            retry_count,
            version: Some(version.to_string()),
        })
    }

    fn create_downloader(&self, request: DownloadRequest) -> AssetResult<Downloader> {
        let (required, operation) = match request.version {
            Some(_) => (ProviderCaps::PRE_DOWNLOAD, "create_pre_downloader"),
            None => (ProviderCaps::DOWNLOAD, "create_downloader"),
        };
        let backend = self.manifest_backend(required, operation)?;
        if request.max_concurrent == 0 {
            return Err(AssetError::InvalidArgument {
                message: "max_concurrent must be at least 1".into(),
            });
        }

        let location = match &request.scope {
            DownloadScope::All => "*".to_string(),
            DownloadScope::Tags(tags) => format!("tags:{}", tags.join(",")),
            DownloadScope::Locations(locations) => format!("locations:{}", locations.join(",")),
        };
        let downloader = Downloader::issue(self.ticket(&location, "Downloader", None), self.kind(), || {
            backend.create_downloader(&request)
        });
        tracing::debug!(
            "Package '{}' created downloader {} for {}",
            self.name,
            downloader.id(),
            location
        );
        Ok(downloader)
    }

    // ==================== Loads ====================

    /// Load an asset and block until the provider finishes it.
    ///
    /// Never suspends, so cancellation does not apply.
    pub fn load_asset_sync<T: Asset>(&self, location: &str) -> AssetResult<AssetHandle<T>> {
        let handle = self.load_asset(location, &LoadSettings::default(), false)?;
        handle.wait_for_async_complete();
        Ok(handle)
    }

    pub fn load_asset_async<T: Asset>(&self, location: &str) -> AssetResult<AssetHandle<T>> {
        self.load_asset(location, &LoadSettings::default(), true)
    }

    /// Load an asset with a priority hint and cancellation token.
    pub fn load_asset_async_with<T: Asset>(&self, location: &str, settings: LoadSettings) -> AssetResult<AssetHandle<T>> {
        self.load_asset(location, &settings, true)
    }

    fn load_asset<T: Asset>(
        &self,
        location: &str,
        settings: &LoadSettings,
        cancelable: bool,
    ) -> AssetResult<AssetHandle<T>> {
        profile_function!();
        self.ensure_initialized()?;
        let cancel = settings.cancel.as_ref().filter(|_| cancelable);
        let request = self.asset_request::<T>(location, settings.priority, cancel);
        let content = self.provider.content();
        Ok(AssetHandle::issue(
            self.ticket(location, "AssetHandle", cancel.cloned()),
            || content.load_asset(&request),
        ))
    }

    pub fn load_all_assets_async<T: Asset>(&self, location: &str) -> AssetResult<AllAssetsHandle<T>> {
        self.load_all_assets_async_with(location, LoadSettings::default())
    }

    pub fn load_all_assets_async_with<T: Asset>(
        &self,
        location: &str,
        settings: LoadSettings,
    ) -> AssetResult<AllAssetsHandle<T>> {
        profile_function!();
        self.ensure_initialized()?;
        let request = self.asset_request::<T>(location, settings.priority, settings.cancel.as_ref());
        let content = self.provider.content();
        Ok(AllAssetsHandle::issue(
            self.ticket(location, "AllAssetsHandle", settings.cancel.clone()),
            || content.load_all_assets(&request),
        ))
    }

    /// Load a file without decoding it. Bundle packages only.
    pub fn load_raw_file_sync(&self, location: &str) -> AssetResult<RawFileHandle> {
        let handle = self.load_raw_file(location, None)?;
        handle.wait_for_async_complete();
        Ok(handle)
    }

    pub fn load_raw_file_async(&self, location: &str) -> AssetResult<RawFileHandle> {
        self.load_raw_file(location, None)
    }

    pub fn load_raw_file_async_with(&self, location: &str, settings: LoadSettings) -> AssetResult<RawFileHandle> {
        self.load_raw_file(location, settings.cancel)
    }

    fn load_raw_file(&self, location: &str, cancel: Option<CancellationToken>) -> AssetResult<RawFileHandle> {
        self.require(ProviderCaps::RAW_FILE, "load_raw_file")?;
        self.ensure_initialized()?;
        let backend = self.provider.bundle_backend().ok_or(AssetError::Unsupported {
            operation: "load_raw_file",
            provider: self.kind(),
        })?;
        let native_cancel = cancel.clone();
        Ok(RawFileHandle::issue(self.ticket(location, "RawFileHandle", cancel), || {
            backend.load_raw_file(location, native_cancel.as_ref())
        }))
    }

    // ==================== Instantiation ====================

    /// Instantiate a prefab and block until the instance exists.
    ///
    /// Forces a prefab that is still loading to finish first. `params.cancel`
    /// is ignored.
    pub fn instantiate_sync<T: Asset>(
        &self,
        prefab: &AssetHandle<T>,
        params: &InstantiateParams,
    ) -> AssetResult<AssetObject> {
        let params = InstantiateParams {
            cancel: None,
            ..params.clone()
        };
        let handle = self.instantiate_async(prefab, &params)?;
        handle.wait_for_async_complete();
        match handle.status() {
            HandleStatus::Succeeded => handle.instance().ok_or_else(|| AssetError::Operation {
                message: "provider returned no instance".into(),
            }),
            HandleStatus::Loading => Err(AssetError::Operation {
                message: format!("{} provider cannot instantiate synchronously", self.kind()),
            }),
            _ => Err(AssetError::Operation { message: handle.error() }),
        }
    }

    /// Instantiate a prefab.
    ///
    /// If `prefab` is still loading, the instantiation starts once it has
    /// loaded; if it fails, the returned handle fails with the prefab's error.
    pub fn instantiate_async<T: Asset>(
        &self,
        prefab: &AssetHandle<T>,
        params: &InstantiateParams,
    ) -> AssetResult<InstantiateHandle> {
        self.ensure_initialized()?;
        if prefab.package() != self.name() {
            return Err(AssetError::InvalidArgument {
                message: format!(
                    "prefab belongs to package '{}', not '{}'",
                    prefab.package(),
                    self.name
                ),
            });
        }
        if prefab.is_disposed() {
            return Err(AssetError::InvalidArgument {
                message: "prefab handle was disposed".into(),
            });
        }

        let provider = Arc::clone(&self.provider);
        let instance_params = params.clone();
        let watch = prefab.watch();
        Ok(InstantiateHandle::issue(
            self.ticket(&prefab.location(), "InstantiateHandle", params.cancel.clone()),
            move || {
                let start = move |object: &AssetObject| provider.content().instantiate(object, &instance_params);
                Box::new(AfterPrefab::new(watch, Box::new(start))) as Box<dyn InstantiateOperation>
            },
        ))
    }

    // ==================== Scenes ====================

    /// Load a scene and block until it is loaded. `params.cancel` is ignored.
    pub fn load_scene_sync(&self, location: &str, params: &SceneParams) -> AssetResult<SceneHandle> {
        let handle = self.load_scene(location, params, None)?;
        handle.wait_for_async_complete();
        Ok(handle)
    }

    pub fn load_scene_async(&self, location: &str, params: &SceneParams) -> AssetResult<SceneHandle> {
        self.load_scene(location, params, params.cancel.clone())
    }

    fn load_scene(
        &self,
        location: &str,
        params: &SceneParams,
        cancel: Option<CancellationToken>,
    ) -> AssetResult<SceneHandle> {
        self.ensure_initialized()?;
        let content = self.provider.content();
        Ok(SceneHandle::issue(self.ticket(location, "SceneHandle", cancel), || {
            content.load_scene(location, params)
        }))
    }

    /// Unload the scene `handle` loaded. The handle still has to be disposed.
    ///
    /// Returns `false` if the provider failed to unload it.
    pub async fn unload_scene_async(&self, handle: &SceneHandle) -> AssetResult<bool> {
        self.ensure_initialized()?;
        let scene = handle.scene().ok_or_else(|| AssetError::NotReady {
            location: handle.location(),
        })?;

        let guard = OpGuard::new(self.provider.content().unload_scene(&scene));
        match drive(self.context.scheduler(), &*guard).await {
            Ok(()) => Ok(true),
            Err(error) => {
                tracing::warn!("Package '{}' failed to unload scene: {}", self.name, error);
                Ok(false)
            }
        }
    }

    /// Free loaded content nothing references anymore.
    pub async fn unload_unused_assets_async(&self) -> AssetResult<()> {
        self.ensure_initialized()?;
        let guard = OpGuard::new(self.provider.content().unload_unused());
        drive(self.context.scheduler(), &*guard)
            .await
            .map_err(|message| AssetError::Operation { message })
    }

    // ==================== Helpers ====================

    fn require(&self, caps: ProviderCaps, operation: &'static str) -> AssetResult<()> {
        if self.capabilities().contains(caps) {
            return Ok(());
        }
        tracing::warn!("{} is unsupported by package '{}' ({} provider)", operation, self.name, self.kind());
        Err(AssetError::Unsupported {
            operation,
            provider: self.kind(),
        })
    }

    fn ensure_initialized(&self) -> AssetResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(AssetError::NotInitialized {
                package: self.name.to_string(),
            })
        }
    }

    /// Capability check first, then initialization.
    fn manifest_backend(&self, caps: ProviderCaps, operation: &'static str) -> AssetResult<&dyn ManifestBackend> {
        self.require(caps, operation)?;
        self.ensure_initialized()?;
        self.provider.manifest().ok_or(AssetError::Unsupported {
            operation,
            provider: self.kind(),
        })
    }

    fn asset_request<'a, T: Asset>(
        &self,
        location: &'a str,
        priority: u32,
        cancel: Option<&'a CancellationToken>,
    ) -> AssetRequest<'a> {
        let native_cancel = self.capabilities().contains(ProviderCaps::NATIVE_CANCEL);
        AssetRequest {
            location,
            type_id: TypeId::of::<T>(),
            type_name: T::type_name(),
            priority,
            cancel: cancel.filter(|_| native_cancel),
        }
    }

    fn ticket<'a>(&'a self, location: &'a str, kind: &'static str, cancel: Option<CancellationToken>) -> Ticket<'a> {
        Ticket {
            context: &self.context,
            package: &self.name,
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            location,
            kind,
            cancel,
        }
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("name", &self.name)
            .field("provider", &self.kind())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
