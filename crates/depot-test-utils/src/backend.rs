//! An in-memory native provider.
//!
//! [`MockBackend`] implements both managed provider contracts. Tests build
//! it with the content it should serve, hand a clone to
//! [`Provider::managed_catalog`](depot_assets::Provider::managed_catalog) or
//! [`Provider::bundle`](depot_assets::Provider::bundle), and keep the other
//! clone to script completion and inspect what the package asked for.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use depot_assets::native::{
    AllAssetsOperation, AssetOperation, AssetRequest, BundleBackend, CatalogBackend, ContentBackend,
    DownloadOperation, InstantiateOperation, ManifestBackend, NativeOperation, RawFileOperation, SceneOperation,
    VersionOperation,
};
use depot_assets::settings::{DownloadRequest, DownloadScope};
use depot_assets::{
    AssetObject, BundleOptions, CancellationToken, CatalogOptions, ClearCacheMode, DownloadCaps, InstantiateParams,
    SceneParams, VersionRequest,
};
use depot_core::alloc::HashMap;
use parking_lot::Mutex;

use crate::download::{DownloadProbe, MockDownload, RemoteFile};
use crate::operation::{MockInstance, MockOperation, MockScene, MockValue, OpProbe};

/// A call the package layer made into the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Initialize,
    Destroy,
    LoadAsset {
        location: String,
        type_name: &'static str,
        /// Whether a cancellation token was forwarded.
        native_cancel: bool,
    },
    LoadAllAssets {
        location: String,
    },
    Instantiate {
        has_parent: bool,
    },
    LoadScene {
        location: String,
    },
    UnloadScene {
        location: String,
    },
    UnloadUnused,
    RequestVersion,
    UpdateManifest {
        version: String,
    },
    PrepareVersion {
        version: String,
    },
    ClearCache(ClearCacheMode),
    CreateDownloader(DownloadRequest),
    LoadRawFile {
        location: String,
        native_cancel: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Catalog,
    Bundle,
}

struct BackendState {
    flavor: Flavor,
    assets: Mutex<HashMap<String, AssetObject>>,
    collections: Mutex<HashMap<String, Vec<AssetObject>>>,
    raw_files: Mutex<HashMap<String, Arc<[u8]>>>,
    remote: Mutex<Vec<RemoteFile>>,
    /// Known manifest versions, newest last.
    versions: Mutex<Vec<String>>,
    init_error: Mutex<Option<String>>,
    /// Operations stay pending until the test completes them.
    manual: AtomicBool,
    calls: Mutex<Vec<BackendCall>>,
    operations: Mutex<Vec<OpProbe>>,
    downloads: Mutex<Vec<DownloadProbe>>,
}

/// Scriptable native provider shared between a package and its test.
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<BackendState>,
}

impl MockBackend {
    /// A backend with catalog-style downloads: no telemetry, pausing or merging.
    pub fn catalog() -> Self {
        Self::new(Flavor::Catalog)
    }

    /// A backend whose downloads report telemetry and can be paused and merged.
    pub fn bundle() -> Self {
        Self::new(Flavor::Bundle)
    }

    fn new(flavor: Flavor) -> Self {
        Self {
            state: Arc::new(BackendState {
                flavor,
                assets: Mutex::new(HashMap::new()),
                collections: Mutex::new(HashMap::new()),
                raw_files: Mutex::new(HashMap::new()),
                remote: Mutex::new(Vec::new()),
                versions: Mutex::new(vec!["1.0.0".to_string()]),
                init_error: Mutex::new(None),
                manual: AtomicBool::new(false),
                calls: Mutex::new(Vec::new()),
                operations: Mutex::new(Vec::new()),
                downloads: Mutex::new(Vec::new()),
            }),
        }
    }

    // ==================== Content ====================

    pub fn with_asset<T: Send + Sync + 'static>(self, location: impl Into<String>, asset: T) -> Self {
        self.state.assets.lock().insert(location.into(), Arc::new(asset));
        self
    }

    /// Serve several objects from one location, for `load_all_assets`.
    pub fn with_collection(self, location: impl Into<String>, objects: Vec<AssetObject>) -> Self {
        self.state.collections.lock().insert(location.into(), objects);
        self
    }

    pub fn with_raw_file(self, location: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        self.state.raw_files.lock().insert(location.into(), Arc::from(data));
        self
    }

    /// A file downloaders can fetch.
    pub fn with_remote_file(self, file: RemoteFile) -> Self {
        self.state.remote.lock().push(file);
        self
    }

    /// Publish a newer manifest version.
    pub fn with_latest_version(self, version: impl Into<String>) -> Self {
        self.state.versions.lock().push(version.into());
        self
    }

    /// Make initialization fail with `message`.
    pub fn fail_initialize(self, message: impl Into<String>) -> Self {
        *self.state.init_error.lock() = Some(message.into());
        self
    }

    /// Keep every new operation pending until [`complete_all`](Self::complete_all)
    /// or its probe completes it.
    pub fn manual_completion(self) -> Self {
        self.set_manual(true);
        self
    }

    pub fn set_manual(&self, manual: bool) {
        self.state.manual.store(manual, Ordering::SeqCst);
    }

    // ==================== Inspection ====================

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.calls.lock().len()
    }

    /// Probes of every operation issued so far, oldest first.
    pub fn operations(&self) -> Vec<OpProbe> {
        self.state.operations.lock().clone()
    }

    pub fn last_operation(&self) -> Option<OpProbe> {
        self.state.operations.lock().last().cloned()
    }

    /// Probes of every download issued so far, oldest first.
    pub fn downloads(&self) -> Vec<DownloadProbe> {
        self.state.downloads.lock().clone()
    }

    /// Finish every pending operation with its scripted outcome.
    pub fn complete_all(&self) {
        for probe in self.state.operations.lock().iter() {
            probe.complete();
        }
    }

    /// Deliver up to `bytes` bytes to every running download.
    pub fn pump_downloads(&self, bytes: u64) {
        for probe in self.state.downloads.lock().iter() {
            probe.pump(bytes);
        }
    }

    pub fn finish_downloads(&self) {
        for probe in self.state.downloads.lock().iter() {
            probe.finish();
        }
    }

    /// Total `release` calls across every operation and download.
    pub fn total_releases(&self) -> usize {
        let operations: usize = self.state.operations.lock().iter().map(OpProbe::release_count).sum();
        let downloads: usize = self.state.downloads.lock().iter().map(DownloadProbe::release_count).sum();
        operations + downloads
    }

    // ==================== Internals ====================

    fn record(&self, call: BackendCall) {
        self.state.calls.lock().push(call);
    }

    fn operation(&self, label: String, outcome: Result<MockValue, String>) -> Box<MockOperation> {
        let (op, probe) = if self.state.manual.load(Ordering::SeqCst) {
            MockOperation::pending(label, outcome)
        } else {
            MockOperation::ready(label, outcome)
        };
        self.state.operations.lock().push(probe);
        Box::new(op)
    }

    fn latest_version(&self) -> Option<String> {
        self.state.versions.lock().last().cloned()
    }

    fn knows_version(&self, version: &str) -> bool {
        self.state.versions.lock().iter().any(|known| known == version)
    }

    fn initialize_op(&self) -> Box<dyn NativeOperation> {
        self.record(BackendCall::Initialize);
        let outcome = match self.state.init_error.lock().clone() {
            Some(message) => Err(message),
            None => Ok(MockValue::Unit),
        };
        self.operation("initialize".into(), outcome)
    }

    fn files_for(&self, scope: &DownloadScope) -> Vec<RemoteFile> {
        let remote = self.state.remote.lock();
        remote
            .iter()
            .filter(|file| match scope {
                DownloadScope::All => true,
                DownloadScope::Tags(tags) => file.tags.iter().any(|tag| tags.contains(tag)),
                DownloadScope::Locations(locations) => locations.contains(&file.location),
            })
            .cloned()
            .collect()
    }
}

impl ContentBackend for MockBackend {
    fn destroy(&self) -> Box<dyn NativeOperation> {
        self.record(BackendCall::Destroy);
        self.operation("destroy".into(), Ok(MockValue::Unit))
    }

    fn load_asset(&self, request: &AssetRequest<'_>) -> Box<dyn AssetOperation> {
        self.record(BackendCall::LoadAsset {
            location: request.location.to_string(),
            type_name: request.type_name,
            native_cancel: request.cancel.is_some(),
        });
        let outcome = match self.state.assets.lock().get(request.location) {
            Some(object) => Ok(MockValue::Object(Arc::clone(object))),
            None => Err(format!("no asset at '{}'", request.location)),
        };
        self.operation(format!("load_asset {}", request.location), outcome)
    }

    fn load_all_assets(&self, request: &AssetRequest<'_>) -> Box<dyn AllAssetsOperation> {
        self.record(BackendCall::LoadAllAssets {
            location: request.location.to_string(),
        });
        let outcome = match self.state.collections.lock().get(request.location) {
            Some(objects) => Ok(MockValue::Objects(Arc::from(objects.as_slice()))),
            None => Err(format!("no assets at '{}'", request.location)),
        };
        self.operation(format!("load_all_assets {}", request.location), outcome)
    }

    fn instantiate(&self, prefab: &AssetObject, params: &InstantiateParams) -> Box<dyn InstantiateOperation> {
        self.record(BackendCall::Instantiate {
            has_parent: params.parent.is_some(),
        });
        let instance: AssetObject = Arc::new(MockInstance {
            prefab: Arc::clone(prefab),
            has_parent: params.parent.is_some(),
            active: params.activate,
        });
        self.operation("instantiate".into(), Ok(MockValue::Object(instance)))
    }

    fn load_scene(&self, location: &str, params: &SceneParams) -> Box<dyn SceneOperation> {
        self.record(BackendCall::LoadScene {
            location: location.to_string(),
        });
        let scene: AssetObject = Arc::new(MockScene::new(location, params.activate_on_load));
        self.operation(format!("load_scene {}", location), Ok(MockValue::Object(scene)))
    }

    fn unload_scene(&self, scene: &AssetObject) -> Box<dyn NativeOperation> {
        let location = scene
            .downcast_ref::<MockScene>()
            .map(|scene| scene.location.clone())
            .unwrap_or_default();
        self.record(BackendCall::UnloadScene {
            location: location.clone(),
        });
        let outcome = if location.is_empty() {
            Err("not a scene of this provider".to_string())
        } else {
            Ok(MockValue::Unit)
        };
        self.operation(format!("unload_scene {}", location), outcome)
    }

    fn unload_unused(&self) -> Box<dyn NativeOperation> {
        self.record(BackendCall::UnloadUnused);
        self.operation("unload_unused".into(), Ok(MockValue::Unit))
    }
}

impl ManifestBackend for MockBackend {
    fn request_version(&self, _request: &VersionRequest) -> Box<dyn VersionOperation> {
        self.record(BackendCall::RequestVersion);
        let outcome = self
            .latest_version()
            .map(MockValue::Version)
            .ok_or_else(|| "no published versions".to_string());
        self.operation("request_version".into(), outcome)
    }

    fn update_manifest(&self, version: &str) -> Box<dyn NativeOperation> {
        self.record(BackendCall::UpdateManifest {
            version: version.to_string(),
        });
        let outcome = if self.knows_version(version) {
            Ok(MockValue::Unit)
        } else {
            Err(format!("unknown manifest version {}", version))
        };
        self.operation(format!("update_manifest {}", version), outcome)
    }

    fn prepare_version(&self, version: &str) -> Box<dyn NativeOperation> {
        self.record(BackendCall::PrepareVersion {
            version: version.to_string(),
        });
        let outcome = if self.knows_version(version) {
            Ok(MockValue::Unit)
        } else {
            Err(format!("unknown manifest version {}", version))
        };
        self.operation(format!("prepare_version {}", version), outcome)
    }

    fn clear_cache(&self, mode: &ClearCacheMode) -> Box<dyn NativeOperation> {
        self.record(BackendCall::ClearCache(mode.clone()));
        self.operation("clear_cache".into(), Ok(MockValue::Unit))
    }

    fn create_downloader(&self, request: &DownloadRequest) -> Box<dyn DownloadOperation> {
        self.record(BackendCall::CreateDownloader(request.clone()));
        let caps = match self.state.flavor {
            Flavor::Catalog => DownloadCaps::empty(),
            Flavor::Bundle => DownloadCaps::TELEMETRY | DownloadCaps::PAUSE | DownloadCaps::COMBINE,
        };
        let label = format!("download {:?}", request.scope);
        let (download, probe) = MockDownload::new(label, self.files_for(&request.scope), caps);
        let download = if self.state.manual.load(Ordering::SeqCst) {
            download
        } else {
            download.finishing_on_begin()
        };
        self.state.downloads.lock().push(probe);
        Box::new(download)
    }
}

impl CatalogBackend for MockBackend {
    fn initialize(&self, _options: &CatalogOptions) -> Box<dyn NativeOperation> {
        self.initialize_op()
    }
}

impl BundleBackend for MockBackend {
    fn initialize(&self, _options: &BundleOptions) -> Box<dyn NativeOperation> {
        self.initialize_op()
    }

    fn load_raw_file(&self, location: &str, cancel: Option<&CancellationToken>) -> Box<dyn RawFileOperation> {
        self.record(BackendCall::LoadRawFile {
            location: location.to_string(),
            native_cancel: cancel.is_some(),
        });
        let outcome = match self.state.raw_files.lock().get(location) {
            Some(data) => Ok(MockValue::File {
                data: Arc::clone(data),
                path: PathBuf::from("cache").join(location),
            }),
            None => Err(format!("no raw file at '{}'", location)),
        };
        self.operation(format!("load_raw_file {}", location), outcome)
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("flavor", &self.state.flavor)
            .field("calls", &self.call_count())
            .finish()
    }
}
