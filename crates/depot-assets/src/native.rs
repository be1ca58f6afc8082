//! The boundary with native content providers.
//!
//! A provider hands back one boxed native operation per request. Handles own
//! those operations exclusively: they poll them, read their results and call
//! [`NativeOperation::release`] at most once.

use std::any::{Any, TypeId};
use std::path::PathBuf;
use std::sync::Arc;

use bitflags::bitflags;
use tokio_util::sync::CancellationToken;

use crate::error::AssetResult;
use crate::settings::{
    BundleOptions, CatalogOptions, ClearCacheMode, DownloadRequest, InstantiateParams, SceneParams,
    VersionRequest,
};

/// A type-erased object produced by a provider (asset, instance or scene).
pub type AssetObject = Arc<dyn Any + Send + Sync>;

/// Status surface shared by every native operation.
pub trait NativeOperation: Send + Sync {
    /// Whether the operation has finished, successfully or not.
    fn is_done(&self) -> bool;

    /// Completion in `[0, 1]`.
    fn progress(&self) -> f32;

    /// The failure message once done, `None` on success or while running.
    fn error(&self) -> Option<String>;

    /// Block until the operation finishes, where the provider supports it.
    fn wait_for_completion(&self) {}

    /// Free the native resource. Called at most once per operation.
    fn release(&self) {}
}

pub trait AssetOperation: NativeOperation {
    fn asset(&self) -> Option<AssetObject>;
}

/// Loads every object stored at one location.
pub trait AllAssetsOperation: NativeOperation {
    /// The loaded objects, in provider order.
    fn assets(&self) -> Option<Arc<[AssetObject]>>;
}

pub trait InstantiateOperation: NativeOperation {
    fn instance(&self) -> Option<AssetObject>;
}

pub trait SceneOperation: NativeOperation {
    fn scene(&self) -> Option<AssetObject>;

    /// Activate a scene that was loaded without activation. Returns `false`
    /// if the provider cannot defer activation.
    fn activate(&self) -> bool {
        false
    }
}

pub trait RawFileOperation: NativeOperation {
    fn data(&self) -> Option<Arc<[u8]>>;

    /// Path of the file in the local cache, if it lives on disk.
    fn file_path(&self) -> Option<PathBuf> {
        None
    }
}

pub trait VersionOperation: NativeOperation {
    fn version(&self) -> Option<String>;
}

bitflags! {
    /// Optional features of a native download operation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DownloadCaps: u8 {
        /// Reports file counts and byte counters.
        const TELEMETRY = 1 << 0;
        /// Can be paused and resumed.
        const PAUSE = 1 << 1;
        /// Can absorb another download of the same package.
        const COMBINE = 1 << 2;
    }
}

/// Counters reported by downloads with [`DownloadCaps::TELEMETRY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadTelemetry {
    pub total_count: u32,
    pub current_count: u32,
    pub total_bytes: u64,
    pub current_bytes: u64,
}

/// A bulk content fetch.
pub trait DownloadOperation: NativeOperation {
    /// Start fetching. Calling it again has no effect.
    fn begin(&self);

    /// Stop fetching for good.
    fn cancel(&self);

    fn capabilities(&self) -> DownloadCaps {
        DownloadCaps::empty()
    }

    fn pause(&self) {}

    fn resume(&self) {}

    fn telemetry(&self) -> DownloadTelemetry {
        DownloadTelemetry::default()
    }

    /// Merge `other` into this download so both finish together.
    ///
    /// Returns `false` if the provider cannot merge the two.
    fn combine(&self, other: &dyn DownloadOperation) -> bool {
        let _ = other;
        false
    }

    /// Concrete type access, used by providers to merge their own operations.
    fn as_any(&self) -> &dyn Any;
}

/// What a provider is asked to load.
#[derive(Debug, Clone, Copy)]
pub struct AssetRequest<'a> {
    pub location: &'a str,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub priority: u32,
    /// Forwarded to providers that can stop work natively.
    pub cancel: Option<&'a CancellationToken>,
}

/// Load, instantiate and scene operations every provider implements.
pub trait ContentBackend: Send + Sync {
    /// Tear down the provider's state for this package.
    fn destroy(&self) -> Box<dyn NativeOperation>;

    fn load_asset(&self, request: &AssetRequest<'_>) -> Box<dyn AssetOperation>;

    fn load_all_assets(&self, request: &AssetRequest<'_>) -> Box<dyn AllAssetsOperation>;

    fn instantiate(&self, prefab: &AssetObject, params: &InstantiateParams) -> Box<dyn InstantiateOperation>;

    fn load_scene(&self, location: &str, params: &SceneParams) -> Box<dyn SceneOperation>;

    fn unload_scene(&self, scene: &AssetObject) -> Box<dyn NativeOperation>;

    /// Free loaded content nothing references anymore.
    fn unload_unused(&self) -> Box<dyn NativeOperation>;
}

/// Versioning, cache and download operations of updatable providers.
pub trait ManifestBackend: Send + Sync {
    fn request_version(&self, request: &VersionRequest) -> Box<dyn VersionOperation>;

    /// Switch the active manifest to `version`.
    fn update_manifest(&self, version: &str) -> Box<dyn NativeOperation>;

    /// Fetch the manifest of `version` without activating it.
    fn prepare_version(&self, version: &str) -> Box<dyn NativeOperation>;

    fn clear_cache(&self, mode: &ClearCacheMode) -> Box<dyn NativeOperation>;

    fn create_downloader(&self, request: &DownloadRequest) -> Box<dyn DownloadOperation>;
}

/// A catalog/manifest-driven managed provider.
///
/// Its downloads carry no telemetry and its cache cannot be cleared by tag.
pub trait CatalogBackend: ContentBackend + ManifestBackend {
    fn initialize(&self, options: &CatalogOptions) -> Box<dyn NativeOperation>;
}

/// A bundle/patch provider with full download support and raw files.
pub trait BundleBackend: ContentBackend + ManifestBackend {
    fn initialize(&self, options: &BundleOptions) -> Box<dyn NativeOperation>;

    fn load_raw_file(&self, location: &str, cancel: Option<&CancellationToken>) -> Box<dyn RawFileOperation>;
}

/// An operation that finished before it was handed out.
///
/// Synchronous providers return these so the handle layer can treat every
/// provider the same way.
pub struct ReadyOperation<V> {
    outcome: Result<V, String>,
}

impl<V> ReadyOperation<V> {
    pub fn ok(value: V) -> Self {
        Self { outcome: Ok(value) }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
        }
    }

    /// Wrap an [`AssetResult`], keeping the error's message.
    pub fn from_result(result: AssetResult<V>) -> Self {
        Self {
            outcome: result.map_err(|e| e.to_string()),
        }
    }

    fn value(&self) -> Option<&V> {
        self.outcome.as_ref().ok()
    }
}

impl<V: Send + Sync> NativeOperation for ReadyOperation<V> {
    fn is_done(&self) -> bool {
        true
    }

    fn progress(&self) -> f32 {
        1.0
    }

    fn error(&self) -> Option<String> {
        self.outcome.as_ref().err().cloned()
    }
}

impl AssetOperation for ReadyOperation<AssetObject> {
    fn asset(&self) -> Option<AssetObject> {
        self.value().cloned()
    }
}

impl InstantiateOperation for ReadyOperation<AssetObject> {
    fn instance(&self) -> Option<AssetObject> {
        self.value().cloned()
    }
}

impl SceneOperation for ReadyOperation<AssetObject> {
    fn scene(&self) -> Option<AssetObject> {
        self.value().cloned()
    }
}

impl AllAssetsOperation for ReadyOperation<Arc<[AssetObject]>> {
    fn assets(&self) -> Option<Arc<[AssetObject]>> {
        self.value().cloned()
    }
}

impl RawFileOperation for ReadyOperation<Arc<[u8]>> {
    fn data(&self) -> Option<Arc<[u8]>> {
        self.value().cloned()
    }
}

impl VersionOperation for ReadyOperation<String> {
    fn version(&self) -> Option<String> {
        self.value().cloned()
    }
}
