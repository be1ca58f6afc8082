//! Depot Assets
//!
//! A provider-agnostic asset layer. An [`AssetModule`] owns named
//! [`Package`]s, each bound to one [`Provider`]: the built-in
//! [`StaticProvider`], a managed catalog backend or a bundle backend with
//! download support. Package operations return handles that own one native
//! operation each; handles are polled or awaited, then disposed, which
//! releases the native operation and returns the handle's wrapper to a pool.
//!
//! Futures returned by this crate are woken by [`AssetModule::tick`], which
//! the host calls once per frame.

pub mod context;
pub mod error;
pub mod handle;
pub mod io;
pub mod loader;
pub mod module;
pub mod native;
pub mod package;
pub mod pool;
pub mod provider;
pub mod scheduler;
pub mod settings;
mod state;
pub mod tracker;

pub use context::AssetContext;
pub use error::{AssetError, AssetResult, HandleError};
pub use handle::{
    AllAssetsHandle, AssetHandle, AssetList, DownloadStatus, Downloader, InstantiateHandle, RawFileHandle,
    SceneHandle,
};
pub use io::{BytesReader, FileReader, MemoryReader};
pub use loader::{AssetLoader, BytesLoader, LoadContext, LoaderRegistry, TextLoader};
pub use module::{AssetModule, ModuleConfig};
pub use native::{AssetObject, DownloadCaps, DownloadTelemetry, ReadyOperation};
pub use package::Package;
pub use pool::{DEFAULT_POOL_CAPACITY, HandlePool, Poolable};
pub use provider::{Provider, ProviderCaps, ProviderKind, SceneHost, StaticProvider};
pub use settings::{
    BundleOptions, CatalogOptions, ClearCacheMode, InitOptions, InstantiateParams, LoadSettings, PlayMode,
    SceneLoadMode, SceneParams, StaticOptions, VersionRequest,
};
pub use state::HandleStatus;
pub use tokio_util::sync::CancellationToken;

/// Marker trait for types that can be loaded as assets.
pub trait Asset: Send + Sync + 'static {
    /// Get a human-readable name for this asset type.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl Asset for String {
    fn type_name() -> &'static str {
        "String"
    }
}

impl Asset for Vec<u8> {
    fn type_name() -> &'static str {
        "Bytes"
    }
}
