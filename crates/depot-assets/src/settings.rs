//! Request settings and provider options.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::native::AssetObject;

/// Settings for an asset load request.
#[derive(Debug, Clone, Default)]
pub struct LoadSettings {
    /// Scheduling hint forwarded to the provider. Higher loads sooner.
    pub priority: u32,

    /// Cancellation signal observed while the load is pending.
    pub cancel: Option<CancellationToken>,
}

impl LoadSettings {
    /// Create default load settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the priority hint.
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Parameters for instantiating a loaded prefab.
#[derive(Clone)]
pub struct InstantiateParams {
    /// Object the instance is attached under, if any.
    pub parent: Option<AssetObject>,

    /// Keep the instance's world transform when attaching to `parent`.
    pub world_position_preserved: bool,

    /// Whether the instance starts active.
    pub activate: bool,

    /// Cancellation signal for the asynchronous variant.
    pub cancel: Option<CancellationToken>,
}

impl Default for InstantiateParams {
    fn default() -> Self {
        Self {
            parent: None,
            world_position_preserved: true,
            activate: true,
            cancel: None,
        }
    }
}

impl InstantiateParams {
    /// Create default instantiation parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the instance under `parent`.
    pub fn parent(mut self, parent: AssetObject) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set whether the world transform is preserved.
    pub fn world_position_preserved(mut self, preserved: bool) -> Self {
        self.world_position_preserved = preserved;
        self
    }

    /// Set whether the instance starts active.
    pub fn activate(mut self, activate: bool) -> Self {
        self.activate = activate;
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl std::fmt::Debug for InstantiateParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstantiateParams")
            .field("has_parent", &self.parent.is_some())
            .field("world_position_preserved", &self.world_position_preserved)
            .field("activate", &self.activate)
            .finish()
    }
}

/// How a scene is combined with the scenes already loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneLoadMode {
    /// Replace every loaded scene.
    #[default]
    Single,
    /// Load alongside the loaded scenes.
    Additive,
}

/// Parameters for a scene load.
#[derive(Debug, Clone)]
pub struct SceneParams {
    pub mode: SceneLoadMode,
    /// Activate as soon as loading finishes. When `false`, call
    /// [`SceneHandle::activate`](crate::SceneHandle::activate).
    pub activate_on_load: bool,
    pub priority: u32,
    pub cancel: Option<CancellationToken>,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            mode: SceneLoadMode::Single,
            activate_on_load: true,
            priority: 100,
            cancel: None,
        }
    }
}

impl SceneParams {
    /// Default parameters with the given mode.
    pub fn new(mode: SceneLoadMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn activate_on_load(mut self, activate: bool) -> Self {
        self.activate_on_load = activate;
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Which cached files to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearCacheMode {
    /// Every cached file.
    All,
    /// Cached files the active manifest no longer references.
    Unused,
    /// Cached files carrying any of these tags.
    ByTags(Vec<String>),
}

/// Which content a downloader fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadScope {
    All,
    Tags(Vec<String>),
    Locations(Vec<String>),
}

/// A download request as handed to the native provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub scope: DownloadScope,
    /// Maximum number of files fetched at once. Must be at least 1.
    pub max_concurrent: u32,
    /// Attempts per file after the first failure.
    pub retry_count: u32,
    /// Manifest version to fetch for. `None` means the active version;
    /// `Some` makes this a pre-download.
    pub version: Option<String>,
}

/// Options for querying the latest package version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequest {
    /// Append a timestamp to the request so caches are bypassed.
    pub append_timestamp: bool,
    /// Give up after this many seconds.
    pub timeout_secs: u32,
}

impl Default for VersionRequest {
    fn default() -> Self {
        Self {
            append_timestamp: true,
            timeout_secs: 60,
        }
    }
}

/// Provider-specific initialization options.
#[derive(Debug, Clone)]
pub enum InitOptions {
    Static(StaticOptions),
    ManagedCatalog(CatalogOptions),
    Bundle(BundleOptions),
}

impl InitOptions {
    /// Short name of the provider these options are meant for.
    pub fn provider_name(&self) -> &'static str {
        match self {
            InitOptions::Static(_) => "static",
            InitOptions::ManagedCatalog(_) => "managed-catalog",
            InitOptions::Bundle(_) => "bundle",
        }
    }
}

/// Options for the built-in static provider.
#[derive(Debug, Clone, Default)]
pub struct StaticOptions {
    /// Fail initialization if a configured disk root does not exist.
    pub require_root: bool,
}

/// Options for the catalog-driven provider.
#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    /// Catalog to load in addition to the built-in one.
    pub catalog_location: Option<String>,
    /// Check the remote catalog for updates during initialization.
    pub check_for_updates: bool,
}

/// Where the bundle provider gets its content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlayMode {
    /// Only content shipped with the application.
    #[default]
    Offline,
    /// Shipped content plus remote updates.
    HostServer {
        main_url: String,
        fallback_url: String,
    },
}

/// Options for the bundle provider.
#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    pub play_mode: PlayMode,
    /// Directory downloaded bundles are cached in.
    pub cache_root: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_builders() {
        let token = CancellationToken::new();
        let load = LoadSettings::new().priority(5).cancel_on(token.clone());
        assert_eq!(load.priority, 5);
        assert!(load.cancel.is_some());

        let scene = SceneParams::new(SceneLoadMode::Additive).activate_on_load(false);
        assert_eq!(scene.mode, SceneLoadMode::Additive);
        assert!(!scene.activate_on_load);

        let params = InstantiateParams::new().activate(false);
        assert!(!params.activate);
        assert!(params.world_position_preserved);
    }

    #[test]
    fn init_options_name_their_provider() {
        assert_eq!(InitOptions::Static(StaticOptions::default()).provider_name(), "static");
        assert_eq!(
            InitOptions::Bundle(BundleOptions::default()).provider_name(),
            "bundle"
        );
    }
}
