//! The providers a package can be backed by.
//!
//! The set of providers is closed: a built-in [`StaticProvider`] and two
//! managed providers whose native side is supplied through the
//! [`CatalogBackend`] and [`BundleBackend`] traits. What each one supports is
//! described by [`ProviderCaps`], and packages check those capabilities before
//! reaching the backend.

mod static_provider;

pub use static_provider::{SceneHost, StaticProvider};

use std::fmt;

use bitflags::bitflags;

use crate::native::{
    BundleBackend, CatalogBackend, ContentBackend, DownloadCaps, ManifestBackend, NativeOperation, ReadyOperation,
};
use crate::settings::InitOptions;

/// Which provider backs a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Static,
    ManagedCatalog,
    Bundle,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Static => "static",
            ProviderKind::ManagedCatalog => "managed-catalog",
            ProviderKind::Bundle => "bundle",
        }
    }

    /// What this provider supports beyond loading, instantiating and scenes.
    pub fn capabilities(&self) -> ProviderCaps {
        match self {
            ProviderKind::Static => ProviderCaps::empty(),
            ProviderKind::ManagedCatalog => {
                ProviderCaps::DOWNLOAD | ProviderCaps::PRE_DOWNLOAD | ProviderCaps::MANIFEST | ProviderCaps::CLEAR_CACHE
            }
            ProviderKind::Bundle => ProviderCaps::all(),
        }
    }

    /// Download features this provider exposes, whatever its native
    /// downloads report.
    pub fn download_caps(&self) -> DownloadCaps {
        let caps = self.capabilities();
        let mut allowed = DownloadCaps::empty();
        allowed.set(DownloadCaps::TELEMETRY, caps.contains(ProviderCaps::DOWNLOAD_TELEMETRY));
        allowed.set(DownloadCaps::PAUSE, caps.contains(ProviderCaps::DOWNLOAD_PAUSE));
        allowed.set(DownloadCaps::COMBINE, caps.contains(ProviderCaps::DOWNLOAD_COMBINE));
        allowed
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Optional operations of a provider.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProviderCaps: u16 {
        /// Downloaders for the active version.
        const DOWNLOAD = 1 << 0;
        /// Downloaders for a version that is not active yet.
        const PRE_DOWNLOAD = 1 << 1;
        /// Version queries and manifest updates.
        const MANIFEST = 1 << 2;
        /// Clearing all or unused cached files.
        const CLEAR_CACHE = 1 << 3;
        /// Clearing cached files by tag.
        const CLEAR_CACHE_BY_TAG = 1 << 4;
        /// Loading files without decoding them.
        const RAW_FILE = 1 << 5;
        /// Byte and file counters on downloads.
        const DOWNLOAD_TELEMETRY = 1 << 6;
        /// Loads stop natively when their token fires.
        const NATIVE_CANCEL = 1 << 7;
        /// Pausing and resuming downloads.
        const DOWNLOAD_PAUSE = 1 << 8;
        /// Merging downloads.
        const DOWNLOAD_COMBINE = 1 << 9;
    }
}

/// A package's provider.
pub enum Provider {
    /// Content shipped with the application, decoded in-process.
    Static(StaticProvider),
    /// A catalog/manifest-driven managed provider.
    ManagedCatalog(Box<dyn CatalogBackend>),
    /// A bundle/patch provider with full download support.
    Bundle(Box<dyn BundleBackend>),
}

impl Provider {
    pub fn managed_catalog(backend: impl CatalogBackend + 'static) -> Self {
        Provider::ManagedCatalog(Box::new(backend))
    }

    pub fn bundle(backend: impl BundleBackend + 'static) -> Self {
        Provider::Bundle(Box::new(backend))
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Static(_) => ProviderKind::Static,
            Provider::ManagedCatalog(_) => ProviderKind::ManagedCatalog,
            Provider::Bundle(_) => ProviderKind::Bundle,
        }
    }

    pub fn capabilities(&self) -> ProviderCaps {
        self.kind().capabilities()
    }

    pub(crate) fn content(&self) -> &dyn ContentBackend {
        match self {
            Provider::Static(provider) => provider,
            Provider::ManagedCatalog(backend) => &**backend,
            Provider::Bundle(backend) => &**backend,
        }
    }

    pub(crate) fn manifest(&self) -> Option<&dyn ManifestBackend> {
        match self {
            Provider::Static(_) => None,
            Provider::ManagedCatalog(backend) => Some(&**backend),
            Provider::Bundle(backend) => Some(&**backend),
        }
    }

    pub(crate) fn bundle_backend(&self) -> Option<&dyn BundleBackend> {
        match self {
            Provider::Bundle(backend) => Some(&**backend),
            _ => None,
        }
    }

    /// Start initialization with `options`.
    ///
    /// Returns `None` if the options are meant for another provider.
    pub(crate) fn initialize(&self, options: &InitOptions) -> Option<Box<dyn NativeOperation>> {
        match (self, options) {
            (Provider::Static(provider), InitOptions::Static(options)) => {
                let op: Box<dyn NativeOperation> = Box::new(ReadyOperation::from_result(provider.initialize(options)));
                Some(op)
            }
            (Provider::ManagedCatalog(backend), InitOptions::ManagedCatalog(options)) => {
                Some(backend.initialize(options))
            }
            (Provider::Bundle(backend), InitOptions::Bundle(options)) => Some(backend.initialize(options)),
            _ => None,
        }
    }
}

impl From<StaticProvider> for Provider {
    fn from(provider: StaticProvider) -> Self {
        Provider::Static(provider)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider").field(&self.kind()).finish()
    }
}
