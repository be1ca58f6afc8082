//! Error types for the asset system.

use std::any::TypeId;
use std::fmt;
use std::path::PathBuf;

use crate::provider::ProviderKind;

/// Errors returned synchronously by packages, the module and the static provider.
///
/// These are programmer or configuration errors. Data-dependent load failures
/// are reported on the handle instead, see [`HandleError`].
#[derive(Debug)]
pub enum AssetError {
    /// The requested asset was not found.
    NotFound {
        /// The location of the asset.
        path: String,
    },

    /// Failed to read asset data from a reader.
    IoError {
        /// The path that failed to load.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// No loader registered for this asset type.
    NoLoader {
        /// The type ID of the asset.
        type_id: TypeId,
        /// Human-readable type name if available.
        type_name: Option<&'static str>,
    },

    /// No loader found for the given file extension.
    NoLoaderForExtension {
        /// The file extension.
        extension: String,
    },

    /// The loader failed to parse/decode the asset.
    LoaderError {
        /// The location being loaded.
        path: String,
        /// Description of the error.
        message: String,
    },

    /// A native result did not have the requested type.
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Requested type ID.
        actual: TypeId,
    },

    /// The module has not been initialized yet.
    ModuleNotInitialized,

    /// The package has not been initialized (or was destroyed).
    NotInitialized {
        /// Name of the package.
        package: String,
    },

    /// The package's provider does not implement this operation.
    Unsupported {
        /// Name of the operation.
        operation: &'static str,
        /// The provider that rejected it.
        provider: ProviderKind,
    },

    /// A package with this name already exists in the module.
    DuplicatePackage {
        /// The duplicated name.
        name: String,
    },

    /// Package names must be non-empty.
    InvalidPackageName,

    /// The asset is not ready yet (still loading).
    NotReady {
        /// The location of the asset.
        location: String,
    },

    /// An argument was rejected before reaching the provider.
    InvalidArgument {
        /// Why it was rejected.
        message: String,
    },

    /// A native package-level operation reported failure.
    Operation {
        /// The native error message.
        message: String,
    },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound { path } => {
                write!(f, "Asset not found: {}", path)
            }
            AssetError::IoError { path, source } => {
                write!(f, "IO error loading '{}': {}", path.display(), source)
            }
            AssetError::NoLoader { type_name, .. } => {
                if let Some(name) = type_name {
                    write!(f, "No loader registered for asset type: {}", name)
                } else {
                    write!(f, "No loader registered for asset type")
                }
            }
            AssetError::NoLoaderForExtension { extension } => {
                write!(f, "No loader registered for extension: .{}", extension)
            }
            AssetError::LoaderError { path, message } => {
                write!(f, "Failed to load '{}': {}", path, message)
            }
            AssetError::TypeMismatch { expected, .. } => {
                write!(f, "Type mismatch: expected {}", expected)
            }
            AssetError::ModuleNotInitialized => {
                write!(f, "Asset module is not initialized")
            }
            AssetError::NotInitialized { package } => {
                write!(f, "Package '{}' is not initialized", package)
            }
            AssetError::Unsupported { operation, provider } => {
                write!(f, "{} is unsupported for the {} provider", operation, provider)
            }
            AssetError::DuplicatePackage { name } => {
                write!(f, "Package '{}' already exists", name)
            }
            AssetError::InvalidPackageName => {
                write!(f, "Package name must not be empty")
            }
            AssetError::NotReady { location } => {
                write!(f, "Asset not ready: {}", location)
            }
            AssetError::InvalidArgument { message } => {
                write!(f, "Invalid argument: {}", message)
            }
            AssetError::Operation { message } => {
                write!(f, "Operation failed: {}", message)
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::IoError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AssetError {
    fn from(err: std::io::Error) -> Self {
        AssetError::IoError {
            path: PathBuf::new(),
            source: err,
        }
    }
}

/// Result type alias for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Why a handle's completion future did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The cancellation token fired before the native operation finished.
    Canceled,
    /// The native operation failed with this message.
    Failed(String),
    /// The handle was disposed before or while it was awaited.
    Disposed,
}

impl HandleError {
    /// Returns `true` for [`HandleError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, HandleError::Canceled)
    }
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::Canceled => write!(f, "operation was canceled"),
            HandleError::Failed(message) => write!(f, "{}", message),
            HandleError::Disposed => write!(f, "handle was disposed"),
        }
    }
}

impl std::error::Error for HandleError {}
