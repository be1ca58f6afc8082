//! Decoders used by the static provider.

use std::any::TypeId;
use std::sync::Arc;

use depot_core::alloc::HashMap;

use crate::error::{AssetError, AssetResult};
use crate::native::AssetObject;

/// What a loader gets to decode.
pub struct LoadContext<'a> {
    /// Location of the file being decoded.
    pub location: &'a str,
    /// The raw bytes of the file.
    pub bytes: &'a [u8],
    /// File extension (without the dot), lowercase.
    pub extension: &'a str,
}

impl<'a> LoadContext<'a> {
    pub fn new(location: &'a str, bytes: &'a [u8], extension: &'a str) -> Self {
        Self {
            location,
            bytes,
            extension,
        }
    }

    /// A [`AssetError::LoaderError`] for this file.
    pub fn error(&self, message: impl Into<String>) -> AssetError {
        AssetError::LoaderError {
            path: self.location.to_string(),
            message: message.into(),
        }
    }
}

/// Default priority for loaders.
pub const DEFAULT_LOADER_PRIORITY: i32 = 0;

/// Decodes one asset type from bytes.
///
/// # Example
///
/// ```ignore
/// struct LevelLoader;
///
/// impl AssetLoader for LevelLoader {
///     type Asset = Level;
///
///     fn extensions(&self) -> &[&str] {
///         &["level"]
///     }
///
///     fn load(&self, ctx: LoadContext<'_>) -> AssetResult<Level> {
///         Level::parse(ctx.bytes).map_err(|e| ctx.error(e.to_string()))
///     }
/// }
/// ```
pub trait AssetLoader: Send + Sync + 'static {
    /// The asset type this loader produces.
    type Asset: crate::Asset;

    /// The file extensions this loader handles (without dots).
    fn extensions(&self) -> &[&str];

    fn load(&self, ctx: LoadContext<'_>) -> AssetResult<Self::Asset>;

    /// Higher priority loaders win when several handle the same type and
    /// extension.
    fn priority(&self) -> i32 {
        DEFAULT_LOADER_PRIORITY
    }
}

/// Type-erased asset loader for dynamic dispatch.
trait ErasedAssetLoader: Send + Sync {
    fn extensions(&self) -> &[&str];

    fn priority(&self) -> i32;

    fn load_erased(&self, ctx: LoadContext<'_>) -> AssetResult<AssetObject>;
}

impl<L: AssetLoader> ErasedAssetLoader for L {
    fn extensions(&self) -> &[&str] {
        AssetLoader::extensions(self)
    }

    fn priority(&self) -> i32 {
        AssetLoader::priority(self)
    }

    fn load_erased(&self, ctx: LoadContext<'_>) -> AssetResult<AssetObject> {
        let asset = self.load(ctx)?;
        Ok(Arc::new(asset))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LoaderKey {
    type_id: TypeId,
    extension: String,
}

struct LoaderEntry {
    loader: Arc<dyn ErasedAssetLoader>,
    priority: i32,
}

/// Loaders indexed by asset type and extension.
///
/// If multiple loaders match, the one with highest priority is used.
#[derive(Default)]
pub struct LoaderRegistry {
    /// Sorted by priority, highest first.
    by_type_and_ext: HashMap<LoaderKey, Vec<LoaderEntry>>,
    /// Extensions each type can be decoded from, in registration order.
    extensions_by_type: HashMap<TypeId, Vec<String>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with [`TextLoader`] and [`BytesLoader`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TextLoader);
        registry.register(BytesLoader);
        registry
    }

    /// Register a loader for its declared extensions.
    pub fn register<L: AssetLoader>(&mut self, loader: L) {
        let loader: Arc<dyn ErasedAssetLoader> = Arc::new(loader);
        let type_id = TypeId::of::<L::Asset>();
        let priority = loader.priority();

        for ext in loader.extensions() {
            let ext_lower = ext.to_lowercase();
            let entries = self
                .by_type_and_ext
                .entry(LoaderKey {
                    type_id,
                    extension: ext_lower.clone(),
                })
                .or_default();
            entries.push(LoaderEntry {
                loader: loader.clone(),
                priority,
            });
            entries.sort_by(|a, b| b.priority.cmp(&a.priority));

            let known = self.extensions_by_type.entry(type_id).or_default();
            if !known.contains(&ext_lower) {
                known.push(ext_lower);
            }
        }
    }

    fn best(&self, type_id: TypeId, extension: &str) -> Option<&Arc<dyn ErasedAssetLoader>> {
        let key = LoaderKey {
            type_id,
            extension: extension.to_lowercase(),
        };
        self.by_type_and_ext
            .get(&key)
            .and_then(|entries| entries.first())
            .map(|entry| &entry.loader)
    }

    /// Check if a loader is registered for an extension and type.
    pub fn has_loader_for<T: 'static>(&self, extension: &str) -> bool {
        self.can_load(TypeId::of::<T>(), extension)
    }

    pub fn has_loader_for_type<T: 'static>(&self) -> bool {
        self.extensions_by_type.contains_key(&TypeId::of::<T>())
    }

    pub fn can_load(&self, type_id: TypeId, extension: &str) -> bool {
        self.best(type_id, extension).is_some()
    }

    /// Extensions the type can be decoded from, in registration order.
    pub fn extensions_for(&self, type_id: TypeId) -> &[String] {
        self.extensions_by_type
            .get(&type_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Decode `bytes` into the type identified by `type_id`.
    pub fn load_erased(
        &self,
        type_id: TypeId,
        type_name: &'static str,
        location: &str,
        bytes: &[u8],
    ) -> AssetResult<AssetObject> {
        let extension = extension_of(location).ok_or_else(|| AssetError::NoLoaderForExtension {
            extension: "<none>".to_string(),
        })?;

        let loader = self.best(type_id, &extension).ok_or(AssetError::NoLoader {
            type_id,
            type_name: Some(type_name),
        })?;

        loader.load_erased(LoadContext::new(location, bytes, &extension))
    }

    /// Decode `bytes` as a `T`.
    pub fn load_typed<T: crate::Asset>(&self, location: &str, bytes: &[u8]) -> AssetResult<Arc<T>> {
        self.load_erased(TypeId::of::<T>(), T::type_name(), location, bytes)?
            .downcast::<T>()
            .map_err(|_| AssetError::TypeMismatch {
                expected: T::type_name(),
                actual: TypeId::of::<T>(),
            })
    }
}

/// Lowercase extension of the last path segment, without the dot.
pub(crate) fn extension_of(location: &str) -> Option<String> {
    let name = location.rsplit('/').next().unwrap_or(location);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Loads UTF-8 text as a `String`.
pub struct TextLoader;

impl AssetLoader for TextLoader {
    type Asset = String;

    fn extensions(&self) -> &[&str] {
        &["txt", "text", "md", "json", "toml"]
    }

    fn load(&self, ctx: LoadContext<'_>) -> AssetResult<Self::Asset> {
        String::from_utf8(ctx.bytes.to_vec()).map_err(|e| ctx.error(format!("Invalid UTF-8: {}", e)))
    }
}

/// Loads a file's bytes unchanged.
pub struct BytesLoader;

impl AssetLoader for BytesLoader {
    type Asset = Vec<u8>;

    fn extensions(&self) -> &[&str] {
        &["bin", "bytes", "dat"]
    }

    fn load(&self, ctx: LoadContext<'_>) -> AssetResult<Self::Asset> {
        Ok(ctx.bytes.to_vec())
    }
}
