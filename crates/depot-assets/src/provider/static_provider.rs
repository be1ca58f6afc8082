//! The built-in provider for content shipped with the application.

use std::any::TypeId;
use std::path::PathBuf;
use std::sync::Arc;

use depot_core::alloc::HashMap;
use depot_core::profiling::profile_function;
use parking_lot::Mutex;

use crate::error::{AssetError, AssetResult};
use crate::io::{BytesReader, FileReader};
use crate::loader::{AssetLoader, LoaderRegistry, extension_of};
use crate::native::{
    AllAssetsOperation, AssetObject, AssetOperation, AssetRequest, ContentBackend, InstantiateOperation,
    NativeOperation, ReadyOperation, SceneOperation,
};
use crate::settings::{InstantiateParams, SceneParams, StaticOptions};

/// Creates instances and scenes for the static provider.
///
/// The static provider only decodes files; anything that needs a world to
/// live in is delegated to the host application.
pub trait SceneHost: Send + Sync {
    fn instantiate(&self, prefab: &AssetObject, params: &InstantiateParams) -> AssetResult<AssetObject>;

    fn load_scene(&self, location: &str, params: &SceneParams) -> AssetResult<AssetObject>;

    fn unload_scene(&self, scene: &AssetObject) -> AssetResult<()>;
}

type CacheKey = (String, TypeId);

/// Loads assets synchronously from an ordered list of byte readers.
///
/// Readers are searched in the order they were added. A location without an
/// extension resolves to the first file in its directory whose stem matches
/// and whose extension has a loader for the requested type. Decoded assets
/// are cached until nothing outside the cache references them and
/// `unload_unused` runs.
///
/// Downloading, manifests and cache files are not supported.
pub struct StaticProvider {
    readers: Vec<Box<dyn BytesReader>>,
    roots: Vec<PathBuf>,
    loaders: LoaderRegistry,
    scene_host: Option<Arc<dyn SceneHost>>,
    cache: Mutex<HashMap<CacheKey, AssetObject>>,
}

impl Default for StaticProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticProvider {
    /// A provider with no readers and the default text and bytes loaders.
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
            roots: Vec::new(),
            loaders: LoaderRegistry::with_defaults(),
            scene_host: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Read files below `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.readers.push(Box::new(FileReader::new(&root)));
        self.roots.push(root);
        self
    }

    /// Read files from `reader`, after every reader added before it.
    pub fn with_reader(mut self, reader: impl BytesReader + 'static) -> Self {
        self.readers.push(Box::new(reader));
        self
    }

    pub fn with_loader<L: AssetLoader>(mut self, loader: L) -> Self {
        self.loaders.register(loader);
        self
    }

    pub fn with_scene_host(mut self, host: impl SceneHost + 'static) -> Self {
        self.scene_host = Some(Arc::new(host));
        self
    }

    pub fn loaders(&self) -> &LoaderRegistry {
        &self.loaders
    }

    /// Number of decoded assets currently cached.
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    pub(crate) fn initialize(&self, options: &StaticOptions) -> AssetResult<()> {
        if options.require_root
            && let Some(missing) = self.roots.iter().find(|root| !root.is_dir())
        {
            return Err(AssetError::NotFound {
                path: missing.display().to_string(),
            });
        }
        tracing::debug!(
            "Static provider ready with {} reader(s), {} root(s)",
            self.readers.len(),
            self.roots.len()
        );
        Ok(())
    }

    /// Find the reader and concrete file for `location`.
    fn resolve(&self, location: &str, type_id: TypeId) -> Option<(&dyn BytesReader, String)> {
        if extension_of(location).is_some() {
            return self
                .readers
                .iter()
                .find(|reader| reader.exists(location))
                .map(|reader| (&**reader, location.to_string()));
        }

        let (dir, stem) = location.rsplit_once('/').unwrap_or(("", location));
        self.readers.iter().find_map(|reader| {
            reader
                .list(dir)
                .into_iter()
                .find(|file| {
                    let name = file.rsplit('/').next().unwrap_or(file);
                    name.rsplit_once('.').is_some_and(|(file_stem, ext)| {
                        file_stem == stem && self.loaders.can_load(type_id, ext)
                    })
                })
                .map(|file| (&**reader, file))
        })
    }

    fn decode(
        &self,
        reader: &dyn BytesReader,
        file: &str,
        type_id: TypeId,
        type_name: &'static str,
    ) -> AssetResult<AssetObject> {
        let key = (file.to_string(), type_id);
        if let Some(cached) = self.cache.lock().get(&key) {
            return Ok(Arc::clone(cached));
        }

        let bytes = reader.read_bytes(file)?;
        let object = self.loaders.load_erased(type_id, type_name, file, &bytes)?;
        // Two racing loads of the same file keep whichever finished first.
        let object = Arc::clone(self.cache.lock().entry(key).or_insert(object));
        Ok(object)
    }

    fn load(&self, request: &AssetRequest<'_>) -> AssetResult<AssetObject> {
        profile_function!();
        let (reader, file) = self
            .resolve(request.location, request.type_id)
            .ok_or_else(|| AssetError::NotFound {
                path: request.location.to_string(),
            })?;
        tracing::trace!("Static load '{}' from '{}'", request.location, file);
        self.decode(reader, &file, request.type_id, request.type_name)
    }

    fn load_all(&self, request: &AssetRequest<'_>) -> AssetResult<Arc<[AssetObject]>> {
        profile_function!();
        if let Some((reader, file)) = self.resolve(request.location, request.type_id) {
            let object = self.decode(reader, &file, request.type_id, request.type_name)?;
            return Ok(Arc::from([object]));
        }

        let mut seen = Vec::new();
        let mut objects = Vec::new();
        for reader in &self.readers {
            for file in reader.list(request.location) {
                let loadable = extension_of(&file).is_some_and(|ext| self.loaders.can_load(request.type_id, &ext));
                if !loadable || seen.contains(&file) {
                    continue;
                }
                objects.push(self.decode(&**reader, &file, request.type_id, request.type_name)?);
                seen.push(file);
            }
        }

        if objects.is_empty() {
            return Err(AssetError::NotFound {
                path: request.location.to_string(),
            });
        }
        Ok(objects.into())
    }

    fn no_scene_host<T>(operation: &str) -> ReadyOperation<T> {
        ReadyOperation::failed(format!("{} needs a scene host on the static provider", operation))
    }
}

impl ContentBackend for StaticProvider {
    fn destroy(&self) -> Box<dyn NativeOperation> {
        let dropped = std::mem::take(&mut *self.cache.lock());
        tracing::debug!("Static provider destroyed, dropped {} cached asset(s)", dropped.len());
        Box::new(ReadyOperation::ok(()))
    }

    fn load_asset(&self, request: &AssetRequest<'_>) -> Box<dyn AssetOperation> {
        Box::new(ReadyOperation::from_result(self.load(request)))
    }

    fn load_all_assets(&self, request: &AssetRequest<'_>) -> Box<dyn AllAssetsOperation> {
        Box::new(ReadyOperation::from_result(self.load_all(request)))
    }

    fn instantiate(&self, prefab: &AssetObject, params: &InstantiateParams) -> Box<dyn InstantiateOperation> {
        match &self.scene_host {
            Some(host) => Box::new(ReadyOperation::from_result(host.instantiate(prefab, params))),
            None => Box::new(Self::no_scene_host::<AssetObject>("instantiate")),
        }
    }

    fn load_scene(&self, location: &str, params: &SceneParams) -> Box<dyn SceneOperation> {
        match &self.scene_host {
            Some(host) => Box::new(ReadyOperation::from_result(host.load_scene(location, params))),
            None => Box::new(Self::no_scene_host::<AssetObject>("load_scene")),
        }
    }

    fn unload_scene(&self, scene: &AssetObject) -> Box<dyn NativeOperation> {
        match &self.scene_host {
            Some(host) => Box::new(ReadyOperation::from_result(host.unload_scene(scene))),
            None => Box::new(Self::no_scene_host::<()>("unload_scene")),
        }
    }

    fn unload_unused(&self) -> Box<dyn NativeOperation> {
        let mut cache = self.cache.lock();
        let before = cache.len();
        cache.retain(|_, object| Arc::strong_count(object) > 1);
        tracing::debug!("Unloaded {} unused static asset(s)", before - cache.len());
        Box::new(ReadyOperation::ok(()))
    }
}
