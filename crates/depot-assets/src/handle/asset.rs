use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use super::wrapper::{HandleCore, Ticket, Watch};
use super::handle_common;
use crate::Asset;
use crate::native::{AllAssetsOperation, AssetObject, AssetOperation};

/// A typed load of a single asset.
///
/// # Example
///
/// ```ignore
/// let handle = package.load_asset_async::<Texture>("textures/player.png")?;
/// handle.completion().await?;
/// let texture = handle.asset().unwrap();
/// handle.dispose();
/// ```
pub struct AssetHandle<T: Asset> {
    core: HandleCore<dyn AssetOperation, AssetObject>,
    _marker: PhantomData<fn() -> T>,
}

fn extract_asset<T: Asset>(op: &dyn AssetOperation) -> Result<AssetObject, String> {
    let object = op
        .asset()
        .ok_or_else(|| "provider returned no asset".to_string())?;
    if object.is::<T>() {
        Ok(object)
    } else {
        Err(format!("loaded object is not a {}", T::type_name()))
    }
}

impl<T: Asset> AssetHandle<T> {
    pub(crate) fn issue(ticket: Ticket<'_>, start: impl FnOnce() -> Box<dyn AssetOperation>) -> Self {
        Self {
            core: HandleCore::issue::<Self>(ticket, extract_asset::<T>, start),
            _marker: PhantomData,
        }
    }

    handle_common!();

    /// The loaded asset, once the handle succeeded.
    pub fn asset(&self) -> Option<Arc<T>> {
        self.core
            .result(Arc::clone)
            .and_then(|object| object.downcast::<T>().ok())
    }

    /// The loaded asset without its type, for passing on to the provider.
    pub fn asset_object(&self) -> Option<AssetObject> {
        self.core.result(Arc::clone)
    }

    /// Get the type name of the asset.
    pub fn type_name(&self) -> &'static str {
        T::type_name()
    }

    pub(crate) fn watch(&self) -> Watch<dyn AssetOperation, AssetObject> {
        self.core.watch()
    }
}

impl<T: Asset> std::fmt::Debug for AssetHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetHandle")
            .field("type", &T::type_name())
            .field("package", &self.package())
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}

/// Every object of type `T` loaded from one location.
pub struct AllAssetsHandle<T: Asset> {
    core: HandleCore<dyn AllAssetsOperation, Arc<LoadedObjects>>,
    _marker: PhantomData<fn() -> T>,
}

/// The provider's collection, kept as returned.
pub(crate) struct LoadedObjects {
    objects: Arc<[AssetObject]>,
    /// Indices of the objects of the handle's type, computed on first
    /// indexed access.
    matches: OnceLock<Box<[usize]>>,
}

fn extract_all(op: &dyn AllAssetsOperation) -> Result<Arc<LoadedObjects>, String> {
    let objects = op
        .assets()
        .ok_or_else(|| "provider returned no assets".to_string())?;
    Ok(Arc::new(LoadedObjects {
        objects,
        matches: OnceLock::new(),
    }))
}

impl<T: Asset> AllAssetsHandle<T> {
    pub(crate) fn issue(ticket: Ticket<'_>, start: impl FnOnce() -> Box<dyn AllAssetsOperation>) -> Self {
        Self {
            core: HandleCore::issue::<Self>(ticket, extract_all, start),
            _marker: PhantomData,
        }
    }

    handle_common!();

    /// The loaded objects of type `T`, in provider order.
    pub fn assets(&self) -> Option<AssetList<T>> {
        self.core.result(|loaded| AssetList {
            loaded: Arc::clone(loaded),
            _marker: PhantomData,
        })
    }
}

impl<T: Asset> std::fmt::Debug for AllAssetsHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllAssetsHandle")
            .field("type", &T::type_name())
            .field("package", &self.package())
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}

/// Read-only typed view over the provider's collection.
///
/// Objects are cast to `T` as they are read; objects of other types are
/// skipped. Cheap to clone; it shares the provider's collection.
pub struct AssetList<T: Asset> {
    loaded: Arc<LoadedObjects>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Asset> AssetList<T> {
    pub fn len(&self) -> usize {
        self.matches().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.object(index)?.downcast_ref::<T>()
    }

    /// Shared ownership of the object at `index`.
    pub fn get_arc(&self, index: usize) -> Option<Arc<T>> {
        Arc::clone(self.object(index)?).downcast::<T>().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.loaded.objects.iter().filter_map(|o| o.downcast_ref::<T>())
    }

    /// Every loaded object, of any type, as the provider returned them.
    pub fn objects(&self) -> &Arc<[AssetObject]> {
        &self.loaded.objects
    }

    fn object(&self, index: usize) -> Option<&AssetObject> {
        let position = *self.matches().get(index)?;
        self.loaded.objects.get(position)
    }

    fn matches(&self) -> &[usize] {
        self.loaded.matches.get_or_init(|| {
            self.loaded
                .objects
                .iter()
                .enumerate()
                .filter(|(_, object)| object.is::<T>())
                .map(|(index, _)| index)
                .collect()
        })
    }
}

impl<T: Asset> Clone for AssetList<T> {
    fn clone(&self) -> Self {
        Self {
            loaded: Arc::clone(&self.loaded),
            _marker: PhantomData,
        }
    }
}
