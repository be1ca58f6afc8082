use std::sync::Arc;

use super::wrapper::{HandleCore, Ticket};
use super::handle_common;
use crate::Asset;
use crate::native::{AssetObject, SceneOperation};

/// A scene load.
///
/// Unload the scene through
/// [`Package::unload_scene_async`](crate::Package::unload_scene_async) before
/// disposing the handle; disposing only releases the load operation.
pub struct SceneHandle {
    core: HandleCore<dyn SceneOperation, AssetObject>,
}

fn extract_scene(op: &dyn SceneOperation) -> Result<AssetObject, String> {
    op.scene().ok_or_else(|| "provider returned no scene".to_string())
}

impl SceneHandle {
    pub(crate) fn issue(ticket: Ticket<'_>, start: impl FnOnce() -> Box<dyn SceneOperation>) -> Self {
        Self {
            core: HandleCore::issue::<Self>(ticket, extract_scene, start),
        }
    }

    handle_common!();

    /// The loaded scene, once the handle succeeded.
    pub fn scene(&self) -> Option<AssetObject> {
        self.core.result(Arc::clone)
    }

    pub fn scene_as<T: Asset>(&self) -> Option<Arc<T>> {
        self.scene()?.downcast::<T>().ok()
    }

    /// Activate a scene loaded with `activate_on_load` off.
    ///
    /// Returns `false` if the scene is not loaded yet, the handle was
    /// disposed, or the provider cannot defer activation.
    pub fn activate(&self) -> bool {
        if !matches!(self.status(), crate::HandleStatus::Succeeded) {
            return false;
        }
        self.core.with_op(|op| op.activate()).unwrap_or(false)
    }
}

impl std::fmt::Debug for SceneHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneHandle")
            .field("package", &self.package())
            .field("id", &self.id())
            .field("location", &self.location())
            .field("status", &self.status())
            .finish()
    }
}
