use std::sync::Arc;

use parking_lot::Mutex;

use super::wrapper::{HandleCore, Observed, Ticket, Watch};
use super::handle_common;
use crate::Asset;
use crate::native::{AssetObject, AssetOperation, InstantiateOperation, NativeOperation};

/// An asynchronous instantiation of a loaded prefab.
pub struct InstantiateHandle {
    core: HandleCore<dyn InstantiateOperation, AssetObject>,
}

fn extract_instance(op: &dyn InstantiateOperation) -> Result<AssetObject, String> {
    op.instance()
        .ok_or_else(|| "provider returned no instance".to_string())
}

impl InstantiateHandle {
    pub(crate) fn issue(ticket: Ticket<'_>, start: impl FnOnce() -> Box<dyn InstantiateOperation>) -> Self {
        Self {
            core: HandleCore::issue::<Self>(ticket, extract_instance, start),
        }
    }

    handle_common!();

    /// The created instance, once the handle succeeded.
    pub fn instance(&self) -> Option<AssetObject> {
        self.core.result(Arc::clone)
    }

    /// The created instance as a `T`, if it is one.
    pub fn instance_as<T: Asset>(&self) -> Option<Arc<T>> {
        self.instance()?.downcast::<T>().ok()
    }
}

impl std::fmt::Debug for InstantiateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstantiateHandle")
            .field("package", &self.package())
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}

/// Issues the native instantiation of a prefab.
pub(crate) type StartInstance = Box<dyn FnOnce(&AssetObject) -> Box<dyn InstantiateOperation> + Send>;

enum Stage {
    AwaitingPrefab {
        prefab: Watch<dyn AssetOperation, AssetObject>,
        start: StartInstance,
    },
    Instantiating(Arc<dyn InstantiateOperation>),
    Failed(String),
    Released,
}

/// An instantiation that starts once its prefab has loaded.
///
/// Fails with the prefab's error if the prefab fails, is canceled or its
/// handle is disposed first.
pub(crate) struct AfterPrefab {
    stage: Mutex<Stage>,
}

impl AfterPrefab {
    pub(crate) fn new(prefab: Watch<dyn AssetOperation, AssetObject>, start: StartInstance) -> Self {
        let chained = Self {
            stage: Mutex::new(Stage::AwaitingPrefab { prefab, start }),
        };
        chained.advance();
        chained
    }

    /// Start the instantiation if the prefab is ready.
    fn advance(&self) {
        let mut stage = self.stage.lock();
        let Stage::AwaitingPrefab { prefab, .. } = &*stage else {
            return;
        };
        let next = match prefab.observe() {
            Observed::Pending => return,
            Observed::Failed(error) => Stage::Failed(error),
            Observed::Gone => Stage::Failed("prefab handle was disposed".into()),
            Observed::Ready(object) => {
                let Stage::AwaitingPrefab { start, .. } = std::mem::replace(&mut *stage, Stage::Released) else {
                    return;
                };
                Stage::Instantiating(Arc::from(start(&object)))
            }
        };
        *stage = next;
    }

    fn instantiating(&self) -> Option<Arc<dyn InstantiateOperation>> {
        match &*self.stage.lock() {
            Stage::Instantiating(op) => Some(Arc::clone(op)),
            _ => None,
        }
    }
}

impl NativeOperation for AfterPrefab {
    fn is_done(&self) -> bool {
        self.advance();
        match &*self.stage.lock() {
            Stage::AwaitingPrefab { .. } => false,
            Stage::Instantiating(op) => op.is_done(),
            Stage::Failed(_) | Stage::Released => true,
        }
    }

    fn progress(&self) -> f32 {
        match &*self.stage.lock() {
            Stage::AwaitingPrefab { .. } => 0.0,
            Stage::Instantiating(op) => op.progress(),
            Stage::Failed(_) | Stage::Released => 1.0,
        }
    }

    fn error(&self) -> Option<String> {
        match &*self.stage.lock() {
            Stage::Instantiating(op) => op.error(),
            Stage::Failed(error) => Some(error.clone()),
            Stage::AwaitingPrefab { .. } | Stage::Released => None,
        }
    }

    fn wait_for_completion(&self) {
        let prefab = match &*self.stage.lock() {
            Stage::AwaitingPrefab { prefab, .. } => Some(prefab.clone()),
            _ => None,
        };
        if let Some(prefab) = prefab {
            prefab.wait();
            self.advance();
        }
        if let Some(op) = self.instantiating() {
            op.wait_for_completion();
        }
    }

    fn release(&self) {
        let stage = std::mem::replace(&mut *self.stage.lock(), Stage::Released);
        if let Stage::Instantiating(op) = stage {
            op.release();
        }
    }
}

impl InstantiateOperation for AfterPrefab {
    fn instance(&self) -> Option<AssetObject> {
        self.instantiating()?.instance()
    }
}
