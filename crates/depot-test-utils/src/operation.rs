//! Scripted native operations.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use depot_assets::AssetObject;
use depot_assets::native::{
    AllAssetsOperation, AssetOperation, InstantiateOperation, NativeOperation, RawFileOperation,
    SceneOperation, VersionOperation,
};
use parking_lot::Mutex;

/// What a mock operation produces once done.
#[derive(Clone)]
pub enum MockValue {
    Unit,
    Object(AssetObject),
    Objects(Arc<[AssetObject]>),
    File { data: Arc<[u8]>, path: PathBuf },
    Version(String),
}

impl std::fmt::Debug for MockValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockValue::Unit => write!(f, "Unit"),
            MockValue::Object(_) => write!(f, "Object"),
            MockValue::Objects(objects) => write!(f, "Objects({})", objects.len()),
            MockValue::File { data, path } => write!(f, "File({}, {} bytes)", path.display(), data.len()),
            MockValue::Version(version) => write!(f, "Version({})", version),
        }
    }
}

/// Shared state of one mock operation, observed by tests through [`OpProbe`].
struct OpState {
    label: String,
    done: AtomicBool,
    outcome: Mutex<Result<MockValue, String>>,
    progress: Mutex<f32>,
    releases: AtomicUsize,
    waits: AtomicUsize,
    /// Whether `wait_for_completion` finishes the operation.
    completes_on_wait: bool,
}

/// A native operation whose completion is controlled by the test.
pub struct MockOperation {
    state: Arc<OpState>,
}

impl MockOperation {
    /// Create a pending operation and the probe that controls it.
    pub fn pending(label: impl Into<String>, outcome: Result<MockValue, String>) -> (Self, OpProbe) {
        Self::build(label.into(), outcome, false, true)
    }

    /// Create an operation that is already finished.
    pub fn ready(label: impl Into<String>, outcome: Result<MockValue, String>) -> (Self, OpProbe) {
        Self::build(label.into(), outcome, true, true)
    }

    /// Create a pending operation that `wait_for_completion` cannot finish.
    pub fn unforceable(label: impl Into<String>, outcome: Result<MockValue, String>) -> (Self, OpProbe) {
        Self::build(label.into(), outcome, false, false)
    }

    fn build(label: String, outcome: Result<MockValue, String>, done: bool, completes_on_wait: bool) -> (Self, OpProbe) {
        let state = Arc::new(OpState {
            label,
            done: AtomicBool::new(done),
            outcome: Mutex::new(outcome),
            progress: Mutex::new(if done { 1.0 } else { 0.0 }),
            releases: AtomicUsize::new(0),
            waits: AtomicUsize::new(0),
            completes_on_wait,
        });
        (
            Self {
                state: Arc::clone(&state),
            },
            OpProbe { state },
        )
    }

    fn value(&self) -> Option<MockValue> {
        if !self.state.done.load(Ordering::Acquire) {
            return None;
        }
        self.state.outcome.lock().as_ref().ok().cloned()
    }
}

impl NativeOperation for MockOperation {
    fn is_done(&self) -> bool {
        self.state.done.load(Ordering::Acquire)
    }

    fn progress(&self) -> f32 {
        if self.is_done() {
            1.0
        } else {
            *self.state.progress.lock()
        }
    }

    fn error(&self) -> Option<String> {
        if !self.is_done() {
            return None;
        }
        self.state.outcome.lock().as_ref().err().cloned()
    }

    fn wait_for_completion(&self) {
        self.state.waits.fetch_add(1, Ordering::SeqCst);
        if self.state.completes_on_wait {
            self.state.done.store(true, Ordering::Release);
        }
    }

    fn release(&self) {
        self.state.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl AssetOperation for MockOperation {
    fn asset(&self) -> Option<AssetObject> {
        match self.value()? {
            MockValue::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl AllAssetsOperation for MockOperation {
    fn assets(&self) -> Option<Arc<[AssetObject]>> {
        match self.value()? {
            MockValue::Objects(objects) => Some(objects),
            _ => None,
        }
    }
}

impl InstantiateOperation for MockOperation {
    fn instance(&self) -> Option<AssetObject> {
        match self.value()? {
            MockValue::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl SceneOperation for MockOperation {
    fn scene(&self) -> Option<AssetObject> {
        match self.value()? {
            MockValue::Object(object) => Some(object),
            _ => None,
        }
    }

    fn activate(&self) -> bool {
        let Some(MockValue::Object(object)) = self.value() else {
            return false;
        };
        match object.downcast_ref::<MockScene>() {
            Some(scene) => {
                scene.active.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

impl RawFileOperation for MockOperation {
    fn data(&self) -> Option<Arc<[u8]>> {
        match self.value()? {
            MockValue::File { data, .. } => Some(data),
            _ => None,
        }
    }

    fn file_path(&self) -> Option<PathBuf> {
        match self.value()? {
            MockValue::File { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl VersionOperation for MockOperation {
    fn version(&self) -> Option<String> {
        match self.value()? {
            MockValue::Version(version) => Some(version),
            _ => None,
        }
    }
}

/// Test-side control over a [`MockOperation`].
#[derive(Clone)]
pub struct OpProbe {
    state: Arc<OpState>,
}

impl OpProbe {
    /// Description of the call that issued the operation.
    pub fn label(&self) -> &str {
        &self.state.label
    }

    /// Finish the operation with its scripted outcome.
    pub fn complete(&self) {
        self.state.done.store(true, Ordering::Release);
    }

    /// Finish the operation with an error.
    pub fn fail(&self, message: impl Into<String>) {
        *self.state.outcome.lock() = Err(message.into());
        self.state.done.store(true, Ordering::Release);
    }

    pub fn set_progress(&self, progress: f32) {
        *self.state.progress.lock() = progress;
    }

    pub fn is_done(&self) -> bool {
        self.state.done.load(Ordering::Acquire)
    }

    /// How many times the operation was released.
    pub fn release_count(&self) -> usize {
        self.state.releases.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.release_count() > 0
    }

    pub fn wait_count(&self) -> usize {
        self.state.waits.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for OpProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpProbe")
            .field("label", &self.state.label)
            .field("done", &self.is_done())
            .field("releases", &self.release_count())
            .finish()
    }
}

/// A scene produced by the mock backends.
#[derive(Debug)]
pub struct MockScene {
    pub location: String,
    active: AtomicBool,
}

impl MockScene {
    pub fn new(location: impl Into<String>, active: bool) -> Self {
        Self {
            location: location.into(),
            active: AtomicBool::new(active),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl depot_assets::Asset for MockScene {
    fn type_name() -> &'static str {
        "MockScene"
    }
}

/// An instance produced by the mock backends.
pub struct MockInstance {
    /// The prefab object the instance was created from.
    pub prefab: AssetObject,
    pub has_parent: bool,
    pub active: bool,
}

impl MockInstance {
    /// The prefab, if it is a `T`.
    pub fn prefab_as<T: Any>(&self) -> Option<&T> {
        self.prefab.downcast_ref::<T>()
    }
}

impl depot_assets::Asset for MockInstance {
    fn type_name() -> &'static str {
        "MockInstance"
    }
}

impl std::fmt::Debug for MockInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockInstance")
            .field("has_parent", &self.has_parent)
            .field("active", &self.active)
            .finish()
    }
}
