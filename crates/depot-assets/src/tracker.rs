//! Leak diagnostics for live handles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use depot_core::alloc::HashMap;
use parking_lot::Mutex;

/// Identifies a handle across packages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackedKey {
    /// Package that issued the handle.
    pub package: Arc<str>,
    /// Package-local handle id.
    pub id: u64,
}

/// A handle that is registered with the tracker.
#[derive(Debug, Clone)]
pub struct TrackedHandle {
    /// Package that issued the handle.
    pub package: Arc<str>,
    /// Package-local handle id.
    pub id: u64,
    /// Human-readable description ("AssetHandle<Texture> ui/icon.png").
    pub description: String,
}

/// Registry of live handles, used to find handles that were never disposed.
///
/// Disabled trackers skip all bookkeeping, including building descriptions.
/// The tracker never influences load semantics.
pub struct HandleTracker {
    enabled: AtomicBool,
    live: Mutex<HashMap<TrackedKey, String>>,
}

impl HandleTracker {
    /// Create a tracker, enabled or not.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Whether registrations are currently recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Turn recording on or off. Disabling drops every recorded entry.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.live.lock().clear();
        }
    }

    /// Record a live handle. `describe` only runs while enabled.
    pub fn register(&self, package: &Arc<str>, id: u64, describe: impl FnOnce() -> String) {
        if !self.is_enabled() {
            return;
        }
        let description = describe();
        let key = TrackedKey {
            package: Arc::clone(package),
            id,
        };
        self.live.lock().insert(key, description);
    }

    /// Forget a handle. Returns `true` if it was registered.
    pub fn unregister(&self, package: &Arc<str>, id: u64) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let key = TrackedKey {
            package: Arc::clone(package),
            id,
        };
        self.live.lock().remove(&key).is_some()
    }

    /// Returns `true` if the handle is currently registered.
    pub fn is_registered(&self, package: &str, id: u64) -> bool {
        self.live
            .lock()
            .keys()
            .any(|key| key.id == id && &*key.package == package)
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.live.lock().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every registered handle, ordered by package then id.
    pub fn live(&self) -> Vec<TrackedHandle> {
        let mut handles: Vec<_> = self
            .live
            .lock()
            .iter()
            .map(|(key, description)| TrackedHandle {
                package: Arc::clone(&key.package),
                id: key.id,
                description: description.clone(),
            })
            .collect();
        handles.sort_by(|a, b| a.package.cmp(&b.package).then(a.id.cmp(&b.id)));
        handles
    }

    /// Log every registered handle as a leak and return how many there were.
    pub fn report_leaks(&self) -> usize {
        let leaks = self.live();
        for leak in &leaks {
            tracing::warn!(
                "Handle {} of package '{}' was never disposed: {}",
                leak.id,
                leak.package,
                leak.description
            );
        }
        leaks.len()
    }
}

impl Default for HandleTracker {
    fn default() -> Self {
        Self::new(cfg!(debug_assertions))
    }
}
