//! Shared state owned by an [`AssetModule`](crate::AssetModule).

use std::sync::Arc;

use crate::pool::{DEFAULT_POOL_CAPACITY, HandlePools};
use crate::scheduler::TickScheduler;
use crate::tracker::HandleTracker;

/// Pools, tracker and scheduler shared by a module and its packages.
///
/// Each module owns its own context, so independent modules (and tests) never
/// see each other's pools or tracked handles.
pub struct AssetContext {
    pools: HandlePools,
    tracker: HandleTracker,
    scheduler: TickScheduler,
}

impl AssetContext {
    /// Create a context with the given pool capacity and tracking flag.
    pub fn new(pool_capacity: usize, track_handles: bool) -> Arc<Self> {
        Arc::new(Self {
            pools: HandlePools::new(pool_capacity),
            tracker: HandleTracker::new(track_handles),
            scheduler: TickScheduler::new(),
        })
    }

    pub fn pools(&self) -> &HandlePools {
        &self.pools
    }

    pub fn tracker(&self) -> &HandleTracker {
        &self.tracker
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    /// Number of pooled wrappers for handle type `H`, e.g.
    /// `idle_wrappers::<AssetHandle<Texture>>()`.
    pub fn idle_wrappers<H: 'static>(&self) -> usize {
        self.pools.idle::<H>()
    }
}

impl Default for AssetContext {
    fn default() -> Self {
        Self {
            pools: HandlePools::new(DEFAULT_POOL_CAPACITY),
            tracker: HandleTracker::default(),
            scheduler: TickScheduler::new(),
        }
    }
}
