//! Bounded pools of reusable handle wrappers.
//!
//! Every handle type draws its internal wrapper from a [`HandlePool`] so that
//! issuing a load does not allocate a fresh wrapper each time. Pools are keyed
//! by handle type inside [`HandlePools`], which lives in the module's
//! [`AssetContext`](crate::AssetContext) rather than in a global.

use std::any::{Any, TypeId};
use std::sync::Arc;

use depot_core::alloc::HashMap;
use depot_core::profiling::profile_function;
use parking_lot::Mutex;

/// Default maximum number of idle wrappers kept per handle type.
pub const DEFAULT_POOL_CAPACITY: usize = 128;

/// A value that can be reused after being cleared.
pub trait Poolable: Default + Send + 'static {
    /// Clear every field so no reference to the previous use survives.
    fn reset(&mut self);
}

/// A thread-safe, bounded stack of reusable boxed values.
///
/// `get` pops an idle value or constructs a new one, `release` resets the
/// value and pushes it back unless the pool is full, in which case the value
/// is dropped. The lock is only held for the push or pop itself.
pub struct HandlePool<T: Poolable> {
    idle: Mutex<Vec<Box<T>>>,
    capacity: usize,
}

impl<T: Poolable> HandlePool<T> {
    /// Create an empty pool that keeps at most `capacity` idle values.
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity.min(DEFAULT_POOL_CAPACITY))),
            capacity,
        }
    }

    /// Take an idle value, or construct one if none is available.
    pub fn get(&self) -> Box<T> {
        profile_function!();
        let pooled = self.idle.lock().pop();
        pooled.unwrap_or_default()
    }

    /// Reset `item` and return it to the pool.
    ///
    /// Returns `false` if the pool was full and the value was dropped.
    pub fn release(&self, mut item: Box<T>) -> bool {
        profile_function!();
        item.reset();
        let mut idle = self.idle.lock();
        if idle.len() >= self.capacity {
            tracing::trace!("Handle pool full ({}), dropping wrapper", self.capacity);
            return false;
        }
        idle.push(item);
        true
    }

    /// Number of idle values currently pooled.
    pub fn len(&self) -> usize {
        self.idle.lock().len()
    }

    /// Returns `true` if no idle values are pooled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of idle values this pool keeps.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every idle value.
    pub fn clear(&self) {
        self.idle.lock().clear();
    }
}

impl<T: Poolable> Default for HandlePool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

/// Type-erased view used for introspection without knowing the wrapper type.
trait IdleCount: Send + Sync {
    fn idle(&self) -> usize;
    fn clear(&self);
}

impl<T: Poolable> IdleCount for HandlePool<T> {
    fn idle(&self) -> usize {
        self.len()
    }

    fn clear(&self) {
        HandlePool::clear(self)
    }
}

struct PoolEntry {
    typed: Arc<dyn Any + Send + Sync>,
    erased: Arc<dyn IdleCount>,
}

/// Registry of pools, one per handle type.
pub struct HandlePools {
    pools: Mutex<HashMap<TypeId, PoolEntry>>,
    capacity: Mutex<usize>,
}

impl HandlePools {
    /// Create a registry whose pools hold at most `capacity` idle wrappers.
    pub fn new(capacity: usize) -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
            capacity: Mutex::new(capacity),
        }
    }

    /// Change the capacity used for pools created from now on.
    pub fn set_capacity(&self, capacity: usize) {
        *self.capacity.lock() = capacity;
    }

    /// Get (or create) the pool of wrappers of type `T` for handle type `H`.
    pub fn pool<H: 'static, T: Poolable>(&self) -> Arc<HandlePool<T>> {
        let key = TypeId::of::<H>();
        let mut pools = self.pools.lock();
        if let Some(entry) = pools.get(&key)
            && let Ok(pool) = Arc::clone(&entry.typed).downcast::<HandlePool<T>>()
        {
            return pool;
        }

        let pool = Arc::new(HandlePool::<T>::new(*self.capacity.lock()));
        pools.insert(
            key,
            PoolEntry {
                typed: pool.clone(),
                erased: pool.clone(),
            },
        );
        pool
    }

    /// Number of idle wrappers pooled for handle type `H`.
    pub fn idle<H: 'static>(&self) -> usize {
        let erased = self
            .pools
            .lock()
            .get(&TypeId::of::<H>())
            .map(|entry| Arc::clone(&entry.erased));
        erased.map(|pool| pool.idle()).unwrap_or(0)
    }

    /// Drop every idle wrapper of every pool.
    pub fn clear(&self) {
        let pools: Vec<_> = self
            .pools
            .lock()
            .values()
            .map(|entry| Arc::clone(&entry.erased))
            .collect();
        for pool in pools {
            pool.clear();
        }
    }
}

impl Default for HandlePools {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Wrapper {
        location: String,
        payload: Option<Arc<u32>>,
    }

    impl Poolable for Wrapper {
        fn reset(&mut self) {
            self.location.clear();
            self.payload = None;
        }
    }

    #[test]
    fn get_constructs_when_empty() {
        let pool = HandlePool::<Wrapper>::new(4);
        let item = pool.get();
        assert!(item.location.is_empty());
        assert!(pool.is_empty());
    }

    #[test]
    fn release_clears_and_reuses() {
        let pool = HandlePool::<Wrapper>::new(4);
        let payload = Arc::new(7);

        let mut item = pool.get();
        item.location.push_str("ui/icon");
        item.payload = Some(payload.clone());
        assert!(pool.release(item));
        assert_eq!(pool.len(), 1);
        // The pooled wrapper no longer retains the payload
        assert_eq!(Arc::strong_count(&payload), 1);

        let reused = pool.get();
        assert!(reused.location.is_empty());
        assert!(reused.payload.is_none());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn pool_never_exceeds_capacity() {
        let pool = HandlePool::<Wrapper>::new(3);
        let items: Vec<_> = (0..10).map(|_| pool.get()).collect();
        let mut kept = 0;
        for item in items {
            if pool.release(item) {
                kept += 1;
            }
            assert!(pool.len() <= 3);
        }
        assert_eq!(kept, 3);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn interleaved_get_release_stays_bounded() {
        let pool = HandlePool::<Wrapper>::new(2);
        let mut held = Vec::new();
        for step in 0..50 {
            if step % 3 == 0 {
                held.push(pool.get());
            } else if let Some(item) = held.pop() {
                pool.release(item);
            } else {
                pool.release(Box::default());
            }
            assert!(pool.len() <= pool.capacity());
        }
    }

    #[test]
    fn concurrent_release_is_bounded() {
        let pool = Arc::new(HandlePool::<Wrapper>::new(8));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let item = pool.get();
                        pool.release(item);
                        pool.release(Box::default());
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert!(pool.len() <= 8);
    }

    #[test]
    fn registry_keys_pools_by_handle_type() {
        struct HandleA;
        struct HandleB;

        let pools = HandlePools::new(16);
        let a = pools.pool::<HandleA, Wrapper>();
        a.release(Box::default());

        assert_eq!(pools.idle::<HandleA>(), 1);
        assert_eq!(pools.idle::<HandleB>(), 0);
        assert!(Arc::ptr_eq(&a, &pools.pool::<HandleA, Wrapper>()));

        pools.clear();
        assert_eq!(pools.idle::<HandleA>(), 0);
    }
}
