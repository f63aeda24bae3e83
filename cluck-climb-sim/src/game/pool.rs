//! Object Pooling
//!
//! Free lists of reusable instance handles, keyed by prefab. Pools are
//! prewarmed at match creation. When every instance of a prefab is busy the
//! pool grows by one instead of failing. Asking for a prefab that has no pool
//! logs a warning and does nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

/// How an instance was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire<I> {
    /// Came off the free list
    Reused(I),
    /// Pool was exhausted; a new instance was allocated
    Allocated(I),
}

impl<I: Copy> Acquire<I> {
    /// The instance handle.
    pub fn id(&self) -> I {
        match self {
            Acquire::Reused(id) | Acquire::Allocated(id) => *id,
        }
    }
}

/// Pool of handles for one prefab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool<I: Ord> {
    free: Vec<I>,
    busy: BTreeSet<I>,
}

impl<I: Ord> Default for Pool<I> {
    fn default() -> Self {
        Self {
            free: Vec::new(),
            busy: BTreeSet::new(),
        }
    }
}

impl<I: Copy + Ord + Debug> Pool<I> {
    /// Pool holding `instances`, all free.
    pub fn with_instances(instances: impl IntoIterator<Item = I>) -> Self {
        let mut free: Vec<I> = instances.into_iter().collect();
        // Pop from the back hands out the lowest handle first
        free.sort_unstable_by(|a, b| b.cmp(a));
        Self {
            free,
            busy: BTreeSet::new(),
        }
    }

    /// Take an instance, allocating with `alloc` when none is free.
    pub fn acquire(&mut self, alloc: impl FnOnce() -> I) -> Acquire<I> {
        match self.free.pop() {
            Some(id) => {
                self.busy.insert(id);
                Acquire::Reused(id)
            }
            None => {
                let id = alloc();
                debug!("All instances are busy, spawned {:?}", id);
                self.busy.insert(id);
                Acquire::Allocated(id)
            }
        }
    }

    /// Give an instance back. Returns false if it was not busy.
    pub fn release(&mut self, id: I) -> bool {
        if self.busy.remove(&id) {
            self.free.push(id);
            true
        } else {
            false
        }
    }

    /// Release every busy instance, returning them.
    pub fn reset(&mut self) -> Vec<I> {
        let released: Vec<I> = std::mem::take(&mut self.busy).into_iter().collect();
        self.free.extend(released.iter().rev().copied());
        released
    }

    /// Instances in use.
    pub fn busy(&self) -> impl Iterator<Item = &I> {
        self.busy.iter()
    }

    /// Number of free instances.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Total instances owned.
    pub fn capacity(&self) -> usize {
        self.free.len() + self.busy.len()
    }
}

/// Pools keyed by prefab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRegistry<K: Ord, I: Ord> {
    pools: BTreeMap<K, Pool<I>>,
}

impl<K: Ord, I: Ord> Default for PoolRegistry<K, I> {
    fn default() -> Self {
        Self {
            pools: BTreeMap::new(),
        }
    }
}

impl<K: Copy + Ord + Debug, I: Copy + Ord + Debug> PoolRegistry<K, I> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the pool for a prefab.
    pub fn register(&mut self, key: K, pool: Pool<I>) {
        self.pools.insert(key, pool);
    }

    /// Take an instance of `key`. `None` (with a warning) if there is no such pool.
    pub fn acquire(&mut self, key: K, alloc: impl FnOnce() -> I) -> Option<Acquire<I>> {
        match self.pools.get_mut(&key) {
            Some(pool) => Some(pool.acquire(alloc)),
            None => {
                warn!("No pool registered for {:?}", key);
                None
            }
        }
    }

    /// Give an instance back. A missing pool or unknown instance is a warned no-op.
    pub fn release(&mut self, key: K, id: I) -> bool {
        match self.pools.get_mut(&key) {
            Some(pool) => {
                let released = pool.release(id);
                if !released {
                    warn!("{:?} was not checked out of pool {:?}", id, key);
                }
                released
            }
            None => {
                warn!("No pool registered for {:?}", key);
                false
            }
        }
    }

    /// Release every busy instance in every pool.
    pub fn reset(&mut self) -> Vec<(K, I)> {
        let mut released = Vec::new();
        for (key, pool) in self.pools.iter_mut() {
            released.extend(pool.reset().into_iter().map(|id| (*key, id)));
        }
        released
    }

    /// Pool for a prefab.
    pub fn get(&self, key: K) -> Option<&Pool<I>> {
        self.pools.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuse_then_allocate() {
        let mut pool = Pool::with_instances([1u32, 2]);
        let mut next = 10u32;

        assert_eq!(pool.acquire(|| unreachable!()), Acquire::Reused(1));
        assert_eq!(pool.acquire(|| unreachable!()), Acquire::Reused(2));
        let third = pool.acquire(|| {
            next += 1;
            next
        });
        assert_eq!(third, Acquire::Allocated(11));
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn test_release_makes_reusable() {
        let mut pool = Pool::with_instances([7u32]);
        let id = pool.acquire(|| unreachable!()).id();
        assert!(pool.release(id));
        assert!(!pool.release(id));
        assert_eq!(pool.acquire(|| unreachable!()), Acquire::Reused(7));
    }

    #[test]
    fn test_reset_releases_everything() {
        let mut pool = Pool::with_instances([1u32, 2, 3]);
        pool.acquire(|| unreachable!());
        pool.acquire(|| unreachable!());
        let released = pool.reset();
        assert_eq!(released, vec![1, 2]);
        assert_eq!(pool.free_count(), 3);
        assert_eq!(pool.busy().count(), 0);
    }

    #[test]
    fn test_missing_pool_is_noop() {
        let mut registry: PoolRegistry<u16, u32> = PoolRegistry::new();
        registry.register(0, Pool::with_instances([1]));

        assert!(registry.acquire(5, || unreachable!()).is_none());
        assert!(!registry.release(5, 1));
        assert_eq!(registry.acquire(0, || unreachable!()), Some(Acquire::Reused(1)));
        assert_eq!(registry.reset(), vec![(0, 1)]);
    }
}
