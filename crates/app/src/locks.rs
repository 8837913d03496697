//! Keyed async locks
//!
//! Read-modify-write sequences on prices must not interleave for the same product, and lifecycle
//! transitions must not race for the same record. [`KeyedLocks`] hands out one async mutex per key.
//! Multi-key acquisition always happens in ascending key order so two callers locking overlapping
//! sets cannot deadlock.

use std::{
    hash::Hash,
    sync::{Arc, Mutex, PoisonError},
};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

type Guards = SmallVec<[OwnedMutexGuard<()>; 8]>;

/// A table of async mutexes addressed by key.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<FxHashMap<K, Slot>>,
}

/// Guards held for a set of keys; dropping it releases every key.
#[derive(Debug)]
#[must_use = "locks are released as soon as the guard is dropped"]
pub struct KeyGuards {
    guards: Guards,
}

impl KeyGuards {
    /// Number of distinct keys held.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns `true` when no keys are held.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<K: Copy + Eq + Hash + Ord> KeyedLocks<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to a single key.
    pub async fn lock(&self, key: K) -> KeyGuards {
        self.lock_all([key]).await
    }

    /// Waits for exclusive access to every key, acquiring them in ascending order.
    pub async fn lock_all<I>(&self, keys: I) -> KeyGuards
    where
        I: IntoIterator<Item = K>,
    {
        let mut keys: SmallVec<[K; 8]> = keys.into_iter().collect();

        keys.sort_unstable();
        keys.dedup();

        let mut guards = Guards::with_capacity(keys.len());

        for key in keys {
            guards.push(self.slot(key).lock_owned().await);
        }

        KeyGuards { guards }
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn slot(&self, key: K) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        // A slot only referenced by the table has no holder and no waiter.
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);

        Arc::clone(slots.entry(key).or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::{sync::Mutex as AsyncMutex, time::sleep};

    use super::*;

    #[tokio::test]
    async fn lock_all_deduplicates_keys() {
        let locks = KeyedLocks::new();

        let guards = locks.lock_all([3, 1, 3, 2, 1]).await;

        assert_eq!(guards.len(), 3);
    }

    #[tokio::test]
    async fn same_key_is_serialised() {
        let locks = Arc::new(KeyedLocks::new());
        let log = Arc::new(AsyncMutex::new(Vec::new()));

        let first = {
            let locks = Arc::clone(&locks);
            let log = Arc::clone(&log);

            tokio::spawn(async move {
                let _guards = locks.lock(7).await;
                log.lock().await.push("first:start");
                sleep(Duration::from_millis(30)).await;
                log.lock().await.push("first:end");
            })
        };

        sleep(Duration::from_millis(5)).await;

        let second = {
            let locks = Arc::clone(&locks);
            let log = Arc::clone(&log);

            tokio::spawn(async move {
                let _guards = locks.lock_all([9, 7]).await;
                log.lock().await.push("second");
            })
        };

        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok() && second.is_ok(), "lock tasks should not panic");
        assert_eq!(
            *log.lock().await,
            vec!["first:start", "first:end", "second"]
        );
    }

    #[tokio::test]
    async fn released_slots_are_pruned() {
        let locks = KeyedLocks::new();

        drop(locks.lock_all([1, 2, 3]).await);

        let _held = locks.lock(4).await;

        assert_eq!(locks.tracked(), 1);
    }
}
