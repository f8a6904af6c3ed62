// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed mutual exclusion.
//!
//! [`KeyedLocks`] hands out one async mutex per key, created lazily. Holders of
//! different keys never contend; holders of the same key are serialized in
//! acquisition order. A key's entry lives only while someone holds or waits
//! on it, so the table stays as small as the set of keys in use.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A table of lazily created per-key locks.
pub struct KeyedLocks<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Waits for the lock on `key`. The lock is released when the guard drops.
    pub async fn lock(&self, key: K) -> KeyedGuard<'_, K> {
        let mutex = self.entry(key.clone());
        KeyedGuard {
            locks: &self.locks,
            key,
            guard: mutex.lock_owned().await,
        }
    }

    fn entry(&self, key: K) -> Arc<Mutex<()>> {
        // Clone the Arc out so the shard lock is released before awaiting.
        self.locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Guard returned by [`KeyedLocks::lock`].
pub struct KeyedGuard<'a, K: Eq + Hash> {
    locks: &'a DashMap<K, Arc<Mutex<()>>>,
    key: K,
    guard: OwnedMutexGuard<()>,
}

impl<K: Eq + Hash> Drop for KeyedGuard<'_, K> {
    fn drop(&mut self) {
        // Two references: the table's and the one inside this guard. Any
        // waiter holds a third, and the shard lock keeps new ones out.
        let held = OwnedMutexGuard::mutex(&self.guard);
        self.locks.remove_if(&self.key, |_, mutex| {
            Arc::ptr_eq(mutex, held) && Arc::strong_count(mutex) == 2
        });
    }
}
