// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived read cache for the rotation store.
//!
//! Every invalidation installs a new slot, and a reader only fills the slot it
//! observed before loading. A load that raced with a write therefore never
//! lands in the cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use coffer_core::JwtKeyStore;

#[derive(Debug)]
struct CacheSlot {
    store: Option<Arc<JwtKeyStore>>,
    loaded_at: Instant,
}

impl CacheSlot {
    fn empty() -> Arc<Self> {
        Arc::new(Self {
            store: None,
            loaded_at: Instant::now(),
        })
    }
}

/// Process-scoped cache of the last loaded [`JwtKeyStore`].
#[derive(Debug)]
pub struct KeyStoreCache {
    slot: ArcSwap<CacheSlot>,
    ttl: Duration,
}

/// Opaque marker of the cache state a reader observed.
#[derive(Debug)]
pub struct Observed(Arc<CacheSlot>);

impl KeyStoreCache {
    /// Create a cache whose entries live for `ttl`. A zero TTL disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: ArcSwap::new(CacheSlot::empty()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached store if fresh, or a marker to pass to [`fill`](Self::fill).
    pub fn get(&self) -> Result<Arc<JwtKeyStore>, Observed> {
        let current = self.slot.load_full();
        match &current.store {
            Some(store) if current.loaded_at.elapsed() < self.ttl => Ok(Arc::clone(store)),
            _ => Err(Observed(current)),
        }
    }

    /// Cache `store` unless the cache was invalidated since `observed` was taken.
    pub fn fill(&self, observed: Observed, store: Arc<JwtKeyStore>) {
        if self.ttl.is_zero() {
            return;
        }
        let next = Arc::new(CacheSlot {
            store: Some(store),
            loaded_at: Instant::now(),
        });
        let _ = self.slot.compare_and_swap(&observed.0, next);
    }

    /// Drop the cached store.
    pub fn invalidate(&self) {
        self.slot.store(CacheSlot::empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(id: &str) -> Arc<JwtKeyStore> {
        Arc::new(JwtKeyStore {
            current_key_id: id.to_string(),
            ..JwtKeyStore::default()
        })
    }

    #[test]
    fn fill_then_hit() {
        let cache = KeyStoreCache::new(Duration::from_secs(300));
        let observed = cache.get().unwrap_err();
        cache.fill(observed, store("v1"));
        assert_eq!(cache.get().unwrap().current_key_id, "v1");
    }

    #[test]
    fn invalidate_forces_a_miss() {
        let cache = KeyStoreCache::new(Duration::from_secs(300));
        let observed = cache.get().unwrap_err();
        cache.fill(observed, store("v1"));
        cache.invalidate();
        assert!(cache.get().is_err());
    }

    #[test]
    fn fill_after_invalidation_is_discarded() {
        let cache = KeyStoreCache::new(Duration::from_secs(300));
        let observed = cache.get().unwrap_err();
        // A writer invalidates while the reader is loading.
        cache.invalidate();
        cache.fill(observed, store("stale"));
        assert!(cache.get().is_err());
    }

    #[test]
    fn zero_ttl_never_caches() {
        let cache = KeyStoreCache::new(Duration::ZERO);
        let observed = cache.get().unwrap_err();
        cache.fill(observed, store("v1"));
        assert!(cache.get().is_err());
    }
}
