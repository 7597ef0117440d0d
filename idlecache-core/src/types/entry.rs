//! A single cached value and its access metadata.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::traits::EvictHook;

/// Mutable part of an entry, guarded by the entry's own lock.
struct AccessState<K> {
    last_accessed_at: Instant,
    access_count: u64,
    on_evict: Option<Arc<dyn EvictHook<K>>>,
}

/// A cached value plus the metadata used for idle expiry.
///
/// The key, value, idle TTL and creation time never change after
/// construction. Access time, access count and the eviction hook are
/// guarded by a per-entry lock, independent of the owning table's lock.
///
/// An idle TTL of zero means the entry never expires on idleness.
pub struct Entry<K, V> {
    key: K,
    value: V,
    idle_ttl: Duration,
    created_at: Instant,
    state: RwLock<AccessState<K>>,
    /// Set once by whichever removal path gets to the entry first.
    evicting: AtomicBool,
}

impl<K, V> Entry<K, V> {
    /// Creates an entry that was last accessed now and has never been read.
    pub fn new(key: K, value: V, idle_ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            key,
            value,
            idle_ttl,
            created_at: now,
            state: RwLock::new(AccessState {
                last_accessed_at: now,
                access_count: 0,
                on_evict: None,
            }),
            evicting: AtomicBool::new(false),
        }
    }

    /// Returns the entry's key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the cached value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Returns how long the entry may stay unread before it expires.
    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Returns true if the entry can expire on idleness.
    pub fn expires(&self) -> bool {
        !self.idle_ttl.is_zero()
    }

    /// Returns when the entry was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns when the entry was last read (or created, if never read).
    pub fn last_accessed_at(&self) -> Instant {
        self.state.read().last_accessed_at
    }

    /// Returns how many times the entry has been read.
    pub fn access_count(&self) -> u64 {
        self.state.read().access_count
    }

    /// Marks the entry as just accessed and bumps its access count.
    pub fn keep_alive(&self) {
        let mut state = self.state.write();
        // Instant is monotonic, so this never moves backwards.
        state.last_accessed_at = Instant::now();
        state.access_count += 1;
    }

    /// Replaces the callback fired with the key right before removal.
    pub fn set_on_evict(&self, hook: impl EvictHook<K> + 'static) {
        self.state.write().on_evict = Some(Arc::new(hook));
    }

    /// Removes the eviction callback.
    pub fn clear_on_evict(&self) {
        self.state.write().on_evict = None;
    }

    /// Returns how long the entry has been idle as of `now`.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accessed_at())
    }

    /// Returns the idle time left before expiry as of `now`.
    ///
    /// `None` for entries that never expire, `Some(Duration::ZERO)` once the
    /// entry has been idle for at least its TTL.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if !self.expires() {
            return None;
        }
        Some(self.idle_ttl.saturating_sub(self.idle_for(now)))
    }

    /// Claims the entry for removal.
    ///
    /// Returns false if another removal path already claimed it; that path
    /// owns the callbacks and the removal.
    pub fn begin_eviction(&self) -> bool {
        !self.evicting.swap(true, Ordering::AcqRel)
    }

    /// Fires the eviction callback, if any, with the entry lock released.
    pub fn notify_evict(&self) {
        let hook = self.state.read().on_evict.clone();
        if let Some(hook) = hook {
            hook.on_evict(&self.key);
        }
    }

    /// Consumes the entry, returning its key, value and idle TTL.
    pub fn into_parts(self) -> (K, V, Duration) {
        (self.key, self.value, self.idle_ttl)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("idle_ttl", &self.idle_ttl)
            .field("created_at", &self.created_at)
            .field("last_accessed_at", &state.last_accessed_at)
            .field("access_count", &state.access_count)
            .field("has_on_evict", &state.on_evict.is_some())
            .finish()
    }
}
