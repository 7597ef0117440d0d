//! Hook traits invoked by a cache table.
//!
//! Each hook is a single-method capability stored behind an `Arc` and replaced
//! wholesale when reconfigured. Tables always call hooks with their own lock
//! released, so a hook may call back into the table that invoked it.
//!
//! Closures with matching signatures implement the hooks directly.

use std::any::Any;
use std::fmt;

use crate::types::Entry;

// ═══════════════════════════════════════════════════════════════════════════════
// LOAD-MISS HOOK
// ═══════════════════════════════════════════════════════════════════════════════

/// Produces an entry for a key that is not in the table.
///
/// `args` are the extra arguments the caller passed to `Table::get_with`.
/// The table stores the returned entry's value under the requested key with
/// the returned idle TTL and hands back the stored entry, not this one. An
/// eviction callback set on the returned entry is dropped; set it on the
/// entry the lookup returns instead.
///
/// Returning `None` makes the lookup fail with
/// [`CacheError::KeyNotFoundOrNotLoadable`](crate::CacheError::KeyNotFoundOrNotLoadable).
pub trait Loader<K, V>: Send + Sync {
    /// Loads the value for `key`, or returns `None` if it cannot be produced.
    fn load(&self, key: &K, args: &[&dyn Any]) -> Option<Entry<K, V>>;
}

impl<K, V, F> Loader<K, V> for F
where
    F: Fn(&K, &[&dyn Any]) -> Option<Entry<K, V>> + Send + Sync,
{
    fn load(&self, key: &K, args: &[&dyn Any]) -> Option<Entry<K, V>> {
        self(key, args)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TABLE HOOKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Called after an entry has been inserted into a table.
pub trait AddHook<K, V>: Send + Sync {
    /// Observes the newly inserted entry.
    fn on_add(&self, entry: &Entry<K, V>);
}

impl<K, V, F> AddHook<K, V> for F
where
    F: Fn(&Entry<K, V>) + Send + Sync,
{
    fn on_add(&self, entry: &Entry<K, V>) {
        self(entry)
    }
}

/// Called right before an entry is removed from a table, by explicit delete
/// or by idle expiry.
pub trait DeleteHook<K, V>: Send + Sync {
    /// Observes the entry that is about to be removed.
    fn on_delete(&self, entry: &Entry<K, V>);
}

impl<K, V, F> DeleteHook<K, V> for F
where
    F: Fn(&Entry<K, V>) + Send + Sync,
{
    fn on_delete(&self, entry: &Entry<K, V>) {
        self(entry)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY HOOK
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-entry callback fired with the key immediately before the entry is
/// removed.
pub trait EvictHook<K>: Send + Sync {
    /// Observes the key of the entry being removed.
    fn on_evict(&self, key: &K);
}

impl<K, F> EvictHook<K> for F
where
    F: Fn(&K) + Send + Sync,
{
    fn on_evict(&self, key: &K) {
        self(key)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOGGING SINK
// ═══════════════════════════════════════════════════════════════════════════════

/// Receives free-form diagnostic lines from a table.
///
/// Tables emit lines for sweep scheduling, insertion, deletion and flush.
/// Nothing is formatted while no logger is configured.
pub trait TableLogger: Send + Sync {
    /// Records one diagnostic line for the named table.
    fn log(&self, table: &str, message: fmt::Arguments<'_>);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_closure_loader() {
        let loader = |key: &String, args: &[&dyn Any]| {
            let suffix = args
                .first()
                .and_then(|a| a.downcast_ref::<u32>())
                .copied()
                .unwrap_or(0);
            Some(Entry::new(key.clone(), format!("{key}-{suffix}"), Duration::ZERO))
        };

        let entry = Loader::load(&loader, &"k".to_string(), &[&7u32]).unwrap();
        assert_eq!(entry.value(), "k-7");

        let entry = Loader::load(&loader, &"k".to_string(), &[]).unwrap();
        assert_eq!(entry.value(), "k-0");
    }

    #[test]
    fn test_closure_hooks_as_trait_objects() {
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let add: Arc<dyn AddHook<&str, u8>> = Arc::new(move |_: &Entry<&str, u8>| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = calls.clone();
        let evict: Arc<dyn EvictHook<&str>> = Arc::new(move |_: &&str| {
            counter.fetch_add(10, Ordering::SeqCst);
        });

        add.on_add(&Entry::new("a", 1, Duration::ZERO));
        evict.on_evict(&"a");

        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }
}
