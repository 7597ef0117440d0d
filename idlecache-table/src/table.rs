//! Cache table with idle-time expiry.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::instrument;

use idlecache_core::{
    AddHook, CacheError, DeleteHook, Entry, Loader, Result, TableConfig, TableLogger,
};

use crate::logger::TracingLogger;
use crate::sweeper::{self, PendingSweep};

/// Configured hooks. Each is cloned out under the lock and invoked after it
/// is released.
struct Hooks<K, V> {
    loader: Option<Arc<dyn Loader<K, V>>>,
    on_add: Option<Arc<dyn AddHook<K, V>>>,
    on_delete: Option<Arc<dyn DeleteHook<K, V>>>,
    logger: Option<Arc<dyn TableLogger>>,
}

/// Everything guarded by the table lock.
struct TableInner<K, V> {
    entries: HashMap<K, Arc<Entry<K, V>>>,
    sweep: Option<PendingSweep>,
    next_generation: u64,
    hooks: Hooks<K, V>,
}

/// A named collection of entries that expire after sitting idle.
///
/// All operations are thread-safe. Tables are handed out as `Arc<Table>`
/// because pending expiration sweeps hold a weak reference back to the
/// table; once every strong reference is gone, pending sweeps do nothing.
///
/// # Expiry
///
/// The table keeps at most one sweep scheduled, due no later than the
/// nearest expiry among entries with a nonzero idle TTL. Each sweep deletes
/// the entries that have been idle for at least their TTL and re-arms itself
/// for the next nearest expiry, if any.
pub struct Table<K, V> {
    name: String,
    self_ref: Weak<Table<K, V>>,
    inner: RwLock<TableInner<K, V>>,
}

impl<K, V> Table<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates an empty table with default configuration.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_config(name, &TableConfig::default())
    }

    /// Creates an empty table with custom configuration.
    pub fn with_config(name: impl Into<String>, config: &TableConfig) -> Arc<Self> {
        let logger: Option<Arc<dyn TableLogger>> = if config.trace_events {
            Some(Arc::new(TracingLogger))
        } else {
            None
        };

        Arc::new_cyclic(|self_ref| Self {
            name: name.into(),
            self_ref: self_ref.clone(),
            inner: RwLock::new(TableInner {
                entries: HashMap::with_capacity(config.initial_capacity),
                sweep: None,
                next_generation: 0,
                hooks: Hooks {
                    loader: None,
                    on_add: None,
                    on_delete: None,
                    logger,
                },
            }),
        })
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a value, replacing any entry already stored under `key`.
    ///
    /// An idle TTL of zero means the entry never expires on idleness.
    pub fn add(&self, key: K, value: V, idle_ttl: Duration) -> Arc<Entry<K, V>> {
        let entry = Arc::new(Entry::new(key, value, idle_ttl));
        self.insert_locked(self.inner.write(), entry.clone());
        entry
    }

    /// Inserts a value only if `key` is absent.
    ///
    /// Returns false, leaving the table untouched, if the key was present.
    pub fn not_found_add(&self, key: K, value: V, idle_ttl: Duration) -> bool {
        let inner = self.inner.write();
        if inner.entries.contains_key(&key) {
            return false;
        }
        self.insert_locked(inner, Arc::new(Entry::new(key, value, idle_ttl)));
        true
    }

    /// Returns the entry for `key` and marks it as accessed.
    ///
    /// On a miss the configured loader, if any, is asked for the value.
    pub fn get(&self, key: &K) -> Result<Arc<Entry<K, V>>> {
        self.get_with(key, &[])
    }

    /// Like [`get`](Self::get), passing `args` through to the loader on a miss.
    ///
    /// A loaded value is stored under `key` with the loader's idle TTL, going
    /// through the same path as [`add`](Self::add). Any eviction callback set
    /// on the loader's entry is not carried over.
    pub fn get_with(&self, key: &K, args: &[&dyn Any]) -> Result<Arc<Entry<K, V>>> {
        let (found, loader) = {
            let inner = self.inner.read();
            (inner.entries.get(key).cloned(), inner.hooks.loader.clone())
        };

        if let Some(entry) = found {
            entry.keep_alive();
            return Ok(entry);
        }

        let loader = loader.ok_or(CacheError::KeyNotFound)?;
        let loaded = loader
            .load(key, args)
            .ok_or(CacheError::KeyNotFoundOrNotLoadable)?;
        let (_, value, idle_ttl) = loaded.into_parts();

        Ok(self.add(key.clone(), value, idle_ttl))
    }

    /// Removes the entry for `key` and returns it.
    ///
    /// The delete hook runs first, then the entry's own eviction callback,
    /// then the entry is removed.
    pub fn delete(&self, key: &K) -> Result<Arc<Entry<K, V>>> {
        let entry = self
            .inner
            .read()
            .entries
            .get(key)
            .cloned()
            .ok_or(CacheError::KeyNotFound)?;

        if self.remove_entry(&entry) {
            Ok(entry)
        } else {
            // Another delete or a sweep got there first.
            Err(CacheError::KeyNotFound)
        }
    }

    /// Returns true if `key` is present. Does not count as an access.
    pub fn exists(&self, key: &K) -> bool {
        self.inner.read().entries.contains_key(key)
    }

    /// Returns the number of entries.
    pub fn count(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns true if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Visits every entry while holding the table's read lock.
    ///
    /// `visit` must not call methods that modify this table.
    pub fn for_each(&self, mut visit: impl FnMut(&K, &Arc<Entry<K, V>>)) {
        let inner = self.inner.read();
        for (key, entry) in inner.entries.iter() {
            visit(key, entry);
        }
    }

    /// Returns up to `n` entries ordered by descending access count.
    pub fn most_accessed(&self, n: usize) -> Vec<Arc<Entry<K, V>>> {
        let mut ranked: Vec<(u64, Arc<Entry<K, V>>)> = self
            .inner
            .read()
            .entries
            .values()
            .map(|entry| (entry.access_count(), entry.clone()))
            .collect();

        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        ranked.into_iter().take(n).map(|(_, entry)| entry).collect()
    }

    /// Drops every entry and cancels the pending sweep.
    ///
    /// No delete or eviction callbacks fire.
    #[instrument(level = "trace", skip_all, fields(table = %self.name))]
    pub fn flush(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        if let Some(pending) = inner.sweep.take() {
            pending.cancel();
        }
        let logger = inner.hooks.logger.clone();
        drop(inner);

        self.log(&logger, format_args!("Flushing table {}", self.name));
    }

    /// Sets the hook consulted on a lookup miss.
    pub fn set_loader(&self, loader: impl Loader<K, V> + 'static) {
        self.inner.write().hooks.loader = Some(Arc::new(loader));
    }

    /// Removes the load-miss hook.
    pub fn clear_loader(&self) {
        self.inner.write().hooks.loader = None;
    }

    /// Sets the hook called after each insertion.
    pub fn set_add_callback(&self, hook: impl AddHook<K, V> + 'static) {
        self.inner.write().hooks.on_add = Some(Arc::new(hook));
    }

    /// Removes the insertion hook.
    pub fn clear_add_callback(&self) {
        self.inner.write().hooks.on_add = None;
    }

    /// Sets the hook called before each removal.
    pub fn set_delete_callback(&self, hook: impl DeleteHook<K, V> + 'static) {
        self.inner.write().hooks.on_delete = Some(Arc::new(hook));
    }

    /// Removes the removal hook.
    pub fn clear_delete_callback(&self) {
        self.inner.write().hooks.on_delete = None;
    }

    /// Sets the diagnostics sink.
    pub fn set_logger(&self, logger: impl TableLogger + 'static) {
        self.inner.write().hooks.logger = Some(Arc::new(logger));
    }

    /// Silences diagnostics.
    pub fn clear_logger(&self) {
        self.inner.write().hooks.logger = None;
    }

    /// Returns table statistics.
    pub fn stats(&self) -> TableStats {
        let inner = self.inner.read();
        let now = Instant::now();
        TableStats {
            total_entries: inner.entries.len(),
            expiring_entries: inner.entries.values().filter(|e| e.expires()).count(),
            next_sweep_in: inner
                .sweep
                .as_ref()
                .map(|pending| pending.due.saturating_duration_since(now)),
        }
    }

    /// Stores `entry` and finishes the insertion with the lock released.
    fn insert_locked(
        &self,
        mut inner: RwLockWriteGuard<'_, TableInner<K, V>>,
        entry: Arc<Entry<K, V>>,
    ) {
        inner.entries.insert(entry.key().clone(), entry.clone());

        if entry.expires() {
            // A deadline past the end of `Instant` is never sooner than an
            // armed sweep.
            let due = Instant::now().checked_add(entry.idle_ttl());
            let sooner = match (&inner.sweep, due) {
                (None, _) => true,
                (Some(pending), Some(due)) => due < pending.due,
                (Some(_), None) => false,
            };
            if sooner {
                self.arm(&mut inner, entry.idle_ttl());
            }
        }

        let on_add = inner.hooks.on_add.clone();
        let logger = inner.hooks.logger.clone();
        drop(inner);

        self.log(
            &logger,
            format_args!(
                "Adding entry with lifespan of {:?} to table {}",
                entry.idle_ttl(),
                self.name
            ),
        );
        if let Some(hook) = on_add {
            hook.on_add(&entry);
        }
    }

    /// Replaces the pending sweep with one that fires after `wait`.
    fn arm(&self, inner: &mut TableInner<K, V>, wait: Duration) {
        if let Some(pending) = inner.sweep.take() {
            pending.cancel();
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;
        let table = self.self_ref.clone();
        inner.sweep = sweeper::schedule(wait, generation, move || {
            if let Some(table) = table.upgrade() {
                table.expiration_check(Some(generation));
            }
        });
    }

    /// Deletes idle entries and re-arms the sweep for the next expiry.
    ///
    /// `fired` is the generation of the timer that triggered this run.
    #[instrument(level = "trace", skip_all, fields(table = %self.name))]
    fn expiration_check(&self, fired: Option<u64>) {
        let mut inner = self.inner.write();

        let previous_wait = match inner.sweep.take() {
            Some(pending) if Some(pending.generation) == fired => None,
            Some(pending) => {
                let wait = pending.due.saturating_duration_since(Instant::now());
                pending.cancel();
                Some(wait)
            }
            None => None,
        };

        let now = Instant::now();
        let mut expired = Vec::new();
        let mut next_wait: Option<Duration> = None;
        for entry in inner.entries.values() {
            match entry.remaining(now) {
                None => {}
                Some(left) if left.is_zero() => expired.push(entry.clone()),
                Some(left) => {
                    next_wait = Some(next_wait.map_or(left, |wait| wait.min(left)));
                }
            }
        }

        if let Some(wait) = next_wait {
            self.arm(&mut inner, wait);
        }
        let logger = inner.hooks.logger.clone();
        drop(inner);

        match previous_wait {
            Some(wait) => self.log(
                &logger,
                format_args!(
                    "Expiration check preempted a sweep due in {:?} for table {}",
                    wait, self.name
                ),
            ),
            None => self.log(
                &logger,
                format_args!(
                    "Expiration check found {} idle entries in table {}, next check in {:?}",
                    expired.len(),
                    self.name,
                    next_wait
                ),
            ),
        }

        for entry in &expired {
            self.remove_entry(entry);
        }
    }

    /// Runs the removal callbacks for `entry` and removes it if it is still
    /// the one stored under its key.
    ///
    /// Returns false if the entry was already replaced or removed, or if
    /// another path already claimed it.
    fn remove_entry(&self, entry: &Arc<Entry<K, V>>) -> bool {
        let on_delete = {
            // Overwrites and flushes take the write lock, so the entry cannot
            // leave its slot between this check and the claim.
            let inner = self.inner.read();
            let stored = matches!(
                inner.entries.get(entry.key()),
                Some(current) if Arc::ptr_eq(current, entry)
            );
            if !stored || !entry.begin_eviction() {
                return false;
            }
            inner.hooks.on_delete.clone()
        };

        if let Some(hook) = on_delete {
            hook.on_delete(entry);
        }
        entry.notify_evict();

        let mut inner = self.inner.write();
        if matches!(inner.entries.get(entry.key()), Some(current) if Arc::ptr_eq(current, entry)) {
            inner.entries.remove(entry.key());
        }
        let logger = inner.hooks.logger.clone();
        drop(inner);

        self.log(
            &logger,
            format_args!(
                "Deleting entry created {:?} ago with {} hits from table {}",
                entry.created_at().elapsed(),
                entry.access_count(),
                self.name
            ),
        );
        true
    }

    fn log(&self, logger: &Option<Arc<dyn TableLogger>>, message: fmt::Arguments<'_>) {
        if let Some(logger) = logger {
            logger.log(&self.name, message);
        }
    }
}

impl<K, V> fmt::Debug for Table<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("entries", &inner.entries.len())
            .field("sweep_due", &inner.sweep.as_ref().map(|pending| pending.due))
            .finish()
    }
}

/// Table statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableStats {
    /// Total entries
    pub total_entries: usize,
    /// Entries with a nonzero idle TTL
    pub expiring_entries: usize,
    /// Time until the pending sweep fires, if one is armed
    pub next_sweep_in: Option<Duration>,
}
