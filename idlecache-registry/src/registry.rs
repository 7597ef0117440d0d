//! Named table directory.
//!
//! Tables are created on first lookup and never removed.

use std::any::{Any, TypeId};
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::{debug, instrument};

use idlecache_core::TableConfig;
use idlecache_table::Table;

/// Identifies a table by name and by its key/value types.
///
/// Two lookups with the same name but different types resolve to different
/// tables.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TableId {
    name: String,
    kind: TypeId,
}

/// Directory mapping table names to tables.
///
/// Uses a concurrent map so that concurrent first lookups of the same name
/// create exactly one table.
#[derive(Debug, Default)]
pub struct Registry {
    tables: DashMap<TableId, Arc<dyn Any + Send + Sync>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    /// Returns the process-wide registry, initialized empty on first use.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Returns the table called `name`, creating it with default configuration
    /// if needed.
    pub fn get_or_create<K, V>(&self, name: &str) -> Arc<Table<K, V>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        self.get_or_create_with(name, &TableConfig::default())
    }

    /// Returns the table called `name`, creating it with `config` if needed.
    ///
    /// `config` is ignored when the table already exists.
    #[instrument(level = "trace", skip(self, config))]
    pub fn get_or_create_with<K, V>(&self, name: &str, config: &TableConfig) -> Arc<Table<K, V>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let id = TableId {
            name: name.to_string(),
            kind: TypeId::of::<Table<K, V>>(),
        };

        if let Some(slot) = self.tables.get(&id) {
            return Self::typed(slot.value().clone());
        }

        let slot = self
            .tables
            .entry(id)
            .or_insert_with(|| {
                debug!(table = name, "Creating cache table");
                let table: Arc<dyn Any + Send + Sync> = Table::<K, V>::with_config(name, config);
                table
            })
            .value()
            .clone();

        Self::typed(slot)
    }

    /// Returns true if any table called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|slot| slot.key().name == name)
    }

    /// Returns the number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if no table has been created yet.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns the sorted, de-duplicated names of all tables.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .iter()
            .map(|slot| slot.key().name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn typed<K, V>(slot: Arc<dyn Any + Send + Sync>) -> Arc<Table<K, V>>
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        match slot.downcast::<Table<K, V>>() {
            Ok(table) => table,
            Err(_) => unreachable!("registry slots are keyed by their table type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_get_or_create_same_instance() {
        let registry = Registry::new();

        let first: Arc<Table<String, u32>> = registry.get_or_create("users");
        let second: Arc<Table<String, u32>> = registry.get_or_create("users");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(first.name(), "users");
    }

    #[test]
    fn test_tables_are_independent() {
        let registry = Registry::new();

        let users: Arc<Table<String, u32>> = registry.get_or_create("users");
        let orders: Arc<Table<String, u32>> = registry.get_or_create("orders");
        users.add("alice".into(), 1, Duration::ZERO);

        assert_eq!(users.count(), 1);
        assert!(orders.is_empty());
        assert_eq!(registry.names(), vec!["orders".to_string(), "users".to_string()]);
    }

    #[test]
    fn test_same_name_different_types() {
        let registry = Registry::new();

        let by_name: Arc<Table<String, u32>> = registry.get_or_create("mixed");
        let by_id: Arc<Table<u64, String>> = registry.get_or_create("mixed");
        by_name.add("alice".into(), 1, Duration::ZERO);

        assert!(by_id.is_empty());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["mixed".to_string()]);
    }

    #[test]
    fn test_config_applies_on_creation_only() {
        let registry = Registry::new();
        let config = TableConfig::new().initial_capacity(8);

        let created: Arc<Table<String, u32>> = registry.get_or_create_with("configured", &config);
        created.add("alice".into(), 1, Duration::ZERO);

        let found: Arc<Table<String, u32>> =
            registry.get_or_create_with("configured", &TableConfig::default());
        assert!(Arc::ptr_eq(&created, &found));
        assert!(found.exists(&"alice".to_string()));
    }

    #[test]
    fn test_contains() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains("users"));

        let _: Arc<Table<String, u32>> = registry.get_or_create("users");

        assert!(registry.contains("users"));
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_global_registry() {
        let first: Arc<Table<String, u32>> =
            Registry::global().get_or_create("test_global_registry");
        first.add("alice".into(), 1, Duration::ZERO);

        let second = crate::table::<String, u32>("test_global_registry");

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Registry::global().contains("test_global_registry"));
    }

    #[test]
    fn test_concurrent_first_access_threads() {
        let registry = Arc::new(Registry::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.get_or_create::<String, u32>("x"))
            })
            .collect();
        let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_tasks() {
        use tokio::task::JoinSet;

        let mut tasks = JoinSet::new();
        for _ in 0..32 {
            tasks.spawn(async move {
                crate::table::<String, String>("test_concurrent_first_access_tasks")
            });
        }

        let mut tables = Vec::new();
        while let Some(result) = tasks.join_next().await {
            tables.push(result.unwrap());
        }

        assert_eq!(tables.len(), 32);
        assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
    }
}
