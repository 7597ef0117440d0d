//! # idlecache Registry
//!
//! Directory of named cache tables, created lazily on first reference.
//!
//! Most callers use the process-wide registry through [`table`]:
//!
//! ```rust
//! use std::time::Duration;
//!
//! let users = idlecache_registry::table::<String, u32>("users");
//! users.add("alice".into(), 7, Duration::from_secs(60));
//!
//! // Same name and types, same table.
//! let again = idlecache_registry::table::<String, u32>("users");
//! assert!(again.exists(&"alice".to_string()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod registry;

use std::hash::Hash;
use std::sync::Arc;

pub use registry::Registry;

pub use idlecache_core::TableConfig;
pub use idlecache_table::Table;

/// Returns the process-wide table called `name`, creating it if needed.
pub fn table<K, V>(name: &str) -> Arc<Table<K, V>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    Registry::global().get_or_create(name)
}
