//! # idlecache Table
//!
//! A named, thread-safe key-value table whose entries expire after sitting
//! unread for their idle TTL.
//!
//! ## Features
//!
//! - **Idle expiry**: every read resets an entry's idle clock
//! - **Self-scheduling sweeps**: the table sleeps exactly until the next known
//!   expiry instead of polling on a fixed interval
//! - **Hooks**: load-on-miss, after-add, before-delete and per-entry eviction
//!   callbacks, all invoked with the table lock released
//! - **Opt-in diagnostics**: attach a [`TableLogger`] such as [`TracingLogger`]
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use idlecache_table::Table;
//!
//! let table = Table::new("sessions");
//! table.add("alice".to_string(), 1u32, Duration::from_secs(30));
//!
//! let entry = table.get(&"alice".to_string()).unwrap();
//! assert_eq!(*entry.value(), 1);
//! assert_eq!(entry.access_count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod logger;
mod sweeper;
mod table;

pub use logger::TracingLogger;
pub use table::{Table, TableStats};

pub use idlecache_core::{
    AddHook, CacheError, DeleteHook, Entry, EvictHook, Loader, Result, TableConfig, TableLogger,
};
