//! # idlecache Core
//!
//! Core types, errors, and traits shared by the idlecache crates.
//!
//! - **Types**: the cached [`Entry`] and its access metadata
//! - **Errors**: [`CacheError`] and the crate-wide [`Result`] alias
//! - **Traits**: hook interfaces a table invokes on load, insert, delete and evict
//! - **Config**: [`TableConfig`] used when a table is first created
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use idlecache_core::Entry;
//!
//! let entry = Entry::new("session:42", 7u32, Duration::from_secs(30));
//! entry.keep_alive();
//! assert_eq!(entry.access_count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use config::TableConfig;
pub use error::{CacheError, Result};
pub use traits::*;
pub use types::*;
