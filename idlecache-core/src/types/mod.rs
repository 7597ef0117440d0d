//! Domain types for idlecache.

mod entry;

pub use entry::Entry;
