//! Cache module for storing fetched pages
//!
//! `store` provides the pluggable key-value backends (in-memory and on-disk),
//! `fingerprint` turns a request into a stable key, and `manager` layers TTL
//! semantics on top. Expired entries are never served; they are removed the
//! next time they are read.

mod fingerprint;
mod manager;
pub mod store;

pub use fingerprint::fingerprint;
pub use manager::{CacheEntry, CacheManager};
pub use store::{DiskStore, KeyValueStore, MemoryStore, StorageError};
