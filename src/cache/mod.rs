//! Generic query cache.
//!
//! This module provides a resource-agnostic caching mechanism that:
//! - Addresses entries by hierarchical [`QueryKey`]s
//! - Serves fresh entries without touching the network
//! - Shares one in-flight fetch between concurrent readers of a key
//! - Invalidates whole key prefixes and broadcasts the invalidation
//! - Serves the last good data when a refetch fails (offline mode)

mod key;
mod layer;
mod storage;
mod traits;

pub use key::{KeyParams, KeyPart, QueryKey};
pub use layer::{QueryClient, QueryOptions};
pub use storage::{CacheStorage, CachedEntry, MemoryStorage, NoopStorage};
pub use traits::{CacheResult, CacheSource};
