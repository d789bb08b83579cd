//! Talon Datastore - write-behind memory-cached record store
//!
//! Hierarchical key/value store backing the Talon server: every record
//! is addressed by a [`StorePath`](talon_common::StorePath) and encoded
//! per the path's tag. Two bounded LRU caches absorb the read and
//! listing traffic; a writer pool applies mutations to the file-backed
//! ground truth behind the callers' backs.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                   WriteBackStore                      │
//! │  ┌─────────────────────────────────────────────────┐  │
//! │  │    MemcacheStore (data cache + dir cache)       │  │
//! │  └─────────────────────────────────────────────────┘  │
//! │        │ miss                 │ mutations             │
//! │        ▼                      ▼                       │
//! │  ┌───────────┐      ┌─────────────────────┐           │
//! │  │ FileStore │ ◄──  │ writer pool (FIFO)  │           │
//! │  └───────────┘      └─────────────────────┘           │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Write path
//! 1. Encode per the path's tag
//! 2. Update the caches (read-after-write inside the process)
//! 3. Enqueue a mutation; a writer persists it and fixes up stale
//!    directory metadata
//!
//! # Read path
//! 1. Check the data cache (hit → return)
//! 2. Read the files, rehydrate the cache

pub mod cache;
pub mod codec;
pub mod filestore;
pub mod lru;
pub mod memcache;
pub mod metrics;
pub mod writeback;

// Re-exports
pub use cache::{DataCache, DirectoryCache, DirectoryMetadata};
pub use filestore::FileStore;
pub use lru::BoundedLru;
pub use memcache::{DirMetadataResolver, InMemoryResolver, MemcacheStore};
pub use metrics::{
    DatastoreMetrics, METRIC_DATA_HITS, METRIC_DATA_MISSES, METRIC_DIR_HITS, METRIC_DIR_MISSES,
    METRIC_IDLE_WRITERS,
};
pub use writeback::{Completion, FileStoreResolver, WriteBackStore};
