//! Memcache core
//!
//! Composes the data cache and the directory cache into the in-memory
//! half of the store: get/set/delete of serialized records plus
//! directory listings, with parent-directory membership maintained on
//! every write.
//!
//! The core does not know how to synthesize directory metadata from
//! scratch; that policy is injected as a [`DirMetadataResolver`] so the
//! same core serves both the file-backed store and a purely in-memory
//! one.

use crate::cache::{DataCache, DirectoryCache};
use crate::codec;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use talon_common::{Error, Result, StorePath};

/// Policy for obtaining a directory's metadata on a write.
///
/// `resolve` reports whether `dir` currently has metadata eligible for
/// an in-place child update. Implementations may mutate the directory
/// cache while deciding (synthesizing fresh metadata, or pruning stale
/// lower-bound entries).
pub trait DirMetadataResolver: Send + Sync {
    fn resolve(&self, dir_cache: &DirectoryCache, dir: &StorePath) -> bool;
}

/// Resolver for an all-in-memory store: the cache is the only truth, so
/// an absent directory simply becomes an empty, complete listing.
pub struct InMemoryResolver;

impl DirMetadataResolver for InMemoryResolver {
    fn resolve(&self, dir_cache: &DirectoryCache, dir: &StorePath) -> bool {
        if !dir_cache.contains(dir) {
            dir_cache.synthesize(dir, true);
        }
        true
    }
}

/// In-memory record store: data cache + directory cache + resolver
pub struct MemcacheStore {
    data_cache: DataCache,
    dir_cache: DirectoryCache,
    resolver: Box<dyn DirMetadataResolver>,
}

impl MemcacheStore {
    pub fn new(
        data_max_entries: usize,
        data_max_item_bytes: usize,
        dir_max_entries: usize,
        resolver: Box<dyn DirMetadataResolver>,
    ) -> Self {
        Self {
            data_cache: DataCache::new(data_max_entries, data_max_item_bytes),
            dir_cache: DirectoryCache::new(dir_max_entries),
            resolver,
        }
    }

    /// Decode the cached record at `path`. Fails with `NotFound` when
    /// the path is not resident; the write-behind layer owns the
    /// filesystem fallback.
    pub fn get_subject<T: DeserializeOwned>(&self, path: &StorePath) -> Result<T> {
        let data = self.data_cache.get(path).ok_or(Error::NotFound)?;
        codec::decode(path.kind(), &data)
    }

    /// Raw cached payload bytes at `path`
    pub fn get_buffer(&self, path: &StorePath) -> Result<Bytes> {
        self.data_cache.get(path).ok_or(Error::NotFound)
    }

    /// Encode and store a record, maintaining the parent listing
    pub fn set_subject<T: Serialize>(&self, path: &StorePath, message: &T) -> Result<()> {
        let data = codec::encode(path.kind(), message)?;
        self.set_data(path, data)
    }

    /// Store pre-encoded payload bytes, maintaining the parent listing.
    /// Also the hydration path when a read falls back to the filesystem.
    pub fn set_data(&self, path: &StorePath, data: Bytes) -> Result<()> {
        self.data_cache.set(path.clone(), data);

        // Membership maintenance: only directories that already carry
        // metadata are updated. Creating metadata here would either lie
        // (claim completeness) or cost a filesystem listing nobody asked
        // for; the resolver decides.
        let parent = path.parent();
        if self.resolver.resolve(&self.dir_cache, &parent) {
            self.dir_cache.add_child(&parent, path.clone());
        }
        Ok(())
    }

    /// Drop a record and its membership in the parent listing
    pub fn delete_subject(&self, path: &StorePath) -> Result<()> {
        self.data_cache.remove(path);
        if let Some(name) = path.file_name() {
            self.dir_cache.remove_child(&path.parent(), name);
        }
        Ok(())
    }

    /// Children of `dir` when a complete listing is cached, in
    /// lexicographic order. `None` means the caller must consult the
    /// ground truth (no metadata, or a lower bound only).
    pub fn list_children(&self, dir: &StorePath) -> Option<Vec<StorePath>> {
        self.dir_cache.full_children(dir)
    }

    /// Replace the listing for `dir` with an authoritative, complete one
    pub fn set_children(&self, dir: &StorePath, children: impl IntoIterator<Item = StorePath>) {
        self.dir_cache.set_children(dir, children);
    }

    /// Install idle expiry on both caches. Keys whose path or directory
    /// key ends in `exempt_suffix` never expire.
    pub fn set_expiry(&self, window: Duration, exempt_suffix: &'static str) {
        self.data_cache.set_expiry(window, move |path: &StorePath| {
            path.dir_key().ends_with(exempt_suffix)
        });
        self.dir_cache
            .set_expiry(window, move |key: &String| key.ends_with(exempt_suffix));
    }

    /// The directory cache (shared with the write-behind invalidation)
    pub fn dir_cache(&self) -> &DirectoryCache {
        &self.dir_cache
    }

    /// Number of records resident in the data cache
    pub fn data_len(&self) -> usize {
        self.data_cache.len()
    }

    /// Snapshot of the resident record paths (debugging surface)
    pub fn cached_paths(&self) -> Vec<StorePath> {
        self.data_cache.paths()
    }

    /// Drop all cached state
    pub fn clear(&self) {
        self.data_cache.clear();
        self.dir_cache.clear();
    }

    /// Release cache state ahead of teardown
    pub fn close(&self) {
        self.clear();
    }
}
