//! Data and directory caches
//!
//! Two bounded LRUs with opposite coherency rules sit in front of the
//! file-backed ground truth:
//!
//! - the **data cache** maps a full [`StorePath`] to its serialized
//!   payload bytes; an entry is either current or absent,
//! - the **directory cache** maps a directory key to a
//!   [`DirectoryMetadata`] child set whose `full` flag records whether
//!   the set is known complete. A non-full set is a lower bound only,
//!   which is still enough to maintain membership on writes without
//!   touching the filesystem.
//!
//! "No metadata at all" and "metadata present but not full" are distinct
//! conditions and both observable through [`DirectoryCache`].

use crate::lru::BoundedLru;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::time::Duration;
use talon_common::StorePath;

/// Cached child set for one directory
#[derive(Clone, Debug, Default)]
pub struct DirectoryMetadata {
    /// Direct children keyed by final component; the BTreeMap keeps
    /// listings in lexicographic order.
    children: BTreeMap<String, StorePath>,
    /// True when the set equals the backing store's children as of the
    /// last authoritative refresh.
    full: bool,
}

impl DirectoryMetadata {
    /// Create empty metadata with the given completeness claim
    #[must_use]
    pub fn new(full: bool) -> Self {
        Self {
            children: BTreeMap::new(),
            full,
        }
    }

    /// Build a complete listing from an authoritative refresh
    #[must_use]
    pub fn full_listing(children: impl IntoIterator<Item = StorePath>) -> Self {
        let mut metadata = Self::new(true);
        for child in children {
            metadata.insert(child);
        }
        metadata
    }

    /// Whether this set is known complete
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Record a direct child. Does not change the completeness claim.
    pub fn insert(&mut self, child: StorePath) {
        if let Some(name) = child.file_name() {
            self.children.insert(name.to_string(), child);
        }
    }

    /// Forget a direct child by name
    pub fn remove(&mut self, name: &str) {
        self.children.remove(name);
    }

    /// Children in lexicographic component order
    #[must_use]
    pub fn children(&self) -> Vec<StorePath> {
        self.children.values().cloned().collect()
    }

    /// Number of known children
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check if no children are known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// LRU of `StorePath` → serialized payload bytes
pub struct DataCache {
    lru: BoundedLru<StorePath, Bytes>,
}

impl DataCache {
    /// Create a data cache bounded by entry count and per-entry bytes.
    /// Payloads above `max_item_bytes` are not retained.
    pub fn new(max_entries: usize, max_item_bytes: usize) -> Self {
        Self {
            lru: BoundedLru::with_item_cap(max_entries, max_item_bytes, |data: &Bytes| data.len()),
        }
    }

    pub fn get(&self, path: &StorePath) -> Option<Bytes> {
        self.lru.get(path)
    }

    pub fn set(&self, path: StorePath, data: Bytes) {
        self.lru.insert(path, data);
    }

    pub fn remove(&self, path: &StorePath) {
        self.lru.remove(path);
    }

    /// Configure idle expiry; paths matched by `exempt` never expire
    pub fn set_expiry(
        &self,
        window: Duration,
        exempt: impl Fn(&StorePath) -> bool + Send + Sync + 'static,
    ) {
        self.lru.set_time_to_idle(window);
        self.lru.set_exemption(exempt);
    }

    pub fn clear(&self) {
        self.lru.clear();
    }

    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }

    /// Snapshot of the cached paths (debugging surface)
    pub fn paths(&self) -> Vec<StorePath> {
        self.lru.keys()
    }
}

/// LRU of directory key → [`DirectoryMetadata`]
pub struct DirectoryCache {
    lru: BoundedLru<String, DirectoryMetadata>,
}

impl DirectoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            lru: BoundedLru::new(max_entries),
        }
    }

    /// Metadata snapshot for a directory, if cached at all
    pub fn get(&self, dir: &StorePath) -> Option<DirectoryMetadata> {
        self.lru.get(&dir.dir_key())
    }

    /// Children of a directory whose cached listing is known complete.
    /// `None` covers both "no metadata" and "present but not full".
    pub fn full_children(&self, dir: &StorePath) -> Option<Vec<StorePath>> {
        self.lru
            .get(&dir.dir_key())
            .filter(DirectoryMetadata::is_full)
            .map(|metadata| metadata.children())
    }

    /// Replace the listing for a directory with an authoritative one
    pub fn set_children(&self, dir: &StorePath, children: impl IntoIterator<Item = StorePath>) {
        self.lru
            .insert(dir.dir_key(), DirectoryMetadata::full_listing(children));
    }

    /// Record a child in existing metadata. Returns false when the
    /// directory has no metadata; no metadata is created.
    pub fn add_child(&self, dir: &StorePath, child: StorePath) -> bool {
        self.lru
            .update(&dir.dir_key(), |metadata| metadata.insert(child))
    }

    /// Drop a child from existing metadata, if any
    pub fn remove_child(&self, dir: &StorePath, name: &str) -> bool {
        self.lru
            .update(&dir.dir_key(), |metadata| metadata.remove(name))
    }

    /// Insert empty metadata for a directory (memory-only resolver path)
    pub fn synthesize(&self, dir: &StorePath, full: bool) {
        self.lru.insert(dir.dir_key(), DirectoryMetadata::new(full));
    }

    /// Touch a directory's metadata, reporting presence of any kind
    pub fn contains(&self, dir: &StorePath) -> bool {
        self.lru.touch(&dir.dir_key())
    }

    /// Drop the entry for a directory when it only holds a lower-bound
    /// (non-full) child set. Complete listings are left alone: they were
    /// already maintained in memory at submission time.
    pub fn remove_if_partial(&self, dir: &StorePath) -> bool {
        self.lru
            .remove_if(&dir.dir_key(), |metadata| !metadata.is_full())
    }

    pub fn remove(&self, dir: &StorePath) {
        self.lru.remove(&dir.dir_key());
    }

    /// Configure idle expiry; directory keys matched by `exempt` never
    /// expire
    pub fn set_expiry(
        &self,
        window: Duration,
        exempt: impl Fn(&String) -> bool + Send + Sync + 'static,
    ) {
        self.lru.set_time_to_idle(window);
        self.lru.set_exemption(exempt);
    }

    pub fn clear(&self) {
        self.lru.clear();
    }

    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> StorePath {
        StorePath::json(parts.iter().copied())
    }

    #[test]
    fn test_directory_metadata_ordering() {
        let mut metadata = DirectoryMetadata::new(true);
        metadata.insert(path(&["a", "zz.json.db"]));
        metadata.insert(path(&["a", "aa.json.db"]));
        metadata.insert(path(&["a", "mm.json.db"]));

        let names: Vec<_> = metadata
            .children()
            .iter()
            .map(|child| child.file_name().unwrap().to_string())
            .collect();
        assert_eq!(names, ["aa.json.db", "mm.json.db", "zz.json.db"]);
    }

    #[test]
    fn test_directory_cache_distinguishes_partial_from_missing() {
        let cache = DirectoryCache::new(10);
        let dir = path(&["clients"]);

        // No metadata at all.
        assert!(cache.get(&dir).is_none());
        assert!(cache.full_children(&dir).is_none());
        assert!(!cache.add_child(&dir, dir.child("C.1")));

        // Present but not full: membership is recorded, listing is not
        // served.
        cache.synthesize(&dir, false);
        assert!(cache.add_child(&dir, dir.child("C.1")));
        assert!(cache.get(&dir).is_some());
        assert!(cache.full_children(&dir).is_none());

        // Full: listing is served.
        cache.set_children(&dir, vec![dir.child("C.1"), dir.child("C.2")]);
        let children = cache.full_children(&dir).unwrap();
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_remove_if_partial_spares_full_listings() {
        let cache = DirectoryCache::new(10);
        let full_dir = path(&["a"]);
        let partial_dir = path(&["b"]);

        cache.set_children(&full_dir, vec![full_dir.child("x.json.db")]);
        cache.synthesize(&partial_dir, false);

        assert!(!cache.remove_if_partial(&full_dir));
        assert!(cache.remove_if_partial(&partial_dir));

        assert!(cache.get(&full_dir).is_some());
        assert!(cache.get(&partial_dir).is_none());
    }

    #[test]
    fn test_empty_full_listing_is_served() {
        let cache = DirectoryCache::new(10);
        let dir = path(&["empty"]);
        cache.set_children(&dir, Vec::new());

        let children = cache.full_children(&dir).unwrap();
        assert!(children.is_empty());
    }

    #[test]
    fn test_data_cache_oversize_bypass() {
        let cache = DataCache::new(10, 8);
        let small = path(&["small.json.db"]);
        let large = path(&["large.json.db"]);

        cache.set(small.clone(), Bytes::from_static(b"tiny"));
        cache.set(large.clone(), Bytes::from(vec![0u8; 64]));

        assert!(cache.get(&small).is_some());
        assert!(cache.get(&large).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_directory_cache_cap() {
        let cache = DirectoryCache::new(3);
        for i in 0..20 {
            let dir = path(&["dirs", &format!("d{i}")]);
            cache.set_children(&dir, Vec::new());
        }
        assert_eq!(cache.len(), 3);
    }
}
