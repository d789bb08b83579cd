//! Write-behind store
//!
//! The public face of the datastore. Reads consult the memcache core
//! and fall back to the file backend, rehydrating the data cache.
//! Writes update memory synchronously (read-after-write inside the
//! process) and enqueue a [`Mutation`] on a bounded channel; a fixed
//! pool of writer workers drains the channel and applies mutations to
//! the files.
//!
//! ```text
//! caller ──get──► memcache ──miss──► files ──► rehydrate cache
//! caller ──set──► memcache (sync) ──► mutation channel ──► writers ──► files
//! ```
//!
//! Ordering: the channel is FIFO and every worker pulls from it, so
//! mutations are handed to workers in submission order, but a pool
//! larger than one may reorder same-path mutations at the filesystem.
//! Callers needing strict durable ordering serialize on the completion
//! signal or run the store in write-through mode (negative mutation
//! buffer).
//!
//! Shutdown: cancelling the token passed to [`WriteBackStore::start`]
//! makes the workers exit and unblocks pending submissions. Mutations
//! still queued are discarded; their completion signals never fire.

use crate::cache::DirectoryCache;
use crate::codec;
use crate::filestore::FileStore;
use crate::memcache::{DirMetadataResolver, MemcacheStore};
use crate::metrics::DatastoreMetrics;
use async_channel::{Receiver, Sender};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use talon_common::{DatastoreConfig, Error, Result, StorePath};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Heartbeat records are touched constantly and must stay resident, so
/// keys ending in this suffix are exempt from idle expiry.
const EXPIRY_EXEMPT_SUFFIX: &str = "ping.db";

/// Runs on a writer worker after its mutation has been persisted
pub type Completion = Box<dyn FnOnce() + Send + 'static>;

enum MutationKind {
    Set,
    Delete,
}

/// A unit of durable work queued for the writer pool
struct Mutation {
    kind: MutationKind,
    path: StorePath,
    /// Payload bytes; empty for deletes
    data: Bytes,
    /// Signaled once the mutation has been handled
    done: oneshot::Sender<()>,
    completion: Option<Completion>,
}

/// Directory-metadata policy for the file-backed store.
///
/// Writes only maintain listings that already exist in memory. A parent
/// with no cached metadata stays that way (a future `list_children`
/// rebuilds it from the files); non-full entries further up are dropped
/// because a concrete mutation makes a lower bound worthless.
pub struct FileStoreResolver;

impl DirMetadataResolver for FileStoreResolver {
    fn resolve(&self, dir_cache: &DirectoryCache, dir: &StorePath) -> bool {
        // Fast path: metadata for the parent is resident (full or not)
        // and can take the new member in place.
        if dir_cache.contains(dir) {
            return true;
        }

        // Synthesizing metadata here would cost a filesystem listing
        // that may never be asked for. Prune stale lower bounds above
        // instead.
        let mut cursor = dir.parent();
        while !cursor.is_root() {
            dir_cache.remove_if_partial(&cursor);
            cursor = cursor.parent();
        }
        false
    }
}

struct WriterPool {
    tx: Sender<Mutation>,
    cancel: CancellationToken,
}

/// Write-behind, memory-cached store over a [`FileStore`]
pub struct WriteBackStore {
    cache: Arc<MemcacheStore>,
    filestore: Arc<FileStore>,
    config: DatastoreConfig,
    metrics: Arc<DatastoreMetrics>,
    /// Serializes the read path's consult-then-hydrate sequence. Held
    /// only around cache operations, never across filesystem calls.
    mu: Mutex<()>,
    pool: RwLock<Option<WriterPool>>,
}

impl WriteBackStore {
    pub fn new(config: DatastoreConfig, filestore: Arc<FileStore>) -> Self {
        let cache = Arc::new(MemcacheStore::new(
            config.data_max_entries,
            config.data_max_item_bytes,
            config.dir_max_entries,
            Box::new(FileStoreResolver),
        ));
        Self {
            cache,
            filestore,
            config,
            metrics: Arc::new(DatastoreMetrics::default()),
            mu: Mutex::new(()),
            pool: RwLock::new(None),
        }
    }

    /// Install the expiry policy and spawn the writer pool. Must run
    /// inside a tokio runtime; call once. The workers run until `cancel`
    /// fires.
    pub fn start(&self, cancel: CancellationToken) {
        let expiry_secs = if self.config.expiry_secs == 0 {
            600
        } else {
            self.config.expiry_secs
        };
        self.cache
            .set_expiry(Duration::from_secs(expiry_secs), EXPIRY_EXEMPT_SUFFIX);

        let writers = if self.config.writers == 0 {
            100
        } else {
            self.config.writers
        };
        let capacity = self.config.buffer_capacity();
        info!(writers, capacity, "starting datastore writer pool");

        let (tx, rx) = async_channel::bounded(capacity);
        for _ in 0..writers {
            self.metrics.idle_writer_parked();
            tokio::spawn(writer_loop(
                rx.clone(),
                cancel.clone(),
                Arc::clone(&self.cache),
                Arc::clone(&self.filestore),
                Arc::clone(&self.metrics),
            ));
        }

        *self.pool.write() = Some(WriterPool { tx, cancel });
    }

    /// Read and decode the record at `path`, falling back to the files
    /// and rehydrating the data cache on a miss.
    pub fn get_subject<T: DeserializeOwned>(&self, path: &StorePath) -> Result<T> {
        {
            let _guard = self.mu.lock();
            match self.cache.get_subject(path) {
                Ok(message) => {
                    self.metrics.data_hit();
                    return Ok(message);
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }

        // Cold: read the files without the lock, then hydrate. Racing
        // readers may each hit the filesystem; the duplicate hydration
        // is idempotent.
        let data = Bytes::from(self.filestore.read_content(path, true)?);
        self.metrics.data_miss();

        let _guard = self.mu.lock();
        self.cache.set_data(path, data.clone())?;
        codec::decode(path.kind(), &data)
    }

    /// Raw payload bytes at `path`, with the same fallback as
    /// [`Self::get_subject`]
    pub fn get_buffer(&self, path: &StorePath) -> Result<Bytes> {
        {
            let _guard = self.mu.lock();
            if let Ok(data) = self.cache.get_buffer(path) {
                self.metrics.data_hit();
                return Ok(data);
            }
        }

        let data = Bytes::from(self.filestore.read_content(path, true)?);
        self.metrics.data_miss();

        let _guard = self.mu.lock();
        self.cache.set_data(path, data.clone())?;
        Ok(data)
    }

    /// Encode and store a record
    pub async fn set_subject<T: Serialize>(&self, path: &StorePath, message: &T) -> Result<()> {
        self.set_subject_with_completion(path, message, None).await
    }

    /// Encode and store a record; `completion` runs once a writer has
    /// persisted it. Encoding failures abort before any state changes.
    pub async fn set_subject_with_completion<T: Serialize>(
        &self,
        path: &StorePath,
        message: &T,
        completion: Option<Completion>,
    ) -> Result<()> {
        let data = codec::encode(path.kind(), message)?;
        self.set_buffer(path, data, completion).await
    }

    /// Store pre-encoded payload bytes
    pub async fn set_buffer(
        &self,
        path: &StorePath,
        data: Bytes,
        completion: Option<Completion>,
    ) -> Result<()> {
        self.cache.set_data(path, data.clone())?;
        self.submit(MutationKind::Set, path.clone(), data, completion)
            .await
    }

    /// Remove a record. The in-memory effect is immediate; the files
    /// catch up when a writer handles the mutation.
    pub async fn delete_subject(&self, path: &StorePath) -> Result<()> {
        self.cache.delete_subject(path)?;
        self.submit(MutationKind::Delete, path.clone(), Bytes::new(), None)
            .await
    }

    /// Direct children of `path` in lexicographic order.
    ///
    /// No store-level lock is taken here: the fallback touches the
    /// (slow) filesystem while the writer workers take the cache locks,
    /// and holding a coarse lock across both would deadlock.
    pub fn list_children(&self, path: &StorePath) -> Result<Vec<StorePath>> {
        if let Some(children) = self.cache.list_children(path) {
            self.metrics.dir_hit();
            return Ok(children);
        }

        let children = match self.filestore.list_children(path) {
            Ok(children) => children,
            // A directory that does not exist yet lists as empty, and
            // that emptiness is known complete.
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err),
        };
        self.metrics.dir_miss();

        self.cache.set_children(path, children.clone());
        Ok(children)
    }

    /// Counters and the idle-writers gauge
    pub fn metrics(&self) -> &DatastoreMetrics {
        &self.metrics
    }

    /// Snapshot of the resident record paths (debugging surface)
    pub fn cached_paths(&self) -> Vec<StorePath> {
        self.cache.cached_paths()
    }

    /// Drop all cached state; the files are untouched
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Release cache state ahead of teardown
    pub fn close(&self) {
        self.cache.close();
    }

    async fn submit(
        &self,
        kind: MutationKind,
        path: StorePath,
        data: Bytes,
        completion: Option<Completion>,
    ) -> Result<()> {
        let (tx, cancel) = {
            let pool = self.pool.read();
            match pool.as_ref() {
                Some(pool) => (pool.tx.clone(), pool.cancel.clone()),
                None => return Err(Error::Shutdown),
            }
        };

        let (done_tx, done_rx) = oneshot::channel();
        let mutation = Mutation {
            kind,
            path,
            data,
            done: done_tx,
            completion,
        };

        tokio::select! {
            // Shutting down: the in-memory write already succeeded, so
            // the call reports success; the mutation is discarded.
            _ = cancel.cancelled() => return Ok(()),
            sent = tx.send(mutation) => {
                if sent.is_err() {
                    return Ok(());
                }
            }
        }

        if self.config.write_through() {
            // Negative buffer: wait for the writer to persist. An Err
            // here means shutdown discarded the mutation; the in-memory
            // write stood.
            let _ = done_rx.await;
        }
        Ok(())
    }
}

/// One writer worker: pull mutations until cancelled, apply them to the
/// files, and invalidate stale directory metadata.
async fn writer_loop(
    rx: Receiver<Mutation>,
    cancel: CancellationToken,
    cache: Arc<MemcacheStore>,
    filestore: Arc<FileStore>,
    metrics: Arc<DatastoreMetrics>,
) {
    loop {
        let mutation = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("writer exiting on cancellation");
                return;
            }
            received = rx.recv() => match received {
                Ok(mutation) => mutation,
                Err(_) => return,
            },
        };

        metrics.idle_writer_busy();
        let Mutation {
            kind,
            path,
            data,
            done,
            completion,
        } = mutation;

        match kind {
            MutationKind::Set => {
                // A failed write is logged, not retried: memory stays
                // authoritative for readers and the divergence is
                // operator-visible.
                if let Err(err) = filestore.write_content(&path, &data) {
                    warn!(%path, %err, "failed to persist record");
                }
                invalidate_partial_ancestors(&cache, &path);
                if let Some(completion) = completion {
                    completion();
                }
            }
            MutationKind::Delete => {
                if let Err(err) = filestore.delete_subject(&path) {
                    warn!(%path, %err, "failed to delete record");
                }
                invalidate_partial_ancestors(&cache, &path.parent());
                if let Some(completion) = completion {
                    completion();
                }
            }
        }

        metrics.idle_writer_parked();
        let _ = done.send(());
    }
}

/// Walk from `path` toward the root, dropping lower-bound directory
/// entries. Complete listings were already maintained at submission
/// time; partial ones are cheaper to drop than to repair.
fn invalidate_partial_ancestors(cache: &MemcacheStore, path: &StorePath) {
    let mut cursor = path.clone();
    while !cursor.is_root() {
        cache.dir_cache().remove_if_partial(&cursor);
        cursor = cursor.parent();
    }
}
