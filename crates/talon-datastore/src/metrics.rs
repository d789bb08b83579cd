//! Datastore metrics
//!
//! Four counters and one gauge, kept as plain atomics so any metrics
//! sink the platform wires up can scrape them. The names are stable.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

pub const METRIC_DATA_HITS: &str = "datastore_data_hits";
pub const METRIC_DATA_MISSES: &str = "datastore_data_misses";
pub const METRIC_DIR_HITS: &str = "datastore_dir_hits";
pub const METRIC_DIR_MISSES: &str = "datastore_dir_misses";
pub const METRIC_IDLE_WRITERS: &str = "datastore_idle_writers";

/// Counters and gauges for the write-behind store
#[derive(Debug, Default)]
pub struct DatastoreMetrics {
    data_hits: AtomicU64,
    data_misses: AtomicU64,
    dir_hits: AtomicU64,
    dir_misses: AtomicU64,
    /// Writers currently parked on the mutation channel
    idle_writers: AtomicI64,
}

impl DatastoreMetrics {
    pub fn data_hit(&self) {
        self.data_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn data_miss(&self) {
        self.data_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dir_hit(&self) {
        self.dir_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dir_miss(&self) {
        self.dir_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn idle_writer_parked(&self) {
        self.idle_writers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn idle_writer_busy(&self) {
        self.idle_writers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn data_hits(&self) -> u64 {
        self.data_hits.load(Ordering::Relaxed)
    }

    pub fn data_misses(&self) -> u64 {
        self.data_misses.load(Ordering::Relaxed)
    }

    pub fn dir_hits(&self) -> u64 {
        self.dir_hits.load(Ordering::Relaxed)
    }

    pub fn dir_misses(&self) -> u64 {
        self.dir_misses.load(Ordering::Relaxed)
    }

    pub fn idle_writers(&self) -> i64 {
        self.idle_writers.load(Ordering::Relaxed)
    }

    /// Stable-named snapshot for scraping
    pub fn snapshot(&self) -> Vec<(&'static str, i64)> {
        vec![
            (METRIC_DATA_HITS, self.data_hits() as i64),
            (METRIC_DATA_MISSES, self.data_misses() as i64),
            (METRIC_DIR_HITS, self.dir_hits() as i64),
            (METRIC_DIR_MISSES, self.dir_misses() as i64),
            (METRIC_IDLE_WRITERS, self.idle_writers()),
        ]
    }
}
