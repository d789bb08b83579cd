//! Configuration types for Talon
//!
//! This module defines the datastore configuration shared across
//! components. Loading and merging config files belongs to the outer
//! platform; only the structures live here.

use serde::{Deserialize, Serialize};

/// Datastore tuning parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// Idle expiry window for cached entries (seconds)
    pub expiry_secs: u64,
    /// Mutation channel capacity. Negative turns every write into a
    /// write-through call that waits for persistence.
    pub mutation_buffer: i64,
    /// Number of writer workers draining the mutation channel
    pub writers: usize,
    /// Maximum number of entries in the data cache
    pub data_max_entries: usize,
    /// Per-entry byte cap for the data cache; larger payloads bypass it
    pub data_max_item_bytes: usize,
    /// Maximum number of entries in the directory cache
    pub dir_max_entries: usize,
}

impl DatastoreConfig {
    /// True when every write must wait for filesystem persistence
    #[must_use]
    pub fn write_through(&self) -> bool {
        self.mutation_buffer < 0
    }

    /// Usable mutation channel capacity
    #[must_use]
    pub fn buffer_capacity(&self) -> usize {
        if self.mutation_buffer <= 0 {
            1000
        } else {
            self.mutation_buffer as usize
        }
    }
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            expiry_secs: 600,              // 10 minutes
            mutation_buffer: 1000,
            writers: 100,
            data_max_entries: 10_000,
            data_max_item_bytes: 64 * 1024, // 64 KiB
            dir_max_entries: 1_000,
        }
    }
}
