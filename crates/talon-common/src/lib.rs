//! Talon Common - Shared types and utilities
//!
//! This crate provides the types shared across Talon components: the
//! common error type, datastore configuration, and the hierarchical
//! path keys the datastore is addressed by.

pub mod config;
pub mod error;
pub mod types;

pub use config::DatastoreConfig;
pub use error::{Error, Result};
pub use types::{PayloadKind, StorePath};
