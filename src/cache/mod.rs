//! Cache module for memoizing remote results on disk
//!
//! This module provides a disk-backed store keyed by request fingerprints.
//! Collector entries carry a maximum age so paper metadata refreshes
//! periodically; analysis entries never expire and must be deleted manually
//! to force recomputation.

mod store;

pub use store::{CacheStore, Fingerprint};
