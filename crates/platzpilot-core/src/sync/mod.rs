//! Library data synchronization.
//!
//! This module owns the in-memory snapshot of library data and everything
//! around keeping it usable: durable cache hydration, freshness tracking,
//! single-flight deduplication of concurrent fetches, periodic background
//! refresh, stale-fallback on fetch failure, and change notification.

pub mod service;

pub use service::{DataMetadata, LibraryDataService, SyncError};
