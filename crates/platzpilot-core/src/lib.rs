//! PlatzPilot core - real-time library seat availability client logic.
//!
//! This crate contains everything below the UI of the PlatzPilot client:
//!
//! - `models`: library records, opening hours, categories, snapshots
//! - `api`: REST client for the PlatzPilot server with timeout/retry handling
//! - `storage`: durable key-value store used for caching and favorites
//! - `sync`: the data synchronizer (cache freshness, single-flight fetches,
//!   auto-refresh, change notification)
//! - `favorites`: persisted favorites registry
//! - `summaries`: derived statistics over a snapshot
//! - `utils`: opening-hours formatting and open-now checks
//!
//! Front-ends construct the services once at startup and share them by
//! reference; see `platzpilot-cli` for a minimal driver.

pub mod api;
pub mod config;
pub mod favorites;
pub mod models;
pub mod storage;
pub mod subscribers;
pub mod summaries;
pub mod sync;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiResponse, HealthStatus, LibraryGateway};
pub use config::Config;
pub use favorites::FavoritesService;
pub use models::{Library, LibraryCategory, LibraryData, OpeningHours};
pub use storage::{FileStore, KeyValueStore, StoreError};
pub use subscribers::ListenerId;
pub use summaries::CategoryStats;
pub use sync::{DataMetadata, LibraryDataService, SyncError};
