//! Data models for PlatzPilot entities.
//!
//! This module contains the data structures shared by the API client,
//! the cache, and the UI layers:
//!
//! - `Library`, `OpeningHours`: a single library location and its weekly
//!   opening-hours table
//! - `LibraryCategory`: the fixed set of category codes plus the synthetic
//!   `All` grouping
//! - `LibraryData`: a complete per-category snapshot of all locations

pub mod data;
pub mod library;

pub use data::{LibraryCategory, LibraryData};
pub use library::{Library, OpeningHours};
